//! Error metadata shared by every crate in the workspace.
//!
//! Each crate owns its own `thiserror` enum. What they share is the way an error
//! describes itself to the person in front of the client: a stable code, a
//! message derived from the error kind (never from raw transport text), and
//! whether a user-initiated retry can reasonably succeed.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like a declined signature
    Debug,
    /// Warning level - for recoverable issues like a missing wallet
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// How an error presents itself to the user.
pub trait UserFacing {
    /// Machine-readable error code (e.g., "UPLOAD_FAILED")
    fn error_code(&self) -> &'static str;

    /// Human-readable message for the confirmed/failed notification
    fn user_message(&self) -> String;

    /// Whether a user-initiated re-attempt may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel {
        if self.is_recoverable() {
            LogLevel::Warn
        } else {
            LogLevel::Error
        }
    }
}
