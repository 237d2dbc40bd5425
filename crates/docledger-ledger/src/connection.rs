//! Ledger Connection Manager
//!
//! Owns the wallet connection for one client instance: the latest account list,
//! the derived active account, and a hot stream of account-list changes.
//!
//! Changes may come from this manager (`request_connection`) or from outside it
//! (`accounts_changed`, fed by the wallet or by `start_account_watcher`). Either
//! way the new list replaces the old one and is emitted to every subscriber.

use docledger_core::AccountList;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::interval;

use crate::error::ConnectionError;
use crate::wallet::WalletProvider;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

pub struct ConnectionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    accounts: watch::Sender<AccountList>,
    changes: broadcast::Sender<AccountList>,
    established: AtomicBool,
}

impl ConnectionManager {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self::with_provider(Some(provider))
    }

    /// Manager for an environment with no wallet provider at all.
    pub fn without_provider() -> Self {
        Self::with_provider(None)
    }

    fn with_provider(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let (accounts, _) = watch::channel(AccountList::empty());
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            provider,
            accounts,
            changes,
            established: AtomicBool::new(false),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether a connection request has succeeded at least once.
    pub fn is_established(&self) -> bool {
        self.established.load(Ordering::Acquire)
    }

    /// Established and still holding at least one account. False again once
    /// the wallet reports an empty list.
    pub fn is_connected(&self) -> bool {
        self.is_established() && !self.accounts.borrow().is_empty()
    }

    /// Request account access from the wallet.
    ///
    /// Calling this while connected re-authorizes; the returned list becomes the
    /// canonical state whether or not it differs from the previous one.
    #[tracing::instrument(skip(self))]
    pub async fn request_connection(&self) -> Result<AccountList, ConnectionError> {
        let provider = self.provider.as_ref().ok_or_else(|| {
            ConnectionError::WalletUnavailable("no wallet provider configured".to_string())
        })?;

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => AccountList::from(accounts),
            Err(e) => {
                tracing::warn!(error = %e, "Wallet connection request failed");
                return Err(e);
            }
        };

        self.established.store(true, Ordering::Release);
        tracing::info!(
            accounts = accounts.len(),
            active = accounts.active().unwrap_or("none"),
            "Wallet connected"
        );
        self.publish(accounts.clone());

        Ok(accounts)
    }

    /// Report an account-list change triggered outside this manager.
    ///
    /// An empty list means the wallet disconnected.
    pub fn accounts_changed(&self, accounts: impl Into<AccountList>) {
        let accounts = accounts.into();
        tracing::info!(
            accounts = accounts.len(),
            active = accounts.active().unwrap_or("none"),
            "Wallet accounts changed"
        );
        self.publish(accounts);
    }

    fn publish(&self, accounts: AccountList) {
        self.accounts.send_replace(accounts.clone());
        // No subscribers is fine; the watch channel still holds the latest list.
        let _ = self.changes.send(accounts);
    }

    /// Subscribe to every subsequent account-list emission, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<AccountList> {
        self.changes.subscribe()
    }

    /// Latest-value view of the account list.
    pub fn watch(&self) -> watch::Receiver<AccountList> {
        self.accounts.subscribe()
    }

    pub fn accounts(&self) -> AccountList {
        self.accounts.borrow().clone()
    }

    pub fn active_account(&self) -> Option<String> {
        self.accounts.borrow().active().map(String::from)
    }

    /// Poll the wallet for accounts and report changes as they happen.
    ///
    /// Stands in for a push `accountsChanged` notification on transports that
    /// cannot deliver one. Returns a JoinHandle for shutdown; without a
    /// provider the task exits immediately.
    pub fn start_account_watcher(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let Some(provider) = self.provider.clone() else {
                tracing::warn!("Account watcher not started: no wallet provider");
                return;
            };

            let mut ticker = interval(period);
            loop {
                ticker.tick().await;

                if !self.is_established() {
                    continue;
                }

                match provider.accounts().await {
                    Ok(accounts) => {
                        let accounts = AccountList::from(accounts);
                        if accounts != *self.accounts.borrow() {
                            self.accounts_changed(accounts);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to poll wallet accounts");
                    }
                }
            }
        })
    }
}
