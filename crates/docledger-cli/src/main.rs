//! docledger: register documents on the ledger and fetch them back.
//!
//! Configuration comes from the environment (or `.env`): STORAGE_BACKEND,
//! PINATA_JWT, PINATA_GATEWAY, LEDGER_RPC_URL, WALLET_RPC_URL, CONTRACT_ADDRESS.

use anyhow::Context;
use clap::{Parser, Subcommand};
use docledger_cli::{init_tracing, user_error, Client};
use docledger_core::{Config, DocumentType, RegistrationForm, SelectedFile, StorageReference};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docledger", about = "Document registration and retrieval client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the SHA-256 fingerprint of a file
    Hash {
        /// Path to the document
        file: PathBuf,
    },
    /// Publish a file to the storage network
    Publish {
        /// Path to the document
        file: PathBuf,
    },
    /// Publish a file and register it on the ledger
    Register {
        /// Path to the document
        file: PathBuf,
        /// Address the document is issued to
        #[arg(long)]
        receiver: String,
        /// Document name (the title it is looked up by)
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Numeric document type code
        #[arg(long = "type")]
        doc_type: u8,
        /// Registry contract address (defaults to CONTRACT_ADDRESS)
        #[arg(long)]
        contract: Option<String>,
    },
    /// Download a document by its storage reference
    Retrieve {
        /// Storage reference (CID)
        reference: String,
    },
    /// Count documents registered for an owner
    Count {
        /// Owner address (defaults to the active account)
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        contract: Option<String>,
    },
    /// List document titles registered for an owner
    Titles {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        contract: Option<String>,
    },
    /// Look up a document by title
    Get {
        /// Document title
        title: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        contract: Option<String>,
    },
    /// Show wallet accounts
    Accounts {
        /// Keep running and print every account change
        #[arg(long)]
        watch: bool,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("Invalid configuration")?;
    let client = Client::from_config(config).await?;
    let orchestrator = &client.orchestrator;

    match cli.command {
        Commands::Hash { file } => {
            orchestrator.select_file(SelectedFile::from_path(&file));
            let fingerprint = orchestrator.begin_hash().await.map_err(user_error)?;
            print_json(&serde_json::json!({
                "file": file.display().to_string(),
                "fingerprint": fingerprint,
            }))?;
        }
        Commands::Publish { file } => {
            orchestrator.select_file(SelectedFile::from_path(&file));
            let reference = orchestrator.publish().await.map_err(user_error)?;
            let state = orchestrator.state();
            print_json(&serde_json::json!({
                "reference": reference,
                "fingerprint": state.fingerprint,
                "backend": client.config.storage_backend.to_string(),
            }))?;
        }
        Commands::Register {
            file,
            receiver,
            name,
            description,
            doc_type,
            contract,
        } => {
            client.connect().await?;
            if let Some(address) = contract.as_deref() {
                client.bind(Some(address))?;
            }

            let form = RegistrationForm::new(receiver, name, description, DocumentType(doc_type));
            orchestrator.select_file(SelectedFile::from_path(&file));
            let receipt = orchestrator.submit(&form).await.map_err(user_error)?;

            let state = orchestrator.state();
            print_json(&serde_json::json!({
                "status": state.submission,
                "reference": state.reference,
                "fingerprint": state.fingerprint,
                "receipt": receipt,
            }))?;
        }
        Commands::Retrieve { reference } => {
            let download = orchestrator
                .retrieve(&StorageReference::new(reference))
                .await
                .map_err(user_error)?;
            print_json(&download)?;
        }
        Commands::Count { owner, contract } => {
            let active = client.connect().await?;
            let owner = owner.unwrap_or(active);
            let binding = client.bind(contract.as_deref())?;
            let count = binding.document_count(&owner).await.map_err(user_error)?;
            print_json(&serde_json::json!({ "owner": owner, "count": count }))?;
        }
        Commands::Titles { owner, contract } => {
            let active = client.connect().await?;
            let owner = owner.unwrap_or(active);
            let binding = client.bind(contract.as_deref())?;
            let titles = binding.document_titles(&owner).await.map_err(user_error)?;
            print_json(&serde_json::json!({ "owner": owner, "titles": titles }))?;
        }
        Commands::Get {
            title,
            owner,
            contract,
        } => {
            let active = client.connect().await?;
            let owner = owner.unwrap_or(active);
            let binding = client.bind(contract.as_deref())?;
            let document = binding
                .document_by_title(&owner, &title)
                .await
                .map_err(user_error)?;
            print_json(&serde_json::json!({
                "created_at": document.created_at().map(|t| t.to_rfc3339()),
                "document": document,
            }))?;
        }
        Commands::Accounts { watch } => {
            let accounts = client.connection.request_connection().await.map_err(user_error)?;
            print_json(&serde_json::json!({
                "active": accounts.active(),
                "accounts": accounts,
            }))?;

            if watch {
                let mut changes = client.connection.subscribe();
                let watcher = client
                    .connection
                    .clone()
                    .start_account_watcher(client.config.account_poll_interval());

                loop {
                    tokio::select! {
                        change = changes.recv() => match change {
                            Ok(accounts) => print_json(&serde_json::json!({
                                "active": accounts.active(),
                                "accounts": accounts,
                            }))?,
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "Account changes dropped");
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        },
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
                watcher.abort();
            }
        }
    }

    Ok(())
}
