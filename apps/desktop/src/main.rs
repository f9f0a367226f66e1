use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{NotesClient, NotesHandle};
use ledger_integration::{
    HttpWalletProvider, MissingWalletProvider, RestLedgerClient, WalletProvider,
};
use shared::{domain::AccountAddress, protocol::TransactionOutcome};
use storage::{prepare_database_url, Storage};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(about = "On-chain notes client")]
struct Args {
    #[arg(long, global = true)]
    node_url: Option<String>,
    #[arg(long, global = true)]
    signer_url: Option<String>,
    #[arg(long, global = true)]
    database_url: Option<String>,
    #[arg(long, global = true)]
    module_address: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the locally stored notes.
    List,
    /// Connect the wallet and print the account address.
    Connect,
    /// Create the account's note collection on-chain.
    Init,
    /// Record a note on-chain, then append it locally.
    Add,
    /// Remove a local note by position.
    Delete { index: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let mut settings = config::load_settings();
    if let Some(node_url) = args.node_url {
        settings.node_url = node_url;
    }
    if let Some(signer_url) = args.signer_url {
        settings.signer_url = Some(signer_url);
    }
    if let Some(database_url) = args.database_url {
        settings.database_url = database_url;
    }
    if let Some(module_address) = args.module_address {
        settings.module_address = module_address;
    }

    let database_url = prepare_database_url(&settings.database_url)?;
    let store = Arc::new(Storage::new(&database_url).await?);
    let ledger = Arc::new(
        RestLedgerClient::new(settings.node_url()?).with_poll_interval(settings.poll_interval()),
    );
    let wallet: Arc<dyn WalletProvider> = match settings.signer_url()? {
        Some(url) => Arc::new(HttpWalletProvider::new(url)),
        None => Arc::new(MissingWalletProvider),
    };
    let client = NotesClient::initialize(store, wallet, ledger, settings.client_config()?).await;

    match args.command {
        Command::List => print_notes(client.as_ref()).await,
        Command::Connect => {
            let address = connect(client.as_ref()).await?;
            println!("Connected as {address}");
            client.disconnect_wallet().await;
        }
        Command::Init => {
            connect(client.as_ref()).await?;
            let outcome = client.initialize_collection().await;
            client.disconnect_wallet().await;
            if outcome.is_already_initialized() {
                println!("Collection already initialized");
            } else {
                report(&outcome)?;
            }
        }
        Command::Add => {
            connect(client.as_ref()).await?;
            let outcome = client.add_note_on_chain().await;
            client.disconnect_wallet().await;
            report(&outcome)?;
            print_notes(client.as_ref()).await;
        }
        Command::Delete { index } => {
            client.on_delete(index).await?;
            print_notes(client.as_ref()).await;
        }
    }
    Ok(())
}

async fn connect(client: &NotesClient) -> Result<AccountAddress> {
    match client.connect_wallet().await {
        Some(address) => Ok(address),
        None => bail!("wallet connection failed"),
    }
}

fn report(outcome: &TransactionOutcome) -> Result<()> {
    match outcome {
        TransactionOutcome::Confirmed(hash) => {
            println!("Confirmed {hash}");
            Ok(())
        }
        TransactionOutcome::Submitted(hash) => {
            println!("Submitted {hash}");
            Ok(())
        }
        TransactionOutcome::Failed(err) => bail!("transaction failed: {err}"),
    }
}

async fn print_notes(client: &NotesClient) {
    let state = client.view_state().await;
    if state.notes.is_empty() {
        println!("No notes");
        return;
    }
    for (index, note) in state.notes.iter().enumerate() {
        let marker = if note.edit { "editable" } else { "locked" };
        println!("{index}: {} ({marker})", note.created_on.to_rfc3339());
    }
}
