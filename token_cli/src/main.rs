use anyhow::Context;
use clap::{Parser, Subcommand};
use std::time::Duration;
use token_client::actor::{self, SessionHandle, UiCommand};
use token_client::config::ClientConfig;
use token_client::orchestrator::Orchestrator;
use token_client::protocol::{InputField, SessionPhase, SessionSnapshot, TokenAction};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "token-cli", about = "Inspect and operate the token contract")]
struct Args {
    /// JSON-RPC endpoint used for contract reads (overrides TOKEN_RPC_URL).
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Wallet endpoint that signs transactions (overrides TOKEN_WALLET_URL).
    #[arg(long, global = true)]
    wallet_url: Option<String>,

    #[arg(long, global = true, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    #[arg(long, global = true, value_name = "SECS")]
    confirm_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect (if a wallet is configured), load metadata and print the session.
    Status,
    /// Ask the wallet for an account and print the connection.
    Connect,
    /// Token balance of an address, or of the connected account.
    Balance { address: Option<String> },
    Transfer { to: String, amount: String },
    Burn { amount: String },
    /// Mint to the contract owner. Reverts unless the wallet account is the owner.
    Mint { amount: String },
    /// Read commands from stdin and stream session snapshots as JSON lines.
    Shell,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args);
    info!(rpc = %config.rpc_url, wallet = ?config.wallet_url, "starting");
    let mut session = config.build().context("invalid client configuration")?;

    match args.command {
        Command::Status => {
            session.initialize().await;
            print_snapshot(&session.snapshot())?;
        }
        Command::Connect => {
            session.connect().await;
            let snap = session.snapshot();
            println!("{}", serde_json::to_string_pretty(&snap.connection)?);
            fail_on_error(&snap)?;
        }
        Command::Balance { address } => {
            let account = match address {
                Some(a) => a,
                None => connected_account(&mut session).await?,
            };
            let balance = session.chain().balance_of(&account).await?;
            println!("{}", serde_json::json!({ "address": account, "balance": balance }));
        }
        Command::Transfer { to, amount } => {
            session.initialize().await;
            let tx = session.submit_transfer(&to, &amount).await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
        Command::Burn { amount } => {
            session.initialize().await;
            let tx = session.submit_burn(&amount).await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
        Command::Mint { amount } => {
            session.initialize().await;
            let tx = session.submit_mint(&amount).await?;
            println!("{}", serde_json::to_string_pretty(&tx)?);
        }
        Command::Shell => run_shell(session).await?,
    }

    Ok(())
}

fn resolve_config(args: &Args) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = args.rpc_url.as_deref() {
        config.rpc_url = url.trim().to_string();
    }
    if let Some(url) = args.wallet_url.as_deref() {
        let url = url.trim();
        config.wallet_url = (!url.is_empty()).then(|| url.to_string());
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms.clamp(50, 60_000));
    }
    if let Some(secs) = args.confirm_timeout_secs {
        config.confirmation_timeout = Duration::from_secs(secs.clamp(10, 3600));
    }
    config
}

async fn connected_account(session: &mut Orchestrator) -> anyhow::Result<String> {
    session.connect().await;
    let snap = session.snapshot();
    fail_on_error(&snap)?;
    snap.connection
        .address
        .ok_or_else(|| anyhow::anyhow!("no connected account; pass an address"))
}

fn fail_on_error(snap: &SessionSnapshot) -> anyhow::Result<()> {
    match snap.error.as_ref() {
        Some(e) => Err(anyhow::anyhow!("{:?}: {}", e.kind, e.message)),
        None => Ok(()),
    }
}

fn print_snapshot(snap: &SessionSnapshot) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(snap)?);
    Ok(())
}

async fn run_shell(session: Orchestrator) -> anyhow::Result<()> {
    let (handle, join) = actor::spawn(session);
    let printer = tokio::spawn(stream_snapshots(handle.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        match parse_line(line) {
            Ok(cmds) => {
                for cmd in cmds {
                    handle
                        .send(cmd)
                        .await
                        .map_err(|e| anyhow::anyhow!(e))?;
                }
            }
            Err(e) => warn!("{e}"),
        }
    }

    // Let an in-flight write settle before shutting down.
    drop(handle);
    join.await?;
    printer.abort();
    Ok(())
}

async fn stream_snapshots(handle: SessionHandle) {
    let mut rx = handle.subscribe();
    drop(handle);
    loop {
        let snap = rx.borrow_and_update().clone();
        if snap.phase != SessionPhase::Idle {
            match serde_json::to_string(&snap) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "failed to encode snapshot"),
            }
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

/// Shell grammar:
/// `connect`, `refresh`, `set <field> <value>`, `submit <action>`,
/// `transfer <to> <amount>`, `burn <amount>`, `mint <amount>`.
fn parse_line(line: &str) -> Result<Vec<UiCommand>, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts.as_slice() {
        ["connect"] => Ok(vec![UiCommand::Connect]),
        ["refresh"] => Ok(vec![UiCommand::Refresh]),
        ["set", field, value] => Ok(vec![set(field.parse()?, *value)]),
        ["set", field] => Ok(vec![set(field.parse()?, "")]),
        ["submit", action] => Ok(vec![UiCommand::Submit(parse_action(action)?)]),
        ["transfer", to, amount] => Ok(vec![
            set(InputField::RecipientAddress, to),
            set(InputField::TransferAmount, amount),
            UiCommand::Submit(TokenAction::Transfer),
        ]),
        ["burn", amount] => Ok(vec![
            set(InputField::BurnAmount, amount),
            UiCommand::Submit(TokenAction::Burn),
        ]),
        ["mint", amount] => Ok(vec![
            set(InputField::MintAmount, amount),
            UiCommand::Submit(TokenAction::Mint),
        ]),
        _ => Err(format!("unrecognized command: {line:?}")),
    }
}

fn set(field: InputField, value: &str) -> UiCommand {
    UiCommand::SetInput {
        field,
        value: value.to_string(),
    }
}

fn parse_action(s: &str) -> Result<TokenAction, String> {
    match s {
        "transfer" => Ok(TokenAction::Transfer),
        "burn" => Ok(TokenAction::Burn),
        "mint" => Ok(TokenAction::Mint),
        other => Err(format!("unknown action: {other}")),
    }
}
