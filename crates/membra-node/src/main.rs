//! membra-node: operator binary for a Membra state directory.
//!
//! Subcommands:
//!   init     apply a genesis document to a fresh data dir
//!   apply    feed JSON-lines requests through the ledger engine
//!   inspect  read-only views of members, tokens and the refund outbox
//!   param    maintain configuration parameters (master switch etc.)
//!
//! Results are written to stdout as JSON lines; logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use membra_core::host::ConfigStore;
use membra_core::request::Request;
use membra_core::types::{Principal, SymbolCode, Timestamp};
use membra_genesis::{apply_genesis, GenesisParams};
use membra_query::{MemberQuery, TokenQuery};
use membra_state::{LedgerEngine, StateDb};

#[derive(Parser, Debug)]
#[command(
    name = "membra-node",
    version,
    about = "Membra staked-membership and token ledger"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, default_value = "~/.membra/data", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bootstrap a fresh data dir from a genesis JSON document.
    Init {
        #[arg(long)]
        genesis: PathBuf,
    },
    /// Apply JSON-lines requests from a file, or stdin when omitted or `-`.
    Apply {
        #[arg(long)]
        requests: Option<PathBuf>,
    },
    /// Read-only state views.
    Inspect {
        #[command(subcommand)]
        what: Inspect,
    },
    /// Configuration parameters.
    Param {
        #[command(subcommand)]
        action: ParamAction,
    },
}

#[derive(Subcommand, Debug)]
enum Inspect {
    /// A member's record and status.
    User { principal: String },
    /// Registered-member count.
    Population,
    /// Outstanding supply of a token.
    Supply { code: String },
    /// One holder's balance of a token.
    Balance { code: String, owner: String },
    /// All balance rows of a token.
    Holders { code: String },
    /// Check that a token's balances add up to its supply.
    Audit { code: String },
    /// Refunds queued for the base-currency ledger.
    Outbox,
    /// Engine identity and stake bands.
    Config,
}

#[derive(Subcommand, Debug)]
enum ParamAction {
    Set { name: String, value: String },
    Get { name: String },
    Erase { name: String },
}

/// One line of `apply` input: a request plus an optional ledger time.
#[derive(Deserialize)]
struct Envelope {
    #[serde(flatten)]
    request: Request,
    /// Unix seconds; defaults to the wall clock.
    #[serde(default)]
    at: Option<Timestamp>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,membra=debug")),
        )
        .init();

    let args = Args::parse();

    // ── State database ────────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = Arc::new(StateDb::open(&data_dir).context("opening state database")?);

    match args.command {
        Command::Init { genesis } => init(&db, &genesis),
        Command::Apply { requests } => apply(db, requests).await,
        Command::Inspect { what } => inspect(&db, what),
        Command::Param { action } => param(&db, action),
    }
}

// ── init ──────────────────────────────────────────────────────────────────────

fn init(db: &StateDb, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading genesis params from {}", path.display()))?;
    let params = GenesisParams::from_json(&text).context("parsing genesis params JSON")?;
    let config = apply_genesis(db, &params).context("applying genesis")?;
    println!("{}", json!({ "initialised": config }));
    Ok(())
}

// ── apply ─────────────────────────────────────────────────────────────────────

async fn apply(db: Arc<StateDb>, source: Option<PathBuf>) -> anyhow::Result<()> {
    let config = db
        .get_engine_config()
        .context("reading engine config")?
        .context("state is not initialised; run `membra-node init` first")?;
    let engine = LedgerEngine::with_outbox(Arc::clone(&db), config);

    // ── Inbound request queue ─────────────────────────────────────────────────
    let (req_sender, mut req_receiver) =
        tokio::sync::mpsc::channel::<(usize, Result<Envelope, String>)>(512);

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match source {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening requests file {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let producer = tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut line_no = 0usize;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read request input");
                    break;
                }
            };
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<Envelope>(&line).map_err(|e| e.to_string());
            if req_sender.send((line_no, parsed)).await.is_err() {
                break;
            }
        }
    });

    // ── Main loop: one request in flight at a time ────────────────────────────
    let (mut applied, mut rejected) = (0usize, 0usize);
    while let Some((line, parsed)) = req_receiver.recv().await {
        let envelope = match parsed {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(line, error = %e, "malformed request");
                rejected += 1;
                println!("{}", json!({ "line": line, "error": format!("malformed request: {e}") }));
                continue;
            }
        };
        let now = envelope.at.unwrap_or_else(|| chrono::Utc::now().timestamp());
        let request_id = envelope.request.id().to_hex();
        match engine.apply(&envelope.request, now) {
            Ok(outcome) => {
                applied += 1;
                println!(
                    "{}",
                    json!({ "line": line, "request_id": request_id, "outcome": outcome })
                );
            }
            Err(e) => {
                rejected += 1;
                println!(
                    "{}",
                    json!({ "line": line, "request_id": request_id, "error": e.to_string() })
                );
            }
        }
    }

    producer.await.context("request reader task")?;
    db.flush().context("flushing state database")?;
    info!(applied, rejected, "request stream finished");
    Ok(())
}

// ── inspect ───────────────────────────────────────────────────────────────────

fn inspect(db: &StateDb, what: Inspect) -> anyhow::Result<()> {
    let now = chrono::Utc::now().timestamp();
    let members = MemberQuery::new(db);
    let tokens = TokenQuery::new(db);

    let out = match what {
        Inspect::User { principal } => {
            let principal: Principal = principal.parse().context("parsing principal")?;
            match members.get_user(&principal)? {
                Some(record) => json!({
                    "record": record,
                    "status": members.describe(&principal, now)?,
                }),
                None => json!({ "principal": principal, "registered": false }),
            }
        }
        Inspect::Population => json!({ "population": members.population()? }),
        Inspect::Supply { code } => {
            let code = parse_code(&code)?;
            let record = tokens.symbol(&code)?;
            json!({
                "supply": record.supply,
                "max_supply": record.max_supply,
                "issuer": record.issuer,
            })
        }
        Inspect::Balance { code, owner } => {
            let code = parse_code(&code)?;
            let owner: Principal = owner.parse().context("parsing owner")?;
            json!({ "owner": owner, "balance": tokens.balance(&code, &owner)? })
        }
        Inspect::Holders { code } => json!(tokens.holders(&parse_code(&code)?)?),
        Inspect::Audit { code } => json!(tokens.audit_conservation(&parse_code(&code)?)?),
        Inspect::Outbox => json!(db.outbox()?),
        Inspect::Config => json!({
            "engine": db.get_engine_config()?,
            "bands": db.stake_bands()?,
        }),
    };
    println!("{out}");
    Ok(())
}

fn parse_code(code: &str) -> anyhow::Result<SymbolCode> {
    code.parse().with_context(|| format!("parsing symbol code {code:?}"))
}

// ── param ─────────────────────────────────────────────────────────────────────

fn param(db: &StateDb, action: ParamAction) -> anyhow::Result<()> {
    match action {
        ParamAction::Set { name, value } => {
            db.put_parameter(&name, &value)?;
            println!("{}", json!({ "name": name, "value": value }));
        }
        ParamAction::Get { name } => {
            let value = db.read_parameter(&name)?;
            println!("{}", json!({ "name": name, "value": value }));
        }
        ParamAction::Erase { name } => {
            let erased = db.erase_parameter(&name)?;
            println!("{}", json!({ "name": name, "erased": erased }));
        }
    }
    db.flush().context("flushing state database")?;
    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
