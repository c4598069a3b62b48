//! Context-zone monitoring and checkpointing for agent sessions.
//!
//! Logs go to stderr; stdout is reserved for text the host should inject
//! into the conversation (e.g. a restored checkpoint).
//!
//! # Examples
//!
//! ```sh
//! # Install hook scripts into .claude/hooks
//! ctxsurf setup
//!
//! # Classify a usage sample (saves a checkpoint in cold/critical zones)
//! ctxsurf check --tokens 160000
//!
//! # Save, inspect and clear the stored checkpoint
//! ctxsurf save --summary "Refactored parser" --pending "tests,docs"
//! ctxsurf restore
//! ctxsurf clear
//!
//! # Invoked by the installed hooks
//! echo '{"matcher":"manual"}' | ctxsurf hook pre-compact
//! ```

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use ctxsurf::agent::SessionManager;
use ctxsurf::config::SurfConfig;
use ctxsurf::context::{ToolUsageTracker, classify};
use ctxsurf::hooks::{HookEvent, InstallOptions, install_hooks, uninstall_hooks};
use ctxsurf::memory::{MemoryClient, SaveCheckpointParams};
use ctxsurf::runner::{HookFiles, run_hook};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Context-zone monitoring and proactive checkpointing for agent sessions.
#[derive(Parser)]
#[command(name = "ctxsurf", version)]
struct Cli {
    /// Project directory holding ctxsurf.config.json
    #[arg(long, global = true, default_value = ".")]
    project: PathBuf,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    // ── Setup ──────────────────────────────────────────────────
    /// Install hook scripts into the project
    #[command(alias = "install-hooks")]
    Setup {
        /// Overwrite existing scripts
        #[arg(long)]
        force: bool,

        /// Install here instead of the configured hooksDir
        #[arg(long)]
        target: Option<PathBuf>,
    },

    /// Remove installed hook scripts
    UninstallHooks {
        #[arg(long)]
        target: Option<PathBuf>,
    },

    /// Validate the project config
    Validate,

    // ── Context ────────────────────────────────────────────────
    /// Classify a usage sample and checkpoint if needed
    Check {
        /// Tokens currently in the context window
        #[arg(long)]
        tokens: u64,

        /// Context window size (defaults to maxContextTokens)
        #[arg(long)]
        max: Option<u64>,

        /// Only classify; never save
        #[arg(long)]
        dry_run: bool,
    },

    /// Count one tool call toward the usage estimate
    RecordTool,

    // ── Memory ─────────────────────────────────────────────────
    /// Save a checkpoint
    Save {
        #[arg(long)]
        summary: String,

        #[arg(long)]
        working_on: Option<String>,

        /// Comma-separated pending items
        #[arg(long, value_delimiter = ',')]
        pending: Vec<String>,

        /// Comma-separated accomplishments
        #[arg(long, value_delimiter = ',')]
        accomplishments: Vec<String>,

        /// Comma-separated edited files
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,
    },

    /// Print the stored checkpoint as Markdown
    Restore {
        /// Print raw JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Delete the stored checkpoint
    Clear,

    /// Show config, usage estimate and the stored checkpoint
    Status,

    // ── Hooks ──────────────────────────────────────────────────
    /// Run a lifecycle hook (used by the installed scripts)
    Hook {
        #[arg(value_enum)]
        event: HookArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum HookArg {
    PreCompact,
    SessionStart,
    ContextCheck,
    SessionEnd,
}

impl From<HookArg> for HookEvent {
    fn from(arg: HookArg) -> Self {
        match arg {
            HookArg::PreCompact => HookEvent::PreCompact,
            HookArg::SessionStart => HookEvent::SessionStart,
            HookArg::ContextCheck => HookEvent::ContextCheck,
            HookArg::SessionEnd => HookEvent::SessionEnd,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SurfConfig::load(&cli.project);

    // Hooks must never fail the host.
    if let Command::Hook { event } = cli.command {
        if let Err(e) = hook(config, event.into()).await {
            warn!("Hook failed: {e}");
        }
        return;
    }

    if let Err(e) = run(cli, config).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ctxsurf=debug" } else { "ctxsurf=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

async fn run(cli: Cli, config: SurfConfig) -> Result<(), String> {
    match cli.command {
        Command::Setup { force, target } => {
            let options = InstallOptions {
                force,
                target_dir: target,
            };
            let report = install_hooks(&config, &cli.project, &options)?;
            for name in &report.skipped {
                println!("Skipping {name} (exists, use --force to overwrite)");
            }
            for name in &report.installed {
                println!("Installed {name}");
            }
            println!("Hooks installed to {}", report.target_dir.display());
            println!("Add the hooks to .claude/settings.json to activate them");
        }
        Command::UninstallHooks { target } => {
            let options = InstallOptions {
                target_dir: target,
                ..Default::default()
            };
            for name in uninstall_hooks(&config, &cli.project, &options)? {
                println!("Removed {name}");
            }
        }
        Command::Validate => {
            let errors = config.validate();
            if !errors.is_empty() {
                let list: Vec<String> = errors.iter().map(|e| format!("  - {e}")).collect();
                return Err(format!("Configuration errors:\n{}", list.join("\n")));
            }
            println!("Configuration is valid");
        }
        Command::Check {
            tokens,
            max,
            dry_run,
        } => {
            let info = if dry_run {
                let max = max.filter(|m| *m > 0).unwrap_or(config.max_context_tokens);
                classify(tokens, max, &config.zones).map_err(|e| e.to_string())?
            } else {
                let mut session = SessionManager::new(config)?;
                session
                    .check_context(tokens, max)
                    .await
                    .map_err(|e| e.to_string())?
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&info)
                    .map_err(|e| format!("failed to serialize zone: {e}"))?
            );
        }
        Command::RecordTool => {
            let mut tracker = ToolUsageTracker::open(ToolUsageTracker::default_path(&config.agent_id));
            let count = tracker.record()?;
            let info = tracker.estimate_zone(&config.zones);
            println!("{count} tool calls, {}", info.message);
        }
        Command::Save {
            summary,
            working_on,
            pending,
            accomplishments,
            files,
        } => {
            let mut params = SaveCheckpointParams::new(summary);
            if let Some(w) = working_on {
                params = params.with_working_on(w);
            }
            if !pending.is_empty() {
                params = params.with_pending_work(pending);
            }
            if !accomplishments.is_empty() {
                params = params.with_accomplishments(accomplishments);
            }
            if !files.is_empty() {
                params = params.with_files_edited(files);
            }
            let mut session = SessionManager::new(config)?;
            if !session.save_checkpoint(params).await {
                return Err("checkpoint was not saved".into());
            }
            println!("Checkpoint saved");
        }
        Command::Restore { json } => {
            let client = MemoryClient::from_config(&config)?;
            match client.get_checkpoint().await {
                Some(cp) if json => println!(
                    "{}",
                    serde_json::to_string_pretty(&cp)
                        .map_err(|e| format!("failed to serialize checkpoint: {e}"))?
                ),
                Some(cp) => print!("{}", cp.to_markdown()),
                None => println!("No checkpoint found"),
            }
        }
        Command::Clear => {
            let client = MemoryClient::from_config(&config)?;
            if !client.clear_checkpoint().await {
                return Err("checkpoint was not cleared".into());
            }
            println!("Checkpoint cleared");
        }
        Command::Status => status(&config).await?,
        Command::Hook { .. } => {}
    }
    Ok(())
}

async fn status(config: &SurfConfig) -> Result<(), String> {
    println!("Agent:   {} (team {})", config.agent_id, config.team_id);
    println!("Store:   {}", config.api_url);
    println!(
        "Zones:   hot {} / warm {} / cold {} of {} tokens",
        config.zones.hot, config.zones.warm, config.zones.cold, config.max_context_tokens
    );

    let tracker_path = ToolUsageTracker::default_path(&config.agent_id);
    match ToolUsageTracker::load(&tracker_path) {
        Some(tracker) => println!(
            "Usage:   {} tool calls, {}",
            tracker.tool_count(),
            tracker.estimate_zone(&config.zones).message
        ),
        None => println!("Usage:   no tool calls recorded"),
    }

    let client = MemoryClient::from_config(config)?;
    match client.get_checkpoint().await {
        Some(cp) => println!(
            "Checkpoint: {} \"{}\"",
            cp.checkpoint_time(),
            cp.conversation_summary
        ),
        None => println!("Checkpoint: none"),
    }
    Ok(())
}

async fn hook(config: SurfConfig, event: HookEvent) -> Result<(), String> {
    let input = read_hook_input();
    let files = HookFiles::for_agent(&config.agent_id);
    let mut session = SessionManager::new(config)?;
    if let Some(out) = run_hook(&mut session, event, &input, &files).await {
        print!("{out}");
    }
    Ok(())
}

/// Host hook JSON from stdin. Empty when stdin is a terminal or unreadable.
fn read_hook_input() -> String {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return String::new();
    }
    let mut buf = String::new();
    if let Err(e) = stdin.read_to_string(&mut buf) {
        warn!("failed to read hook input: {e}");
    }
    buf
}
