//! board-watch: binary entrypoint
//! One polling run over the configured boards, meant to be triggered by an
//! external scheduler (cron, CI schedule). Exit codes: 0 all targets fine,
//! 1 some target or message failed, 2 fatal (config, credentials, state save).

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use board_watch::config::notify::{TelegramConfig, ENV_BOT_TOKEN, ENV_CHAT_ID};
use board_watch::config::{self, ENV_CONFIG_PATH};
use board_watch::metrics::TextfileMetrics;
use board_watch::notify::{LogNotifier, Notifier, TelegramNotifier};
use board_watch::store::{StateStore, DEFAULT_STATE_PATH, ENV_STATE_PATH};
use board_watch::{HttpFetcher, Watcher};

#[derive(Parser, Debug)]
#[command(name = "board-watch", version, about = "Notify about new posts on bulletin boards")]
struct Cli {
    /// Targets file (TOML or JSON). Defaults: config/targets.toml, targets.json
    #[arg(long, env = ENV_CONFIG_PATH, global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "WATCH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    log_format: LogFormat,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and extract one target; print what was found. No messages, no state.
    Inspect {
        /// Target name from the config
        target: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Seen-id state file
    #[arg(long, env = ENV_STATE_PATH, default_value = DEFAULT_STATE_PATH)]
    state: PathBuf,

    /// Log messages instead of sending them (no credentials needed)
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run: leave the state file untouched
    #[arg(long, requires = "dry_run")]
    no_save: bool,

    #[arg(long, env = ENV_BOT_TOKEN, hide_env_values = true)]
    bot_token: Option<String>,

    #[arg(long, env = ENV_CHAT_ID)]
    chat_id: Option<String>,

    /// Targets fetched at once (overrides run.concurrency)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Send a digest message listing failed targets
    #[arg(long)]
    report_failures: bool,

    /// Write Prometheus metrics here after the run
    #[arg(long, env = "WATCH_METRICS_OUT")]
    metrics_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("board_watch=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let outcome = match &cli.command {
        Some(Command::Inspect { target }) => inspect(&cli, target).await,
        None => run(&cli).await,
    };
    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let args = &cli.run;
    let mut cfg = config::load_default(cli.config.as_deref()).context("loading configuration")?;
    if let Some(n) = args.concurrency {
        cfg.run.concurrency = n;
    }
    if args.report_failures {
        cfg.run.report_failures = true;
    }

    // Credentials are checked before any target is touched.
    let notifier: Arc<dyn Notifier> = if args.dry_run {
        Arc::new(LogNotifier)
    } else {
        let tg = TelegramConfig::new(args.bot_token.clone(), args.chat_id.clone())?;
        Arc::new(TelegramNotifier::new(tg))
    };

    let metrics = match &args.metrics_out {
        Some(_) => Some(TextfileMetrics::install()?),
        None => None,
    };

    let fetcher = Arc::new(HttpFetcher::new()?);
    let watcher = Watcher::new(cfg, fetcher, notifier)?;
    let store = StateStore::new(&args.state);

    info!(
        targets = watcher.config().targets.len(),
        state = %store.path().display(),
        dry_run = args.dry_run,
        "run started"
    );

    let report = if args.no_save {
        let mut state = store.load().await;
        watcher.run_once(&mut state).await
    } else {
        watcher.run(&store).await?
    };

    let failures = report.failures();
    for (name, reason) in &failures {
        warn!(target = %name, "{reason}");
    }
    info!(
        targets = report.outcomes.len(),
        failed = failures.len(),
        notified = report.notified_total(),
        "run finished"
    );

    if let (Some(m), Some(path)) = (&metrics, &args.metrics_out) {
        if let Err(e) = m.write_to(path) {
            warn!("metrics textfile: {e:#}");
        }
    }

    Ok(if failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

async fn inspect(cli: &Cli, name: &str) -> Result<ExitCode> {
    let cfg = config::load_default(cli.config.as_deref()).context("loading configuration")?;
    let target = cfg
        .target(name)
        .cloned()
        .ok_or_else(|| anyhow!("no target named `{name}`"))?;

    let watcher = Watcher::new(cfg, Arc::new(HttpFetcher::new()?), Arc::new(LogNotifier))?;
    let ex = watcher.extract_target(&target).await?;

    println!("target:   {}", target.name);
    println!("strategy: {}", ex.strategy);
    if ex.recovered_by_fallback {
        println!("note:     site rule found nothing; items below come from the generic extractor");
    }
    println!("items:    {}", ex.items.len());
    for it in &ex.items {
        println!("  {:>8}  {}\n            {}", it.item_id, it.title, it.url);
    }
    if let Some(report) = &ex.report {
        println!("structure: {}", serde_json::to_string_pretty(report)?);
    }

    Ok(if ex.items.is_empty() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
