//! CLI binary for pdf-intake.
//!
//! `run` drives one intake session in the terminal; `serve` runs the analysis
//! service the `run` command talks to. Both are thin shims over the library.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_intake::config::{provider_key_env, DEFAULT_ANALYSIS_ENDPOINT, DELIVERY_ENDPOINT_ENV};
use pdf_intake::present::{self, ReviewOptions, Style};
use pdf_intake::{
    resolve_delivery_endpoint, resolve_inputs, AppState, Controller, HttpAnalyzer, IntakeConfig,
    Selection, ServerConfig, Session, SessionObserver, WebhookDeliverer,
};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// How often the spinner's stage message rotates.
const STAGE_INTERVAL: Duration = Duration::from_millis(2500);

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a spinner with the current file, plus one log line per
/// finished file.
struct CliObserver {
    bar: ProgressBar,
    style: Style,
    started: Mutex<Option<Instant>>,
}

impl CliObserver {
    fn new(style: Style) -> Arc<Self> {
        let bar = ProgressBar::hidden();
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        Arc::new(Self {
            bar,
            style,
            started: Mutex::new(None),
        })
    }

    fn show(&self) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_prefix(present::processing_step(0));
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn elapsed(&self) -> String {
        let secs = self
            .started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.style.dim(&format!("{secs:.1}s"))
    }
}

impl SessionObserver for CliObserver {
    fn on_state_change(&self, session: &Session) {
        match session.state {
            AppState::Processing if self.bar.is_hidden() => self.show(),
            AppState::Processing => {}
            _ if !self.bar.is_hidden() => {
                self.bar.finish_and_clear();
                self.bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
            }
            _ => {}
        }
    }

    fn on_file_start(&self, index: usize, total: usize, file_name: &str) {
        if let Ok(mut t) = self.started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!(
            "Analyzing document ({index} of {total}): {file_name}"
        ));
    }

    fn on_file_complete(&self, index: usize, total: usize, file_name: &str) {
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            self.style.green("✓"),
            index,
            total,
            file_name,
            self.elapsed(),
        ));
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        // Keep long server messages on one line.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            self.style.red("✗"),
            index,
            total,
            self.style.red(&msg),
            self.elapsed(),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the analysis service (needs the provider's key)
  GEMINI_API_KEY=... pdf-intake serve

  # Or a local model that needs no key
  pdf-intake serve --provider ollama --model llama3.2-vision

  # Analyse two briefs, review, then confirm delivery interactively
  pdf-intake run brief.pdf proposal.pdf

  # Non-interactive: deliver without asking, keep a copy of the JSON
  pdf-intake run --yes --export results.json *.pdf

  # Point at a different webhook
  WEBHOOK_URL=https://hooks.example.com/intake pdf-intake run brief.pdf

ENVIRONMENT VARIABLES:
  ANALYSIS_URL            Analysis endpoint (default http://127.0.0.1:8787/api/analyze)
  WEBHOOK_URL             Delivery webhook (default is a local placeholder)
  GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, MISTRAL_API_KEY
                          Key for the provider selected with --provider; `serve`
                          answers every request with a configuration error
                          when the selected provider's key is unset
  RUST_LOG                Overrides the log filter
"#;

/// Analyse PDF documents, review the results, and deliver them to a webhook.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-intake",
    version,
    about = "Analyse PDF documents, review the results, and deliver them to a webhook",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_INTAKE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_INTAKE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one intake session over the given PDF files.
    Run(RunArgs),
    /// Serve `POST /api/analyze` backed by an LLM provider.
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// PDF files to analyse, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Analysis service endpoint.
    #[arg(long, env = "ANALYSIS_URL", default_value = DEFAULT_ANALYSIS_ENDPOINT)]
    analysis_url: String,

    /// Webhook that receives the reviewed results.
    #[arg(long, env = DELIVERY_ENDPOINT_ENV)]
    webhook_url: Option<String>,

    /// Deliver without asking for confirmation.
    #[arg(short, long)]
    yes: bool,

    /// Show each document's complete extracted text during review.
    #[arg(long)]
    full_text: bool,

    /// Write the reviewed results as pretty JSON to this file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Link shown on the success screen.
    #[arg(long, env = "PDF_INTAKE_RESULT_URL")]
    result_url: Option<String>,

    /// Print the reviewed results as JSON on stdout instead of the review screen.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF_INTAKE_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "PDF_INTAKE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "PDF_INTAKE_PORT", default_value_t = 8787)]
    port: u16,

    /// LLM provider: gemini, openai, anthropic, ollama, ...
    #[arg(long, env = "EDGEQUAKE_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    /// LLM temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per document.
    #[arg(long, default_value_t = 8192)]
    max_tokens: usize,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the per-file feedback in `run`, so library INFO
    // logs are only shown for `serve`.
    let default_filter = match &cli.command {
        Command::Run(_) => "warn",
        Command::Serve(_) => "info",
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        default_filter
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Run(args) => run(args, cli.quiet).await,
        Command::Serve(args) => {
            let api_key = provider_key_env(&args.provider).and_then(|var| std::env::var(var).ok());
            let config = ServerConfig {
                host: args.host,
                port: args.port,
                provider_name: args.provider,
                model: args.model,
                api_key,
                temperature: args.temperature,
                max_tokens: args.max_tokens,
            };
            pdf_intake::server::serve(&config)
                .await
                .context("Analysis server stopped")?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run(args: RunArgs, quiet: bool) -> Result<ExitCode> {
    // With `--json`, stdout carries only the results document.
    let screens_on_stderr = args.json;
    let style = Style {
        ansi: if screens_on_stderr {
            io::stderr().is_terminal()
        } else {
            io::stdout().is_terminal()
        },
    };
    let show_progress = !quiet && !args.no_progress && io::stderr().is_terminal();

    // ── Build collaborators ──────────────────────────────────────────────
    let config = IntakeConfig::builder()
        .analysis_endpoint(&args.analysis_url)
        .delivery_endpoint(resolve_delivery_endpoint(args.webhook_url.as_deref()))
        .build()?;
    let analyzer = Arc::new(HttpAnalyzer::from_config(&config)?);
    let deliverer = Arc::new(WebhookDeliverer::from_config(&config)?);

    let observer = CliObserver::new(Style {
        ansi: io::stderr().is_terminal(),
    });
    let mut controller = Controller::new(analyzer, deliverer);
    if show_progress {
        controller = controller.with_observer(observer.clone());
    }

    // ── Upload ───────────────────────────────────────────────────────────
    let files = resolve_inputs(&args.files).await?;
    let selection = controller.select_files(files)?;
    if !quiet {
        let upload = present::render_upload(controller.session(), style);
        show(screens_on_stderr, &format!("{upload}\n"));
    }
    if let Selection::Rejected(e) = selection {
        if quiet {
            eprintln!("{e}");
        }
        return Ok(ExitCode::from(2));
    }

    // ── Processing ───────────────────────────────────────────────────────
    let rotator = show_progress.then(|| {
        let bar = observer.bar.clone();
        tokio::spawn(async move {
            let mut tick = 0;
            loop {
                tokio::time::sleep(STAGE_INTERVAL).await;
                tick += 1;
                bar.set_prefix(present::processing_step(tick));
            }
        })
    });
    let state = controller.start_analysis().await?;
    if let Some(handle) = rotator {
        handle.abort();
    }

    if state == AppState::Error {
        eprintln!("{}", present::render_error(controller.session(), style));
        controller.retry()?;
        return Ok(ExitCode::FAILURE);
    }

    // ── Review ───────────────────────────────────────────────────────────
    let session = controller.session();
    if let Some(path) = &args.export {
        let json = session
            .results_json_pretty()
            .context("Failed to serialise results")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !quiet {
            eprintln!("{} Results written to {}", style.green("✔"), path.display());
        }
    }

    if args.json {
        println!(
            "{}",
            session
                .results_json_pretty()
                .context("Failed to serialise results")?
        );
    } else if !quiet {
        let options = ReviewOptions {
            full_text: args.full_text,
        };
        println!("{}\n", present::render_review(session, style, options));
    }

    let label = present::confirm_label(session.analysis_results.len());
    if !args.yes && !ask(&format!("{label}? [y/N] ")).await? {
        controller.cancel()?;
        if !quiet {
            eprintln!("{} Cancelled; nothing was sent.", style.dim("◇"));
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Delivery ─────────────────────────────────────────────────────────
    let state = controller.confirm().await?;
    if state == AppState::Error {
        eprintln!("{}", present::render_error(controller.session(), style));
        controller.retry()?;
        return Ok(ExitCode::FAILURE);
    }

    if !quiet {
        let success =
            present::render_success(controller.session(), style, args.result_url.as_deref());
        show(screens_on_stderr, &success);
    }
    controller.start_over()?;
    Ok(ExitCode::SUCCESS)
}

/// Print a human-readable screen on stdout, or on stderr when stdout is
/// reserved for machine-readable output.
fn show(to_stderr: bool, text: &str) {
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
}

/// Ask a yes/no question on stderr and read the answer from stdin.
async fn ask(question: &str) -> Result<bool> {
    eprint!("{question}");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read confirmation")?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
