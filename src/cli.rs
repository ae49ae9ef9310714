use crate::engine::ExecutionStrategy;
use crate::model::{
    GenerationRequest, RemoteConfig, Resolution, SessionConfig, SessionEvent, SessionState,
    StrategyKind, Style,
};
use crate::orchestrator::{PostRunOptions, SessionController};
use crate::storage::ResultStore;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "vidgen",
    version,
    about = "Generate a video from a text prompt through a simulated or dispatched workflow"
)]
pub struct Cli {
    /// Text prompt describing the video. Omit to show the last result.
    pub prompt: Option<String>,

    /// Video length in seconds
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=120))]
    pub duration: u32,

    /// Output resolution
    #[arg(long, value_enum, default_value = "720p")]
    pub resolution: Resolution,

    /// Visual style
    #[arg(long, value_enum, default_value = "animated_text")]
    pub style: Style,

    /// Access token passed through to the workflow API
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Dispatch a real workflow instead of the simulated run
    #[arg(long)]
    pub remote: bool,

    /// Base URL of the workflow API
    #[arg(long, default_value = "https://api.github.com")]
    pub api_base: String,

    /// Repository hosting the workflow, as owner/name
    #[arg(long, default_value = "your-username/your-repo")]
    pub repo: String,

    /// Workflow file name
    #[arg(long, default_value = "text-to-video.yml")]
    pub workflow: String,

    /// Git ref the workflow runs on
    #[arg(long, default_value = "main")]
    pub git_ref: String,

    /// Interval between workflow status checks
    #[arg(long, default_value = "5s")]
    pub poll_interval: humantime::Duration,

    /// Delay after the first status check before the run counts as complete
    #[arg(long, default_value = "10s")]
    pub completion_delay: humantime::Duration,

    /// Path of the last-result file (defaults to the user data directory)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,

    /// Print JSON result and exit
    #[arg(long)]
    pub json: bool,

    /// Run silently: suppress all output except errors (for scripts)
    #[arg(long)]
    pub silent: bool,

    /// Export the result as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Build a `SessionConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SessionConfig {
    SessionConfig {
        strategy: if args.remote {
            StrategyKind::RemoteDispatch
        } else {
            StrategyKind::Simulated
        },
        remote: RemoteConfig {
            api_base: args.api_base.clone(),
            repo: args.repo.clone(),
            workflow: args.workflow.clone(),
            git_ref: args.git_ref.clone(),
            poll_interval: Duration::from(args.poll_interval),
            completion_delay: Duration::from(args.completion_delay),
            ..RemoteConfig::default()
        },
        store_path: args.store.clone(),
        save_results: args.auto_save,
    }
}

/// Build the request from the form values, or `None` when no prompt was given.
pub fn build_request(args: &Cli) -> Option<GenerationRequest> {
    let prompt = args.prompt.as_ref()?;
    let mut req = GenerationRequest::new(prompt.clone())
        .with_duration(args.duration)
        .with_resolution(args.resolution)
        .with_style(args.style);
    if let Some(token) = args.token.as_deref().filter(|t| !t.trim().is_empty()) {
        req = req.with_access_token(token.trim());
    }
    Some(req)
}

fn check_output_modes(args: &Cli) -> Result<()> {
    if args.silent && !args.json {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json. Use --silent --json together."
        ));
    }
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    check_output_modes(&args)?;

    let cfg = build_config(&args);
    tracing::debug!(config = ?cfg, "resolved configuration");

    // A missing data directory only disables persistence.
    let store = match ResultStore::open(cfg.store_path.as_deref()) {
        Ok(s) => {
            tracing::debug!(path = %s.path().display(), "last-result store");
            Some(s)
        }
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "last-result store unavailable");
            None
        }
    };
    let post = PostRunOptions {
        store,
        save: cfg.save_results,
        export_json: args.export_json.clone(),
    };
    let strategy =
        ExecutionStrategy::from_config(&cfg).context("failed to set up execution strategy")?;

    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let mut controller = SessionController::new(strategy, post).with_events(evt_tx);
    let request = build_request(&args);
    let show_last_only = request.is_none();

    let handle = tokio::spawn(async move {
        controller.restore_last_result();
        let outcome = match request {
            Some(req) => controller.run_session(req).await.map(Some),
            None => Ok(None),
        };
        (outcome, controller.view().clone())
    });

    let (out_tx, out_handle) = spawn_output_writer();
    let text_mode = !args.json && !args.silent;

    while let Some(ev) = evt_rx.recv().await {
        match ev {
            SessionEvent::Status(entry) if text_mode => {
                let _ = out_tx.send(OutputLine::Stderr(
                    crate::text_summary::format_status_line(&entry),
                ));
            }
            SessionEvent::Info(msg) if !args.silent => {
                let _ = out_tx.send(OutputLine::Stderr(msg));
            }
            // Results and errors are reported from the final view below.
            _ => {}
        }
    }

    let (outcome, view) = handle.await.context("session task failed")?;
    let outcome = outcome.map_err(|e| anyhow::anyhow!(e.to_string()));

    let res = match outcome {
        Err(e) => Err(e),
        Ok(Some(SessionState::Failed)) => Err(anyhow::anyhow!(view
            .error
            .clone()
            .unwrap_or_else(|| "Failed to generate video".into()))),
        Ok(_) => {
            match view.result.as_ref() {
                Some(result) if args.json && !args.silent => {
                    let out = serde_json::to_string_pretty(result)?;
                    let _ = out_tx.send(OutputLine::Stdout(out));
                }
                Some(result) if text_mode => {
                    for line in crate::text_summary::build_text_summary(result).lines {
                        let _ = out_tx.send(OutputLine::Stdout(line));
                    }
                }
                None if show_last_only && !args.silent => {
                    let _ = out_tx.send(OutputLine::Stderr(
                        "No video generated in the last 24 hours. Pass a prompt to create one."
                            .into(),
                    ));
                }
                _ => {}
            }
            Ok(())
        }
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}
