use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;

/// Sample video served for every result; no real rendering happens on this side.
pub const PLACEHOLDER_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

/// How long a persisted result stays eligible for restore.
pub const RESULT_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Which execution path a session takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    Simulated,
    RemoteDispatch,
}

/// Workflow endpoint and polling cadence for the remote path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub api_base: String,
    /// `owner/name` of the repository hosting the workflow.
    pub repo: String,
    pub workflow: String,
    pub git_ref: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Delay between the first status check and the synthetic completion.
    #[serde(with = "humantime_serde")]
    pub completion_delay: Duration,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".into(),
            repo: "your-username/your-repo".into(),
            workflow: "text-to-video.yml".into(),
            git_ref: "main".into(),
            poll_interval: Duration::from_secs(5),
            completion_delay: Duration::from_secs(10),
            user_agent: format!("vidgen-cli/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub strategy: StrategyKind,
    pub remote: RemoteConfig,
    /// Override for the last-result file; `None` uses the data directory.
    #[serde(default)]
    pub store_path: Option<std::path::PathBuf>,
    pub save_results: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Simulated,
            remote: RemoteConfig::default(),
            store_path: None,
            save_results: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Style {
    AnimatedText,
    Slideshow,
    KenBurns,
}

impl Style {
    /// Wire value used in workflow inputs and persisted records.
    pub fn as_str(self) -> &'static str {
        match self {
            Style::AnimatedText => "animated_text",
            Style::Slideshow => "slideshow",
            Style::KenBurns => "ken_burns",
        }
    }

    /// Human-readable name shown in the result panel.
    pub fn label(self) -> &'static str {
        match self {
            Style::AnimatedText => "Animated Text",
            Style::Slideshow => "Slideshow",
            Style::KenBurns => "Ken Burns Effect",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Resolution {
    #[serde(rename = "480p")]
    #[value(name = "480p")]
    P480,
    #[serde(rename = "720p")]
    #[value(name = "720p")]
    P720,
    #[serde(rename = "1080p")]
    #[value(name = "1080p")]
    P1080,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One submission, built from the current form (CLI argument) values.
#[derive(Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub duration_secs: u32,
    pub resolution: Resolution,
    pub style: Style,
    pub access_token: Option<String>,
}

// Manual impl keeps the access token out of logs.
impl fmt::Debug for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationRequest")
            .field("prompt", &self.prompt)
            .field("duration_secs", &self.duration_secs)
            .field("resolution", &self.resolution)
            .field("style", &self.style)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            duration_secs: 10,
            resolution: Resolution::P720,
            style: Style::AnimatedText,
            access_token: None,
        }
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = secs;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Prompt with surrounding whitespace removed, or `None` when nothing is left.
    pub fn trimmed_prompt(&self) -> Option<&str> {
        let p = self.prompt.trim();
        (!p.is_empty()).then_some(p)
    }
}

/// Terminal output of a successful session. Also the persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub prompt: String,
    pub duration: u32,
    pub resolution: Resolution,
    pub style: Style,
    #[serde(default = "default_video_url")]
    pub video_url: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

fn default_video_url() -> String {
    PLACEHOLDER_VIDEO_URL.to_string()
}

impl SessionResult {
    /// Synthesize a placeholder result for `req`, stamped with `now`.
    pub fn placeholder(req: &GenerationRequest, now: OffsetDateTime) -> Self {
        Self {
            prompt: req.trimmed_prompt().unwrap_or_default().to_string(),
            duration: req.duration_secs,
            resolution: req.resolution,
            style: req.style,
            video_url: PLACEHOLDER_VIDEO_URL.to_string(),
            timestamp: unix_millis(now),
        }
    }

    /// Whether the result is young enough to be restored at `now`.
    pub fn is_fresh_at(&self, now: OffsetDateTime) -> bool {
        // Out-of-range stamps from a corrupt slot count as stale.
        unix_millis(now)
            .checked_sub(self.timestamp)
            .is_some_and(|age_ms| age_ms < RESULT_MAX_AGE.as_millis() as i64)
    }

    /// Link target offered for downloading the video.
    pub fn download_url(&self) -> &str {
        &self.video_url
    }
}

pub fn unix_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Progress messages emitted while a session runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusUpdate {
    SessionStarted,
    WorkflowStarting,
    SettingUpEnvironment,
    InstallingDependencies,
    GeneratingFrames,
    OptimizingQuality,
    GenerationCompleted,
    WorkflowTriggered,
    CheckingWorkflow,
    WorkflowCompleted,
}

impl StatusUpdate {
    /// Render a human-readable message for the status log.
    pub fn to_message(&self) -> String {
        match self {
            StatusUpdate::SessionStarted => "🚀 Starting video generation process...".into(),
            StatusUpdate::WorkflowStarting => "🚀 Starting GitHub Actions workflow...".into(),
            StatusUpdate::SettingUpEnvironment => "📦 Setting up environment...".into(),
            StatusUpdate::InstallingDependencies => "🐍 Installing Python dependencies...".into(),
            StatusUpdate::GeneratingFrames => "🎬 Generating video frames...".into(),
            StatusUpdate::OptimizingQuality => "⚡ Optimizing video quality...".into(),
            StatusUpdate::GenerationCompleted => "✅ Video generation completed!".into(),
            StatusUpdate::WorkflowTriggered => "✅ Workflow triggered successfully!".into(),
            StatusUpdate::CheckingWorkflow => "⏳ Checking workflow status...".into(),
            StatusUpdate::WorkflowCompleted => "✅ Workflow completed!".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub at: OffsetDateTime,
    pub message: String,
}

/// Append-only log for the current session.
#[derive(Debug, Clone, Default)]
pub struct StatusLog {
    entries: Vec<StatusEntry>,
}

impl StatusLog {
    pub fn push(&mut self, update: &StatusUpdate) -> &StatusEntry {
        self.entries.push(StatusEntry {
            at: OffsetDateTime::now_utc(),
            message: update.to_message(),
        });
        // Just pushed; cannot be empty.
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }
}

/// Events emitted by the controller and consumed by presentation layers, in the
/// order the view changes.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Log cleared, result and error hidden, trigger disabled.
    Reset,
    Status(StatusEntry),
    Succeeded {
        // Boxed to keep the enum small.
        result: Box<SessionResult>,
    },
    Failed(String),
    /// A persisted result was shown on startup.
    Restored {
        result: Box<SessionResult>,
    },
    /// Submission rejected before the session started.
    Invalid(String),
    /// Side notes such as save or export outcomes.
    Info(String),
}
