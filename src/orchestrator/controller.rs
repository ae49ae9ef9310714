//! Session lifecycle controller.
//!
//! Owns submit/run/complete orchestration and emits events for presentation layers.

use super::post_process::{process_session_completion, PostRunOptions};
use crate::engine::ExecutionStrategy;
use crate::error::SessionError;
use crate::model::{
    GenerationRequest, SessionEvent, SessionResult, SessionState, StatusLog, StatusUpdate,
};
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Everything a presentation layer needs to draw the current session.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub state: SessionState,
    pub log: StatusLog,
    pub trigger_enabled: bool,
    pub loading_visible: bool,
    pub result: Option<SessionResult>,
    pub error: Option<String>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self {
            state: SessionState::Idle,
            log: StatusLog::default(),
            trigger_enabled: true,
            loading_visible: false,
            result: None,
            error: None,
        }
    }
}

/// Internal handle for a running session task.
///
/// The task (and any timers it owns) is aborted when the handle is dropped, so
/// replacing a session or dropping the controller never leaves a poll loop behind.
struct RunCtx {
    status_rx: UnboundedReceiver<StatusUpdate>,
    handle: Option<JoinHandle<Result<SessionResult, SessionError>>>,
}

impl Drop for RunCtx {
    fn drop(&mut self) {
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }
}

/// Spawn the strategy for `req` and return its run handle.
fn start_run(strategy: &ExecutionStrategy, req: GenerationRequest) -> RunCtx {
    let (status_tx, status_rx) = mpsc::unbounded_channel::<StatusUpdate>();
    let strategy = strategy.clone();
    let handle = tokio::spawn(async move { strategy.run(&req, &status_tx).await });
    RunCtx {
        status_rx,
        handle: Some(handle),
    }
}

pub struct SessionController {
    strategy: ExecutionStrategy,
    post: PostRunOptions,
    view: SessionView,
    event_tx: Option<UnboundedSender<SessionEvent>>,
    run: Option<RunCtx>,
}

impl SessionController {
    pub fn new(strategy: ExecutionStrategy, post: PostRunOptions) -> Self {
        Self {
            strategy,
            post,
            view: SessionView::default(),
            event_tx: None,
            run: None,
        }
    }

    /// Forward view changes to `tx` as they happen.
    pub fn with_events(mut self, tx: UnboundedSender<SessionEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn state(&self) -> SessionState {
        self.view.state
    }

    /// Show the persisted result, if any is still fresh. Intended for startup.
    pub fn restore_last_result(&mut self) -> Option<&SessionResult> {
        self.restore_last_result_at(OffsetDateTime::now_utc())
    }

    pub fn restore_last_result_at(&mut self, now: OffsetDateTime) -> Option<&SessionResult> {
        if self.view.state != SessionState::Idle {
            return None;
        }
        let result = self.post.store.as_ref()?.load_recent(now)?;
        tracing::info!(prompt = %result.prompt, "restored last result");
        self.emit(SessionEvent::Restored {
            result: Box::new(result.clone()),
        });
        self.view.state = SessionState::Succeeded;
        self.view.result = Some(result);
        self.view.result.as_ref()
    }

    /// Validate `request` and start a new session, replacing any previous one.
    ///
    /// An empty prompt is rejected before anything else changes: the error is
    /// shown, the log and state are left as they were.
    pub fn submit(&mut self, request: GenerationRequest) -> Result<(), SessionError> {
        let Some(prompt) = request.trimmed_prompt() else {
            let err = SessionError::empty_prompt();
            self.view.error = Some(err.to_string());
            self.emit(SessionEvent::Invalid(err.to_string()));
            return Err(err);
        };
        let request = GenerationRequest {
            prompt: prompt.to_string(),
            ..request
        };

        // Dropping the old handle aborts its task before the new one starts.
        self.run = None;

        self.view.trigger_enabled = false;
        self.view.loading_visible = true;
        self.view.log.clear();
        self.view.result = None;
        self.view.error = None;
        self.emit(SessionEvent::Reset);
        self.append_status(&StatusUpdate::SessionStarted);
        self.view.state = SessionState::Running;

        tracing::info!(strategy = ?self.strategy.kind(), request = ?request, "session started");
        self.run = Some(start_run(&self.strategy, request));
        Ok(())
    }

    /// Drive the running session to a terminal state, appending status updates as
    /// they arrive. Returns immediately when nothing is running.
    pub async fn wait(&mut self) -> SessionState {
        let joined = loop {
            let Some(ctx) = self.run.as_mut() else {
                return self.view.state;
            };
            let Some(handle) = ctx.handle.as_mut() else {
                break None;
            };
            tokio::select! {
                Some(update) = ctx.status_rx.recv() => {
                    Self::append_to(&mut self.view, self.event_tx.as_ref(), &update);
                }
                // Only take the handle once this branch has won.
                joined = handle => {
                    ctx.handle.take();
                    break Some(joined);
                }
            }
        };

        // Updates sent just before the task returned are still queued.
        if let Some(ctx) = self.run.as_mut() {
            while let Ok(update) = ctx.status_rx.try_recv() {
                Self::append_to(&mut self.view, self.event_tx.as_ref(), &update);
            }
        }
        self.run = None;

        match joined {
            Some(Ok(Ok(result))) => self.succeed(result),
            Some(Ok(Err(e))) => self.fail(&e),
            Some(Err(e)) => self.fail(&SessionError::Task(e.to_string())),
            None => self.fail(&SessionError::Task("run handle missing".into())),
        }
        self.view.state
    }

    /// Submit and wait for the terminal state.
    pub async fn run_session(
        &mut self,
        request: GenerationRequest,
    ) -> Result<SessionState, SessionError> {
        self.submit(request)?;
        Ok(self.wait().await)
    }

    fn succeed(&mut self, result: SessionResult) {
        self.view.loading_visible = false;
        self.view.trigger_enabled = true;

        let processed = process_session_completion(&self.post, &result);
        if let Some(p) = processed.saved_path.as_ref() {
            tracing::debug!(path = %p.display(), "saved last result");
        }
        for msg in processed.messages {
            self.emit(SessionEvent::Info(msg));
        }

        tracing::info!(video_url = %result.video_url, "session succeeded");
        self.emit(SessionEvent::Succeeded {
            result: Box::new(result.clone()),
        });
        self.view.result = Some(result);
        self.view.state = SessionState::Succeeded;
    }

    fn fail(&mut self, err: &SessionError) {
        let message = err.failure_message();
        tracing::info!(error = %err, "session failed");
        self.view.loading_visible = false;
        self.view.trigger_enabled = true;
        self.view.result = None;
        self.view.error = Some(message.clone());
        self.view.state = SessionState::Failed;
        self.emit(SessionEvent::Failed(message));
    }

    fn append_status(&mut self, update: &StatusUpdate) {
        Self::append_to(&mut self.view, self.event_tx.as_ref(), update);
    }

    fn append_to(
        view: &mut SessionView,
        event_tx: Option<&UnboundedSender<SessionEvent>>,
        update: &StatusUpdate,
    ) {
        let entry = view.log.push(update).clone();
        if let Some(tx) = event_tx {
            let _ = tx.send(SessionEvent::Status(entry));
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = self.event_tx.as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RemoteDispatch, SimulatedRun};
    use crate::model::{RemoteConfig, Resolution, Style};
    use crate::storage::ResultStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SIMULATED_LOG: [&str; 7] = [
        "🚀 Starting video generation process...",
        "🚀 Starting GitHub Actions workflow...",
        "📦 Setting up environment...",
        "🐍 Installing Python dependencies...",
        "🎬 Generating video frames...",
        "⚡ Optimizing video quality...",
        "✅ Video generation completed!",
    ];

    fn simulated() -> SessionController {
        SessionController::new(
            ExecutionStrategy::Simulated(SimulatedRun::default()),
            PostRunOptions::default(),
        )
    }

    fn simulated_with_store(dir: &tempfile::TempDir) -> SessionController {
        SessionController::new(
            ExecutionStrategy::Simulated(SimulatedRun::default()),
            PostRunOptions {
                store: Some(ResultStore::new(dir.path().join("last.json"))),
                save: true,
                export_json: None,
            },
        )
    }

    fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn blank_prompts_are_rejected_without_side_effects() {
        for prompt in ["", "   ", "\t\n"] {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let mut ctl = simulated().with_events(tx);

            let err = ctl.submit(GenerationRequest::new(prompt)).unwrap_err();

            assert!(err.is_validation());
            assert_eq!(ctl.state(), SessionState::Idle);
            assert!(ctl.view().log.is_empty());
            assert!(ctl.view().trigger_enabled);
            assert!(!ctl.view().loading_visible);
            assert_eq!(ctl.view().error.as_deref(), Some("Please enter a text prompt"));
            assert_eq!(ctl.wait().await, SessionState::Idle);
            let events = drain(&mut rx);
            assert_eq!(events.len(), 1);
            assert!(matches!(events[0], SessionEvent::Invalid(_)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_session_logs_six_steps_then_succeeds() {
        let mut ctl = simulated();
        let req = GenerationRequest::new("A cat riding a skateboard")
            .with_duration(10)
            .with_resolution(Resolution::P720)
            .with_style(Style::KenBurns);

        ctl.submit(req).unwrap();
        assert_eq!(ctl.state(), SessionState::Running);
        assert!(!ctl.view().trigger_enabled);
        assert!(ctl.view().loading_visible);

        assert_eq!(ctl.wait().await, SessionState::Succeeded);

        let view = ctl.view();
        assert_eq!(view.log.messages(), SIMULATED_LOG.to_vec());
        let result = view.result.as_ref().unwrap();
        assert_eq!(result.style.label(), "Ken Burns Effect");
        assert!(!result.video_url.is_empty());
        assert_eq!(result.prompt, "A cat riding a skateboard");
        assert_eq!(result.duration, 10);
        assert_eq!(result.resolution, Resolution::P720);
        assert!(view.trigger_enabled);
        assert!(!view.loading_visible);
        assert!(view.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn step_count_ignores_request_fields() {
        for style in [Style::AnimatedText, Style::Slideshow, Style::KenBurns] {
            for resolution in [Resolution::P480, Resolution::P1080] {
                let mut ctl = simulated();
                let req = GenerationRequest::new("x")
                    .with_duration(60)
                    .with_style(style)
                    .with_resolution(resolution);
                assert_eq!(ctl.run_session(req).await.unwrap(), SessionState::Succeeded);
                assert_eq!(ctl.view().log.len(), 7);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resubmit_resets_log_and_hides_result_first() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ctl = simulated().with_events(tx);
        ctl.run_session(GenerationRequest::new("first")).await.unwrap();
        assert!(ctl.view().result.is_some());
        drain(&mut rx);

        ctl.submit(GenerationRequest::new("second")).unwrap();

        assert_eq!(ctl.view().log.len(), 1);
        assert!(ctl.view().result.is_none());
        let events = drain(&mut rx);
        assert!(matches!(events[0], SessionEvent::Reset));
        match &events[1] {
            SessionEvent::Status(entry) => {
                assert_eq!(entry.message, "🚀 Starting video generation process...")
            }
            other => panic!("unexpected event: {other:?}"),
        }

        assert_eq!(ctl.wait().await, SessionState::Succeeded);
        assert_eq!(ctl.view().result.as_ref().unwrap().prompt, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_a_running_session_discards_its_updates() {
        let mut ctl = simulated();
        ctl.submit(GenerationRequest::new("first")).unwrap();
        // Let the first run emit a few steps.
        tokio::time::sleep(Duration::from_secs(5)).await;

        ctl.submit(GenerationRequest::new("second")).unwrap();
        assert_eq!(ctl.wait().await, SessionState::Succeeded);

        assert_eq!(ctl.view().log.messages(), SIMULATED_LOG.to_vec());
        assert_eq!(ctl.view().result.as_ref().unwrap().prompt, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_run_handle_aborts_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let (_status_tx, status_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            flag.store(true, Ordering::SeqCst);
            Err::<SessionResult, _>(SessionError::Task("unreachable".into()))
        });
        let ctx = RunCtx {
            status_rx,
            handle: Some(handle),
        };

        drop(ctx);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn success_persists_and_restores() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctl = simulated_with_store(&dir);
        let req = GenerationRequest::new("A cat riding a skateboard").with_style(Style::KenBurns);
        ctl.run_session(req).await.unwrap();
        let shown = ctl.view().result.clone().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut reloaded = simulated_with_store(&dir).with_events(tx);
        let stamp = OffsetDateTime::from_unix_timestamp_nanos(shown.timestamp as i128 * 1_000_000)
            .unwrap();
        let restored = reloaded
            .restore_last_result_at(stamp + time::Duration::minutes(23 * 60 + 59))
            .cloned();

        assert_eq!(restored.as_ref(), Some(&shown));
        assert_eq!(reloaded.state(), SessionState::Succeeded);
        assert!(reloaded.view().log.is_empty());
        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [SessionEvent::Restored { .. }]));

        let mut stale = simulated_with_store(&dir);
        assert!(stale
            .restore_last_result_at(stamp + time::Duration::minutes(24 * 60 + 1))
            .is_none());
        assert_eq!(stale.state(), SessionState::Idle);
        assert!(stale.view().result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_store_is_silently_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("last.json"), b"\x00garbage").unwrap();
        let mut ctl = simulated_with_store(&dir);
        assert!(ctl.restore_last_result().is_none());
        assert_eq!(ctl.state(), SessionState::Idle);
        assert!(ctl.view().error.is_none());
    }

    #[tokio::test]
    async fn remote_http_failure_ends_in_failed_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let remote = RemoteDispatch::new(RemoteConfig {
            api_base: server.uri(),
            ..Default::default()
        })
        .unwrap();
        let mut ctl = SessionController::new(
            ExecutionStrategy::RemoteDispatch(remote),
            PostRunOptions {
                store: Some(ResultStore::new(dir.path().join("last.json"))),
                save: true,
                export_json: None,
            },
        );

        let state = ctl
            .run_session(GenerationRequest::new("p").with_access_token("t"))
            .await
            .unwrap();

        assert_eq!(state, SessionState::Failed);
        let view = ctl.view();
        let error = view.error.as_deref().unwrap();
        assert!(error.contains("Not Found"), "{error}");
        assert!(error.starts_with("Failed to generate video: "));
        assert!(view.result.is_none());
        assert!(view.trigger_enabled);
        assert_eq!(view.log.len(), 1);
        assert!(!dir.path().join("last.json").exists());
    }

    #[tokio::test]
    async fn remote_success_polls_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let remote = RemoteDispatch::new(RemoteConfig {
            api_base: server.uri(),
            poll_interval: Duration::from_millis(20),
            completion_delay: Duration::from_millis(50),
            ..Default::default()
        })
        .unwrap();
        let mut ctl = SessionController::new(
            ExecutionStrategy::RemoteDispatch(remote),
            PostRunOptions::default(),
        );

        let state = ctl
            .run_session(GenerationRequest::new("p").with_access_token("t"))
            .await
            .unwrap();

        assert_eq!(state, SessionState::Succeeded);
        let messages = ctl.view().log.messages();
        assert_eq!(messages[1], "✅ Workflow triggered successfully!");
        assert_eq!(messages[2], "⏳ Checking workflow status...");
        assert_eq!(*messages.last().unwrap(), "✅ Workflow completed!");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_session_can_be_resubmitted() {
        let remote = RemoteDispatch::new(RemoteConfig::default()).unwrap();
        let mut ctl = SessionController::new(
            ExecutionStrategy::RemoteDispatch(remote),
            PostRunOptions::default(),
        );
        // No token: fails before any request is made.
        let state = ctl.run_session(GenerationRequest::new("p")).await.unwrap();
        assert_eq!(state, SessionState::Failed);
        assert!(ctl.view().error.is_some());

        ctl.submit(GenerationRequest::new("again")).unwrap();
        assert_eq!(ctl.state(), SessionState::Running);
        assert!(ctl.view().error.is_none());
        assert_eq!(ctl.view().log.len(), 1);
    }
}
