use super::github::WorkflowClient;
use super::StatusTx;
use crate::error::SessionError;
use crate::model::{GenerationRequest, RemoteConfig, SessionResult, StatusUpdate};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{Instant, MissedTickBehavior};

/// Dispatches the workflow, then polls until the completion deadline passes.
///
/// No job-completion payload is ever inspected: completion fires a fixed delay
/// after the first status check and the result points at the placeholder video.
#[derive(Debug, Clone)]
pub struct RemoteDispatch {
    client: WorkflowClient,
    poll_interval: Duration,
    completion_delay: Duration,
}

impl RemoteDispatch {
    pub fn new(cfg: RemoteConfig) -> Result<Self, SessionError> {
        if cfg.poll_interval.is_zero() {
            return Err(SessionError::InvalidConfig(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(Self {
            client: WorkflowClient::new(&cfg)?,
            poll_interval: cfg.poll_interval,
            completion_delay: cfg.completion_delay,
        })
    }

    pub async fn run(
        &self,
        req: &GenerationRequest,
        status_tx: &StatusTx,
    ) -> Result<SessionResult, SessionError> {
        let token = req
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;

        self.client.dispatch(req, token).await?;
        let _ = status_tx.send(StatusUpdate::WorkflowTriggered);

        self.poll_until_complete(status_tx).await;
        let _ = status_tx.send(StatusUpdate::WorkflowCompleted);

        Ok(SessionResult::placeholder(req, OffsetDateTime::now_utc()))
    }

    /// The interval lives in this future, so dropping or aborting the run stops it.
    async fn poll_until_complete(&self, status_tx: &StatusTx) {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                // Completion wins a tie with a poll tick.
                biased;
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    tracing::debug!("workflow completion deadline reached");
                    break;
                }
                _ = ticker.tick() => {
                    let _ = status_tx.send(StatusUpdate::CheckingWorkflow);
                    if deadline.is_none() {
                        deadline = Some(Instant::now() + self.completion_delay);
                    }
                }
            }
        }
    }
}
