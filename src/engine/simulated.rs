use super::StatusTx;
use crate::error::SessionError;
use crate::model::{GenerationRequest, SessionResult, StatusUpdate};
use std::time::Duration;
use time::OffsetDateTime;

/// Mock workflow: each step's message is emitted, then the run waits `pause`.
#[derive(Debug, Clone)]
pub struct SimulatedRun {
    steps: Vec<(StatusUpdate, Duration)>,
}

impl Default for SimulatedRun {
    fn default() -> Self {
        let s = Duration::from_secs;
        Self {
            steps: vec![
                (StatusUpdate::WorkflowStarting, s(2)),
                (StatusUpdate::SettingUpEnvironment, s(2)),
                (StatusUpdate::InstallingDependencies, s(2)),
                (StatusUpdate::GeneratingFrames, s(3)),
                (StatusUpdate::OptimizingQuality, s(2)),
                (StatusUpdate::GenerationCompleted, s(1)),
            ],
        }
    }
}

impl SimulatedRun {
    /// Total time the run spends suspended.
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|(_, pause)| *pause).sum()
    }

    /// Never fails; the request only shapes the synthesized result.
    pub async fn run(
        &self,
        req: &GenerationRequest,
        status_tx: &StatusTx,
    ) -> Result<SessionResult, SessionError> {
        tracing::debug!(steps = self.steps.len(), total = ?self.total_duration(), "simulated run");
        for (update, pause) in &self.steps {
            let _ = status_tx.send(update.clone());
            tokio::time::sleep(*pause).await;
        }
        Ok(SessionResult::placeholder(req, OffsetDateTime::now_utc()))
    }
}
