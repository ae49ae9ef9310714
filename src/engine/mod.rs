mod github;
mod remote;
mod simulated;

pub use remote::RemoteDispatch;
pub use simulated::SimulatedRun;

use crate::error::SessionError;
use crate::model::{GenerationRequest, SessionConfig, SessionResult, StatusUpdate, StrategyKind};
use tokio::sync::mpsc;

/// Channel a running strategy reports progress on. Messages arrive in send order.
pub type StatusTx = mpsc::UnboundedSender<StatusUpdate>;

/// How a session gets from a valid request to a result.
#[derive(Debug, Clone)]
pub enum ExecutionStrategy {
    /// Fixed-timing mock run, no external calls.
    Simulated(SimulatedRun),
    /// Workflow dispatch followed by status polling.
    RemoteDispatch(RemoteDispatch),
}

impl ExecutionStrategy {
    pub fn from_config(cfg: &SessionConfig) -> Result<Self, SessionError> {
        Ok(match cfg.strategy {
            StrategyKind::Simulated => ExecutionStrategy::Simulated(SimulatedRun::default()),
            StrategyKind::RemoteDispatch => {
                ExecutionStrategy::RemoteDispatch(RemoteDispatch::new(cfg.remote.clone())?)
            }
        })
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            ExecutionStrategy::Simulated(_) => StrategyKind::Simulated,
            ExecutionStrategy::RemoteDispatch(_) => StrategyKind::RemoteDispatch,
        }
    }

    pub async fn run(
        &self,
        req: &GenerationRequest,
        status_tx: &StatusTx,
    ) -> Result<SessionResult, SessionError> {
        match self {
            ExecutionStrategy::Simulated(sim) => sim.run(req, status_tx).await,
            ExecutionStrategy::RemoteDispatch(remote) => remote.run(req, status_tx).await,
        }
    }
}
