//! Minimal client for the GitHub Actions `workflow_dispatch` endpoint.

use crate::error::SessionError;
use crate::model::{GenerationRequest, RemoteConfig};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use std::time::Duration;

const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";

#[derive(Debug, Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: DispatchInputs<'a>,
}

/// Workflow inputs are always strings on the GitHub side.
#[derive(Debug, Serialize)]
struct DispatchInputs<'a> {
    text_prompt: &'a str,
    duration: String,
    resolution: &'static str,
    style: &'static str,
}

#[derive(Debug, Clone)]
pub(crate) struct WorkflowClient {
    http: reqwest::Client,
    dispatch_url: String,
    git_ref: String,
}

impl WorkflowClient {
    pub(crate) fn new(cfg: &RemoteConfig) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            dispatch_url: dispatch_url(cfg),
            git_ref: cfg.git_ref.clone(),
        })
    }

    /// Fire the workflow once. Any non-2xx answer is a hard failure.
    pub(crate) async fn dispatch(
        &self,
        req: &GenerationRequest,
        token: &str,
    ) -> Result<(), SessionError> {
        let body = DispatchBody {
            git_ref: &self.git_ref,
            inputs: DispatchInputs {
                text_prompt: req.trimmed_prompt().unwrap_or_default(),
                duration: req.duration_secs.to_string(),
                resolution: req.resolution.as_str(),
                style: req.style.as_str(),
            },
        };

        tracing::debug!(url = %self.dispatch_url, "dispatching workflow");
        let resp = self
            .http
            .post(&self.dispatch_url)
            .header(AUTHORIZATION, format!("token {token}"))
            .header(ACCEPT, GITHUB_V3_JSON)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::Dispatch {
                status: status.as_u16(),
                status_text: status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| status.as_str().to_string()),
            });
        }
        Ok(())
    }
}

fn dispatch_url(cfg: &RemoteConfig) -> String {
    format!(
        "{}/repos/{}/actions/workflows/{}/dispatches",
        cfg.api_base.trim_end_matches('/'),
        cfg.repo.trim_matches('/'),
        cfg.workflow
    )
}
