//! JSON-lines command surface.
//!
//! One request object per input line, one response object per output line.
//! Requests carry a caller-chosen `id` which is echoed back unchanged.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::EngineError;

use super::controller::RatingController;
use super::recorder::Submission;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    Register,
    #[serde(rename_all = "camelCase")]
    NextTrial {
        user_id: String,
        #[serde(default)]
        submission: Option<Submission>,
    },
    #[serde(rename_all = "camelCase")]
    Leaderboard { user_id: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    pub redirect: Option<String>,
    pub retryable: bool,
    /// The submission that failed to save, returned so it can be resent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resubmit: Option<Submission>,
}

impl ErrorBody {
    fn from_engine(err: &EngineError, resubmit: Option<Submission>) -> Self {
        let retryable = err.is_retryable();
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            redirect: err.redirect().map(str::to_string),
            retryable,
            resubmit: if retryable { resubmit } else { None },
        }
    }

    fn bad_request(message: String) -> Self {
        Self {
            kind: "badRequest".to_string(),
            message,
            redirect: None,
            retryable: false,
            resubmit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, error: ErrorBody) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaderboardView {
    position: u64,
    n_users: u64,
    n_rated: u64,
    percentile: f64,
    is_leader: bool,
    text: String,
}

/// Parse one request line and run it.
pub async fn handle_line(controller: &RatingController, line: &str) -> Response {
    let request: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => {
            return Response::err(Value::Null, ErrorBody::bad_request(format!("invalid JSON: {err}")))
        }
    };
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let command: Command = match serde_json::from_value(request) {
        Ok(command) => command,
        Err(err) => return Response::err(id, ErrorBody::bad_request(format!("invalid request: {err}"))),
    };
    dispatch(controller, id, command).await
}

pub async fn dispatch(controller: &RatingController, id: Value, command: Command) -> Response {
    let outcome = match command {
        Command::Register => controller
            .register()
            .await
            .map(|user| serde_json::json!({ "userId": user.id })),
        Command::NextTrial {
            user_id,
            submission,
        } => {
            let payload = controller.next_trial(&user_id, submission.as_ref()).await;
            match payload {
                Ok(payload) => to_value(&payload),
                Err(err) => return Response::err(id, ErrorBody::from_engine(&err, submission)),
            }
        }
        Command::Leaderboard { user_id } => {
            controller
                .leaderboard(&user_id)
                .await
                .and_then(|standing| {
                    to_value(&LeaderboardView {
                        position: standing.position,
                        n_users: standing.n_users,
                        n_rated: standing.n_rated,
                        percentile: standing.percentile,
                        is_leader: standing.is_leader(),
                        text: standing.text(),
                    })
                })
        }
    };

    match outcome {
        Ok(result) => Response::ok(id, result),
        Err(err) => Response::err(id, ErrorBody::from_engine(&err, None)),
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|err| EngineError::Configuration(err.to_string()))
}

/// Serve requests from `reader` until end of input.
pub async fn serve<R, W>(controller: &RatingController, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(controller, &line).await;
        if let Some(error) = &response.error {
            warn!("Request {} failed: {}", response.id, error.message);
        } else {
            debug!("Request {} answered", response.id);
        }
        let encoded = serde_json::to_string(&response).context("failed to encode response")? + "\n";
        writer
            .write_all(encoded.as_bytes())
            .await
            .context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
    }
    Ok(())
}
