use std::time::Duration;

use shared::{
    domain::FeedItem,
    protocol::{ListResponse, TaskState},
};
use tracing::{debug, warn};

use crate::{
    error::{ClientError, Result},
    transport::FeedApi,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

/// Waits for a background fetch to finish and returns the refreshed list.
///
/// With a task id the task-status endpoint is consulted first; once it turns
/// out to be missing, or without a task id, completion means the list is no
/// longer empty. Errors on individual attempts are logged and retried.
pub async fn wait_for_completion<T: FeedItem>(
    api: &dyn FeedApi<T>,
    task_id: Option<&str>,
    policy: PollPolicy,
) -> Result<ListResponse<T>> {
    let category = T::CATEGORY;
    let mut status_endpoint = task_id;

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        if let Some(id) = status_endpoint {
            match api.task_status(id).await {
                Ok(Some(status)) if !status.state.is_terminal() => {
                    debug!(%category, attempt, task_id = id, state = ?status.state, "fetch task still running");
                    continue;
                }
                Ok(Some(status)) => match status.state {
                    TaskState::Success if status.reported_failure() => {
                        return Err(ClientError::TaskFailed {
                            task_id: id.to_string(),
                            message: status.message().unwrap_or_default(),
                        });
                    }
                    TaskState::Success => {
                        debug!(%category, attempt, task_id = id, "fetch task finished");
                        return api.list().await;
                    }
                    _ => {
                        return Err(ClientError::TaskFailed {
                            task_id: id.to_string(),
                            message: status
                                .message()
                                .unwrap_or_else(|| "task reported failure".to_string()),
                        });
                    }
                },
                Ok(None) => {
                    debug!(%category, "task status unavailable, polling the list instead");
                    status_endpoint = None;
                }
                Err(err) => {
                    warn!(%category, attempt, error = %err, "task status check failed");
                    continue;
                }
            }
        }

        match api.list().await {
            Ok(list) if !list.data.is_empty() => {
                debug!(%category, attempt, count = list.data.len(), "list populated");
                return Ok(list);
            }
            Ok(_) => debug!(%category, attempt, "list still empty"),
            Err(err) => warn!(%category, attempt, error = %err, "list check failed"),
        }
    }

    Err(ClientError::PollTimeout {
        attempts: policy.max_attempts,
    })
}
