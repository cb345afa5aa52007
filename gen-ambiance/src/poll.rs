//! Bounded status polling for asynchronous providers.

use anyhow::Result;
use gateway_client::{ErrorKind, Gateway, HttpTransport, PollableTask};
use log::{debug, warn};
use std::time::Duration;
use thiserror::Error;

/// Polling-related errors.
#[derive(Debug, Error)]
pub enum PollError {
    #[error(
        "Task {} still {} after {attempts} status checks; resume with `gen-ambiance status {} --wait`",
        .task.task_id,
        .task.status.label(),
        .task.task_id
    )]
    Exhausted { attempts: u32, task: PollableTask },
}

/// How often and how long to check on a task.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval_secs: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval: Duration::from_secs(interval_secs),
        }
    }
}

/// Poll until the task settles or the attempts run out.
///
/// A provider that cannot be reached costs an attempt; any other gateway error
/// ends the loop. `on_update` sees every successful observation.
pub async fn wait_for_completion<T, F>(
    gateway: &Gateway<T>,
    task_id: &str,
    policy: &PollPolicy,
    mut on_update: F,
) -> Result<PollableTask>
where
    T: HttpTransport,
    F: FnMut(u32, &PollableTask),
{
    let mut last = None;

    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.interval).await;
        }

        match gateway.poll_status(task_id).await {
            Ok(task) => {
                debug!(
                    "Status check {}/{} for {}: {}",
                    attempt,
                    policy.max_attempts,
                    task_id,
                    task.status.label()
                );
                on_update(attempt, &task);
                if task.is_terminal() {
                    return Ok(task);
                }
                last = Some(task);
            }
            Err(e) if e.kind() == ErrorKind::Unreachable && attempt < policy.max_attempts => {
                warn!(
                    "Status check {}/{} failed: {}",
                    attempt, policy.max_attempts, e
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    let task = last.unwrap_or_else(|| PollableTask::queued(task_id));
    Err(PollError::Exhausted {
        attempts: policy.max_attempts,
        task,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_client::profile::{ArtifactSpec, ResponseShape, StatusSpec};
    use gateway_client::transport::TransportError;
    use gateway_client::{GatewayError, MockTransport, ProviderProfile, TaskStatus};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn profile() -> ProviderProfile {
        let mut table = BTreeMap::new();
        table.insert("PENDING".to_string(), TaskStatus::Queued);
        table.insert("SUCCESS".to_string(), TaskStatus::Succeeded);
        table.insert("FAILED".to_string(), TaskStatus::Failed);

        ProviderProfile::new(
            "test",
            "music",
            "https://provider.example",
            "/generate",
            ResponseShape::Async {
                task_id_pointer: "/taskId".into(),
                status: StatusSpec {
                    path: "/status?taskId={task_id}".into(),
                    timeout: Duration::from_secs(5),
                    status_pointer: "/status".into(),
                    table,
                    artifact: ArtifactSpec::Url {
                        pointer: "/url".into(),
                    },
                    failure_pointer: Some("/error".into()),
                },
            },
        )
    }

    fn fast(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            max_attempts,
            interval: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_polls_until_success() {
        let gateway = Gateway::new(
            MockTransport::new()
                .then_json(200, json!({"status": "PENDING"}))
                .then_json(200, json!({"status": "TEXT_SUCCESS"}))
                .then_json(200, json!({"status": "SUCCESS", "url": "https://x/y.mp3"})),
        );
        gateway.track("abc123", &profile()).unwrap();

        let mut seen = Vec::new();
        let task = wait_for_completion(&gateway, "abc123", &fast(10), |attempt, task| {
            seen.push((attempt, task.status))
        })
        .await
        .unwrap();

        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.artifact.unwrap().url(), Some("https://x/y.mp3"));
        assert_eq!(
            seen,
            vec![
                (1, TaskStatus::Queued),
                (2, TaskStatus::Processing),
                (3, TaskStatus::Succeeded),
            ]
        );
        assert_eq!(gateway.transport().call_count(), 3);
    }

    #[tokio::test]
    async fn test_failed_task_returns() {
        let gateway = Gateway::new(
            MockTransport::new().then_json(200, json!({"status": "FAILED", "error": "Sensitive words"})),
        );
        gateway.track("t1", &profile()).unwrap();

        let task = wait_for_completion(&gateway, "t1", &fast(5), |_, _| {})
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.message.as_deref(), Some("Sensitive words"));
    }

    #[tokio::test]
    async fn test_exhausted_names_task() {
        let gateway = Gateway::new(MockTransport::always_responds(200, json!({"status": "PENDING"})));
        gateway.track("slow-task", &profile()).unwrap();

        let err = wait_for_completion(&gateway, "slow-task", &fast(3), |_, _| {})
            .await
            .unwrap_err();

        let Some(PollError::Exhausted { attempts, task }) = err.downcast_ref::<PollError>() else {
            panic!("expected exhaustion, got {:#}", err);
        };
        assert_eq!(*attempts, 3);
        assert_eq!(task.status, TaskStatus::Queued);
        assert!(err.to_string().contains("slow-task"));
        assert_eq!(gateway.transport().call_count(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_costs_an_attempt() {
        let gateway = Gateway::new(
            MockTransport::new()
                .then_error(TransportError::Connect("connection reset".into()))
                .then_json(200, json!({"status": "SUCCESS", "url": "https://x/y.mp3"})),
        );
        gateway.track("abc123", &profile()).unwrap();

        let task = wait_for_completion(&gateway, "abc123", &fast(2), |_, _| {})
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_provider_error_stops_polling() {
        let gateway = Gateway::new(
            MockTransport::new()
                .then_json(500, json!({"msg": "internal"}))
                .then_json(200, json!({"status": "SUCCESS", "url": "https://x/y.mp3"})),
        );
        gateway.track("abc123", &profile()).unwrap();

        let err = wait_for_completion(&gateway, "abc123", &fast(5), |_, _| {})
            .await
            .unwrap_err();
        let gateway_err = err.downcast_ref::<GatewayError>().unwrap();
        assert_eq!(gateway_err.kind(), ErrorKind::ProviderError);
        assert_eq!(gateway.transport().call_count(), 1);
    }

    #[test]
    fn test_policy_needs_one_attempt() {
        let policy = PollPolicy::new(0, 5);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert_eq!(PollPolicy::default().max_attempts, 60);
    }
}
