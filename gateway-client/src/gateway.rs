//! The provider gateway
//!
//! One call in, one HTTP request out. The gateway never retries and never polls
//! on its own; callers own any loop. The only state it keeps is the set of task
//! ids it has handed out, so unknown ids can be rejected and settled tasks can
//! be answered without another request.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{GatewayError, Result};
use crate::extract;
use crate::payload;
use crate::profile::{ProviderProfile, ResponseShape};
use crate::request::GenerationRequest;
use crate::result::{Generation, PollableTask};
use crate::transport::{HttpTransport, Method, OutboundRequest, RequestBody, TransportError};

struct TrackedTask {
    profile: Arc<ProviderProfile>,
    task: PollableTask,
}

pub struct Gateway<T: HttpTransport> {
    transport: T,
    tasks: Mutex<HashMap<String, TrackedTask>>,
}

impl<T: HttpTransport> Gateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, TrackedTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Dispatch one generation request.
    ///
    /// Invalid requests fail before any network call. Synchronous profiles
    /// return the artifact; asynchronous ones return a queued task to poll.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        profile: &ProviderProfile,
    ) -> Result<Generation> {
        if let Err(e) = payload::validate(profile, request) {
            warn!("Rejected request {} for {}: {}", request.client_id(), profile.name, e);
            return Err(e);
        }

        let outbound = OutboundRequest {
            method: Method::Post,
            url: profile.generate_url(),
            bearer: profile.credential.clone(),
            accept: profile.accept.clone(),
            body: payload::build_body(profile, request),
            timeout: profile.timeout,
        };

        info!(
            "Dispatching {} request {} to {} (timeout {:?})",
            request.kind(),
            request.client_id(),
            profile.name,
            profile.timeout
        );

        let response = self
            .transport
            .send(outbound)
            .await
            .map_err(|e| unreachable(profile, e))?;

        debug!(
            "{} answered request {} with HTTP {} ({} bytes)",
            profile.name,
            request.client_id(),
            response.status,
            response.body.len()
        );

        let generation = extract::interpret_generation(profile, &response)?;

        if let Generation::Pending(task) = &generation {
            info!("{} queued task {}", profile.name, task.task_id);
            self.tasks().insert(
                task.task_id.clone(),
                TrackedTask {
                    profile: Arc::new(profile.clone()),
                    task: task.clone(),
                },
            );
        }

        Ok(generation)
    }

    /// Perform one status check for a task this gateway knows about.
    ///
    /// Settled tasks are returned as they are, without a request. The caller
    /// decides whether and when to check again.
    pub async fn poll_status(&self, task_id: &str) -> Result<PollableTask> {
        let (profile, current) = {
            let tasks = self.tasks();
            let tracked = tasks
                .get(task_id)
                .ok_or_else(|| GatewayError::NotFound(task_id.to_string()))?;
            (Arc::clone(&tracked.profile), tracked.task.clone())
        };

        if current.is_terminal() {
            return Ok(current);
        }

        let ResponseShape::Async { status: spec, .. } = &profile.response else {
            return Err(GatewayError::InvalidRequest(format!(
                "Profile '{}' does not support status checks",
                profile.name
            )));
        };
        let Some(url) = profile.status_url(task_id) else {
            return Err(GatewayError::InvalidRequest(format!(
                "Profile '{}' has no status endpoint",
                profile.name
            )));
        };

        let outbound = OutboundRequest {
            method: Method::Get,
            url,
            bearer: profile.credential.clone(),
            accept: Some("application/json".to_string()),
            body: RequestBody::Empty,
            timeout: spec.timeout,
        };

        debug!("Checking status of {} task {}", profile.name, task_id);
        let response = self
            .transport
            .send(outbound)
            .await
            .map_err(|e| unreachable(&profile, e))?;

        let observation = extract::interpret_status(&profile, spec, task_id, &response)?;

        let mut tasks = self.tasks();
        let Some(tracked) = tasks.get_mut(task_id) else {
            // Forgotten while the request was in flight
            return Err(GatewayError::NotFound(task_id.to_string()));
        };
        let before = tracked.task.status;
        if tracked.task.advance(observation) {
            info!(
                "{} task {}: {} -> {}",
                profile.name,
                task_id,
                before.label(),
                tracked.task.status.label()
            );
        }
        Ok(tracked.task.clone())
    }

    /// Start tracking a task issued outside this gateway instance
    pub fn track(&self, task_id: impl Into<String>, profile: &ProviderProfile) -> Result<PollableTask> {
        if !profile.is_async() {
            return Err(GatewayError::InvalidRequest(format!(
                "Profile '{}' does not produce pollable tasks",
                profile.name
            )));
        }
        let task_id = task_id.into();
        if task_id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("Task id is empty".to_string()));
        }

        let mut tasks = self.tasks();
        let tracked = tasks.entry(task_id.clone()).or_insert_with(|| TrackedTask {
            profile: Arc::new(profile.clone()),
            task: PollableTask::queued(task_id),
        });
        Ok(tracked.task.clone())
    }

    /// Stop tracking a task; returns its last known state
    pub fn forget(&self, task_id: &str) -> Option<PollableTask> {
        self.tasks().remove(task_id).map(|tracked| tracked.task)
    }
}

fn unreachable(profile: &ProviderProfile, error: TransportError) -> GatewayError {
    warn!("{} unreachable: {}", profile.name, error);
    GatewayError::Unreachable(format!("{}: {}", profile.name, error))
}
