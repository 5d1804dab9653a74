use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::foundation::error::{ReelError, ReelResult, ServiceStatus, Stage};
use crate::generate::provider::{PollError, TaskHandle, TaskStatus, VideoGenerator};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub interval_sec: f64,
    pub timeout_sec: f64,
    /// Failed status requests tolerated before giving up.
    pub max_errors: u32,
    pub error_backoff_sec: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_sec: 5.0,
            timeout_sec: 300.0,
            max_errors: 10,
            error_backoff_sec: 10.0,
        }
    }
}

fn secs(v: f64) -> Duration {
    Duration::from_secs_f64(v.max(0.0))
}

/// Time source for [`await_task`]; tests use a virtual one.
pub trait PollClock {
    fn elapsed(&self) -> Duration;
    fn sleep(&mut self, d: Duration);
}

pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl PollClock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep(&mut self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// Poll `task` until it finishes and return its output URLs.
#[tracing::instrument(skip(generator, policy, clock), fields(task = %task.id))]
pub fn await_task(
    generator: &dyn VideoGenerator,
    task: &TaskHandle,
    policy: &PollPolicy,
    clock: &mut dyn PollClock,
) -> ReelResult<Vec<String>> {
    let timeout = secs(policy.timeout_sec);
    let mut errors = 0u32;
    loop {
        match generator.status(task) {
            Ok(TaskStatus::Succeeded { outputs }) => {
                if outputs.is_empty() {
                    return Err(ReelError::service(
                        Stage::Generation,
                        ServiceStatus::NoOutput,
                        format!("task {} succeeded without output", task.id),
                    ));
                }
                tracing::info!(outputs = outputs.len(), "generation finished");
                return Ok(outputs);
            }
            Ok(TaskStatus::Failed { reason }) => {
                return Err(ReelError::service(
                    Stage::Generation,
                    ServiceStatus::GenerationFailed,
                    reason,
                ));
            }
            Ok(TaskStatus::Running) => {
                if clock.elapsed() > timeout {
                    return Err(ReelError::service(
                        Stage::Generation,
                        ServiceStatus::Timeout,
                        format!("task {} still running after {}s", task.id, policy.timeout_sec),
                    ));
                }
                clock.sleep(secs(policy.interval_sec));
            }
            Err(e) => {
                errors += 1;
                tracing::warn!(attempt = errors, max = policy.max_errors, error = %e, "status request failed");
                if errors >= policy.max_errors {
                    let status = match e {
                        PollError::Network(_) => ServiceStatus::Network,
                        PollError::Malformed(_) => ServiceStatus::GenerationFailed,
                    };
                    return Err(ReelError::service(Stage::Generation, status, e.to_string()));
                }
                clock.sleep(secs(policy.error_backoff_sec));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/poll.rs"]
mod tests;
