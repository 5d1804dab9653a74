use std::path::Path;
use std::sync::Mutex;

use super::*;
use crate::generate::provider::GenerationRequest;

struct Scripted {
    replies: Mutex<Vec<Result<TaskStatus, PollError>>>,
}

impl Scripted {
    fn new(mut replies: Vec<Result<TaskStatus, PollError>>) -> Self {
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
        }
    }
}

impl VideoGenerator for Scripted {
    fn start(&self, _request: &GenerationRequest) -> ReelResult<TaskHandle> {
        unreachable!()
    }

    fn status(&self, _task: &TaskHandle) -> Result<TaskStatus, PollError> {
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or(Ok(TaskStatus::Running))
    }

    fn download(&self, _url: &str, _dest: &Path) -> ReelResult<()> {
        unreachable!()
    }
}

#[derive(Default)]
struct VirtualClock {
    now: Duration,
    sleeps: Vec<Duration>,
}

impl PollClock for VirtualClock {
    fn elapsed(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, d: Duration) {
        self.now += d;
        self.sleeps.push(d);
    }
}

fn task() -> TaskHandle {
    TaskHandle {
        id: "t-1".to_string(),
    }
}

#[test]
fn returns_outputs_after_running_polls() {
    let g = Scripted::new(vec![
        Ok(TaskStatus::Running),
        Ok(TaskStatus::Running),
        Ok(TaskStatus::Succeeded {
            outputs: vec!["https://cdn/x.mp4".to_string()],
        }),
    ]);
    let mut clock = VirtualClock::default();
    let out = await_task(&g, &task(), &PollPolicy::default(), &mut clock).unwrap();
    assert_eq!(out, ["https://cdn/x.mp4"]);
    assert_eq!(clock.sleeps, [Duration::from_secs(5); 2]);
}

#[test]
fn failure_carries_the_reason() {
    let g = Scripted::new(vec![Ok(TaskStatus::Failed {
        reason: "FAILED: moderation".to_string(),
    })]);
    let err = await_task(&g, &task(), &PollPolicy::default(), &mut VirtualClock::default())
        .unwrap_err();
    match err {
        ReelError::ExternalService {
            stage,
            status,
            message,
        } => {
            assert_eq!(stage, Stage::Generation);
            assert_eq!(status, ServiceStatus::GenerationFailed);
            assert!(message.contains("moderation"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn times_out_after_the_overall_budget() {
    let g = Scripted::new(vec![]);
    let mut clock = VirtualClock::default();
    let err = await_task(&g, &task(), &PollPolicy::default(), &mut clock).unwrap_err();
    assert!(matches!(
        err,
        ReelError::ExternalService {
            status: ServiceStatus::Timeout,
            ..
        }
    ));
    assert!(err.is_transient());
    assert!(clock.now > Duration::from_secs(300));
    assert!(clock.now <= Duration::from_secs(310));
}

#[test]
fn network_errors_back_off_and_recover() {
    let g = Scripted::new(vec![
        Err(PollError::Network("reset".to_string())),
        Err(PollError::Network("reset".to_string())),
        Ok(TaskStatus::Succeeded {
            outputs: vec!["u".to_string()],
        }),
    ]);
    let mut clock = VirtualClock::default();
    await_task(&g, &task(), &PollPolicy::default(), &mut clock).unwrap();
    assert_eq!(clock.sleeps, [Duration::from_secs(10); 2]);
}

#[test]
fn too_many_network_errors_give_up() {
    let g = Scripted::new(vec![Err(PollError::Network("down".to_string())); 10]);
    let mut clock = VirtualClock::default();
    let err = await_task(&g, &task(), &PollPolicy::default(), &mut clock).unwrap_err();
    assert!(matches!(
        err,
        ReelError::ExternalService {
            status: ServiceStatus::Network,
            ..
        }
    ));
    assert_eq!(clock.sleeps.len(), 9);
}

#[test]
fn success_without_output_is_an_error() {
    let g = Scripted::new(vec![Ok(TaskStatus::Succeeded { outputs: vec![] })]);
    let err = await_task(&g, &task(), &PollPolicy::default(), &mut VirtualClock::default())
        .unwrap_err();
    assert!(matches!(
        err,
        ReelError::ExternalService {
            status: ServiceStatus::NoOutput,
            ..
        }
    ));
}
