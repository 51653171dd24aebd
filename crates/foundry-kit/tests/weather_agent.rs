//! End-to-end behavior of `WeatherAgent` against a scripted agent service.

use async_trait::async_trait;
use foundry_kit::agents::{AgentInfo, AgentService, MessageRole, Thread, ThreadMessage};
use foundry_kit::config::AgentConfig;
use foundry_kit::run::{RunError, RunOutcome, RunSnapshot, RunStatus};
use foundry_kit::{FoundryError, WeatherAgent, WeatherReport};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

const MILAN_JSON: &str =
    r#"{"city":"Milan","temperature":"20°C","condition":"Sunny","humidity":"60%"}"#;

/// Agent service double that replays a status script and records calls.
#[derive(Default)]
struct ScriptedService {
    statuses: Mutex<VecDeque<RunStatus>>,
    last_error: Option<RunError>,
    reply: Option<String>,
    create_run_failures: Mutex<u32>,
    get_run_fails: bool,
    get_run_delay: Duration,
    delete_fails: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn new(statuses: &[RunStatus], reply: Option<&str>) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            reply: reply.map(str::to_string),
            ..Default::default()
        }
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Next scripted status; the last one repeats forever.
    fn next_status(&self) -> RunStatus {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().copied().unwrap_or(RunStatus::Running)
        }
    }
}

#[async_trait]
impl AgentService for ScriptedService {
    async fn create_thread(&self) -> Result<Thread, FoundryError> {
        self.record("create_thread");
        Ok(Thread {
            id: "thread_1".to_string(),
        })
    }

    async fn add_message(
        &self,
        thread_id: &str,
        content: &str,
    ) -> Result<ThreadMessage, FoundryError> {
        self.record(format!("add_message:{thread_id}:{content}"));
        Ok(ThreadMessage::new("msg_user", MessageRole::User, content))
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, FoundryError> {
        self.record(format!("create_run:{thread_id}:{assistant_id}"));
        let mut failures = self.create_run_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(FoundryError::from_status(503, "Service Unavailable"));
        }
        Ok(RunSnapshot {
            id: "run_1".to_string(),
            status: RunStatus::Pending,
            last_error: None,
        })
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<RunSnapshot, FoundryError> {
        self.record(format!("get_run:{thread_id}:{run_id}"));
        tokio::time::sleep(self.get_run_delay).await;
        if self.get_run_fails {
            return Err(FoundryError::from_status(404, "run not found"));
        }
        let status = self.next_status();
        Ok(RunSnapshot {
            id: run_id.to_string(),
            status,
            last_error: if status == RunStatus::Failed {
                self.last_error.clone()
            } else {
                None
            },
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, FoundryError> {
        self.record(format!("list_messages:{thread_id}"));
        let mut messages = Vec::new();
        if let Some(reply) = &self.reply {
            messages.push(ThreadMessage::new("msg_2", MessageRole::Assistant, reply.clone()));
        }
        messages.push(ThreadMessage::new(
            "msg_1",
            MessageRole::User,
            "Get weather information for Milan",
        ));
        Ok(messages)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), FoundryError> {
        self.record(format!("delete_thread:{thread_id}"));
        if self.delete_fails {
            return Err(FoundryError::from_status(500, "delete failed"));
        }
        Ok(())
    }

    async fn get_agent(&self, assistant_id: &str) -> Result<AgentInfo, FoundryError> {
        self.record(format!("get_agent:{assistant_id}"));
        Ok(AgentInfo {
            id: assistant_id.to_string(),
            name: Some("weather-agent".to_string()),
            model: Some("gpt-4o".to_string()),
            ..Default::default()
        })
    }
}

fn config() -> AgentConfig {
    AgentConfig::new("https://demo.services.ai.azure.com/api/projects/demo")
        .with_assistant_id("asst_test")
        .with_timeout(Duration::from_secs(5))
}

fn agent(service: ScriptedService) -> (Arc<ScriptedService>, WeatherAgent<Arc<ScriptedService>>) {
    let service = Arc::new(service);
    (service.clone(), WeatherAgent::new(service, config()))
}

#[tokio::test(start_paused = true)]
async fn test_completed_run_after_three_polls() {
    let (service, agent) = agent(ScriptedService::new(
        &[RunStatus::Pending, RunStatus::Running, RunStatus::Completed],
        Some(MILAN_JSON),
    ));

    let outcome = agent.get_weather("Milan").await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Completed(WeatherReport {
            city: "Milan".to_string(),
            temperature: "20°C".to_string(),
            condition: "Sunny".to_string(),
            humidity: "60%".to_string(),
        })
    );
    assert_eq!(service.count("get_run"), 3);
    assert_eq!(
        service.calls(),
        vec![
            "create_thread",
            "add_message:thread_1:Get weather information for Milan",
            "create_run:thread_1:asst_test",
            "get_run:thread_1:run_1",
            "get_run:thread_1:run_1",
            "get_run:thread_1:run_1",
            "list_messages:thread_1",
            "delete_thread:thread_1",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_city_is_trimmed_before_use() {
    let (service, agent) = agent(ScriptedService::new(
        &[RunStatus::Completed],
        Some("Temperature: 18°C"),
    ));

    let report = agent.get_weather("  Turin  ").await.unwrap().completed().unwrap();

    assert_eq!(report.city, "Turin");
    assert_eq!(report.temperature, "18°C");
    assert_eq!(report.condition, "Unknown");
    assert!(service.calls()[1].ends_with("for Turin"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_still_deletes_thread() {
    let (service, agent) = agent(ScriptedService::new(&[RunStatus::Running], Some(MILAN_JSON)));
    let start = Instant::now();

    let err = agent.get_weather("Milan").await.unwrap_err();

    assert!(matches!(err, FoundryError::Timeout { .. }));
    assert_eq!(err.error_code(), "timeout");
    assert!(start.elapsed() <= Duration::from_secs(5) + Duration::from_secs(1));
    assert_eq!(service.count("list_messages"), 0);
    assert_eq!(service.calls().last().unwrap(), "delete_thread:thread_1");
}

#[tokio::test(start_paused = true)]
async fn test_slow_status_checks_stay_within_timeout_bound() {
    let mut script = ScriptedService::new(&[RunStatus::Running], Some(MILAN_JSON));
    script.get_run_delay = Duration::from_millis(500);
    let (service, agent) = agent(script);
    let start = Instant::now();

    let err = agent.get_weather("Milan").await.unwrap_err();

    assert!(matches!(err, FoundryError::Timeout { .. }));
    assert!(start.elapsed() <= Duration::from_secs(5) + Duration::from_secs(1));
    assert_eq!(service.count("delete_thread"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_status_check_failure_reports_get_run() {
    let mut script = ScriptedService::new(&[RunStatus::Running], Some(MILAN_JSON));
    script.get_run_fails = true;
    let (service, agent) = agent(script);

    let err = agent.get_weather("Milan").await.unwrap_err();

    match &err {
        FoundryError::Operation {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(operation, "get_run");
            assert_eq!(*attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status_code(), Some(404));
    assert_eq!(service.count("get_run"), 1);
    assert_eq!(service.count("delete_thread"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_run_is_an_outcome_not_an_error() {
    let mut script = ScriptedService::new(&[RunStatus::Running, RunStatus::Failed], None);
    script.last_error = Some(RunError {
        code: Some("server_error".to_string()),
        message: "Tool call failed".to_string(),
    });
    let (service, agent) = agent(script);

    let outcome = agent.get_weather("Milan").await.unwrap();

    match outcome {
        RunOutcome::Unsuccessful { status, last_error } => {
            assert_eq!(status, RunStatus::Failed);
            assert_eq!(last_error.unwrap().message, "Tool call failed");
        }
        other => panic!("expected unsuccessful outcome, got {other:?}"),
    }
    assert_eq!(service.count("list_messages"), 0);
    assert_eq!(service.count("delete_thread"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_create_run_failures_are_retried() {
    let script = ScriptedService::new(&[RunStatus::Completed], Some(MILAN_JSON));
    *script.create_run_failures.lock().unwrap() = 2;
    let (service, agent) = agent(script);
    let start = Instant::now();

    let outcome = agent.get_weather("Milan").await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(service.count("create_run"), 3);
    // Two backoff sleeps: 1s and 2s, each with up to 30% jitter.
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(start.elapsed() <= Duration::from_millis(3900));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_report_operation_and_attempts() {
    let script = ScriptedService::new(&[RunStatus::Completed], Some(MILAN_JSON));
    *script.create_run_failures.lock().unwrap() = 10;
    let (service, agent) = agent(script);

    let err = agent.get_weather("Milan").await.unwrap_err();

    match &err {
        FoundryError::Operation {
            operation,
            attempts,
            ..
        } => {
            assert_eq!(operation, "create_run");
            assert_eq!(*attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(service.count("delete_thread"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_assistant_reply_is_no_response() {
    let (service, agent) = agent(ScriptedService::new(&[RunStatus::Completed], None));

    let err = agent.get_weather("Milan").await.unwrap_err();

    assert!(matches!(err, FoundryError::NoResponse(_)));
    assert_eq!(service.count("delete_thread"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_failure_does_not_mask_result() {
    let mut script = ScriptedService::new(&[RunStatus::Completed], Some(MILAN_JSON));
    script.delete_fails = true;
    let (service, agent) = agent(script);

    let outcome = agent.get_weather("Milan").await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(service.count("delete_thread"), 1);
}

#[tokio::test]
async fn test_diagnose_reports_agent_details() {
    let (_, agent) = agent(ScriptedService::default());

    let diagnostics = agent.diagnose().await;

    assert!(diagnostics.agent_exists);
    assert!(diagnostics.error.is_none());
    let details = diagnostics.agent_details.unwrap();
    assert_eq!(details.id, "asst_test");
    assert_eq!(details.name.as_deref(), Some("weather-agent"));
}
