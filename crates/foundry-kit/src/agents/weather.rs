//! Weather lookups through a hosted assistant.

use super::{AgentInfo, AgentService, latest_assistant_text};
use crate::config::AgentConfig;
use crate::error::FoundryError;
use crate::extract::{WeatherReport, extract_structured_with_source};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::run::{RunHandle, RunOutcome, RunPoller, RunStatus};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

/// Result of [`WeatherAgent::diagnose`].
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub agent_id: String,
    pub endpoint: String,
    pub agent_exists: bool,
    pub agent_details: Option<AgentInfo>,
    pub error: Option<String>,
}

/// Asks a hosted assistant for the current weather in a city.
///
/// Every call runs on a fresh thread that is deleted afterwards, whatever
/// the outcome.
///
/// # Examples
///
/// ```rust,no_run
/// use foundry_kit::agents::{FoundryAgentsClient, WeatherAgent};
/// use foundry_kit::config::AgentConfig;
/// use foundry_kit::run::RunOutcome;
///
/// # async fn example() -> Result<(), foundry_kit::FoundryError> {
/// let config = AgentConfig::from_env()?;
/// let agent = WeatherAgent::new(FoundryAgentsClient::new(&config)?, config);
///
/// match agent.get_weather("Milan").await? {
///     RunOutcome::Completed(report) => println!("{}", report.temperature),
///     RunOutcome::Unsuccessful { status, .. } => eprintln!("run ended {status}"),
/// }
/// # Ok(())
/// # }
/// ```
pub struct WeatherAgent<S> {
    service: S,
    config: AgentConfig,
    policy: RetryPolicy,
    poller: RunPoller,
    span: Span,
}

impl<S: AgentService> WeatherAgent<S> {
    pub fn new(service: S, config: AgentConfig) -> Self {
        let span = info_span!("weather_agent", assistant_id = %config.assistant_id);
        Self {
            service,
            policy: config.retry_policy(),
            poller: config.poller(),
            config,
            span,
        }
    }

    /// Records this agent's events under `span` instead of the default
    /// `weather_agent` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_poller(mut self, poller: RunPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Gets the current weather for `city`.
    ///
    /// Returns [`RunOutcome::Unsuccessful`] when the run ends in any state
    /// other than `completed`. Errors are reserved for invalid input,
    /// exhausted retries, the polling timeout and an empty reply.
    pub async fn get_weather(&self, city: &str) -> Result<RunOutcome<WeatherReport>, FoundryError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(FoundryError::InvalidInput(
                "City name cannot be empty".to_string(),
            ));
        }

        self.request_weather(city)
            .instrument(self.span.clone())
            .await
    }

    async fn request_weather(&self, city: &str) -> Result<RunOutcome<WeatherReport>, FoundryError> {
        let start = Instant::now();
        info!(city, "🌤️ Requesting weather");

        let service = &self.service;
        let thread = retry_with_backoff(&self.policy, "create_thread", move || {
            service.create_thread()
        })
        .await?;
        debug!(thread_id = %thread.id, "Created thread");

        let result = self.run_on_thread(&thread.id, city).await;
        self.cleanup(&thread.id).await;

        match &result {
            Ok(RunOutcome::Completed(_)) => info!(
                city,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "✅ Weather retrieved"
            ),
            Ok(RunOutcome::Unsuccessful { status, .. }) => {
                warn!(city, %status, "Weather run did not complete")
            }
            Err(e) => error!(city, error = %e, code = %e.error_code(), "❌ Weather request failed"),
        }
        result
    }

    async fn run_on_thread(
        &self,
        thread_id: &str,
        city: &str,
    ) -> Result<RunOutcome<WeatherReport>, FoundryError> {
        let service = &self.service;
        let content = format!("Get weather information for {city}");
        let content = content.as_str();

        let message = retry_with_backoff(&self.policy, "add_message", move || {
            service.add_message(thread_id, content)
        })
        .await?;
        debug!(message_id = %message.id, "Added message to thread");

        let assistant_id = self.config.assistant_id.as_str();
        let run = retry_with_backoff(&self.policy, "create_run", move || {
            service.create_run(thread_id, assistant_id)
        })
        .await?;
        debug!(run_id = %run.id, status = %run.status, "Started run");

        let mut handle = RunHandle::new(thread_id, &run);
        let run_id = run.id.as_str();
        let snapshot = self
            .poller
            .wait(&mut handle, move || async move {
                service
                    .get_run(thread_id, run_id)
                    .await
                    .map_err(|e| e.in_operation("get_run", 1))
            })
            .await?;

        if snapshot.status != RunStatus::Completed {
            error!(
                run_id,
                status = %snapshot.status,
                last_error = ?snapshot.last_error,
                "Run ended without completing"
            );
            return Ok(RunOutcome::Unsuccessful {
                status: snapshot.status,
                last_error: snapshot.last_error,
            });
        }

        let messages = retry_with_backoff(&self.policy, "list_messages", move || {
            service.list_messages(thread_id)
        })
        .await?;
        let text = latest_assistant_text(&messages)
            .ok_or_else(|| FoundryError::NoResponse("No response from assistant".to_string()))?;
        debug!(response = text, "Assistant response");

        let (report, source) = extract_structured_with_source::<WeatherReport>(text, city);
        debug!(?source, "Parsed weather report");
        Ok(RunOutcome::Completed(report))
    }

    async fn cleanup(&self, thread_id: &str) {
        match self.service.delete_thread(thread_id).await {
            Ok(()) => debug!(thread_id, "🧹 Cleaned up thread"),
            Err(e) => warn!(thread_id, error = %e, "Failed to clean up thread"),
        }
    }

    /// Checks that the configured assistant exists and is reachable.
    ///
    /// Never fails: problems are reported in [`Diagnostics::error`].
    pub async fn diagnose(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics {
            agent_id: self.config.assistant_id.clone(),
            endpoint: self.config.endpoint.clone(),
            agent_exists: false,
            agent_details: None,
            error: None,
        };

        let lookup = self
            .service
            .get_agent(&self.config.assistant_id)
            .instrument(self.span.clone())
            .await;

        match lookup {
            Ok(info) => {
                info!(parent: &self.span, agent_id = %info.id, "Agent exists and is accessible");
                diagnostics.agent_exists = true;
                diagnostics.agent_details = Some(info);
            }
            Err(e) => {
                error!(parent: &self.span, error = %e, "Agent diagnostic failed");
                diagnostics.error = Some(format!("Cannot access agent: {e}"));
            }
        }

        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Thread, ThreadMessage};
    use crate::run::RunSnapshot;
    use async_trait::async_trait;

    /// Fails every call with a fixed status.
    struct Unreachable(u16);

    #[async_trait]
    impl AgentService for Unreachable {
        async fn create_thread(&self) -> Result<Thread, FoundryError> {
            Err(FoundryError::from_status(self.0, "down"))
        }
        async fn add_message(&self, _: &str, _: &str) -> Result<ThreadMessage, FoundryError> {
            Err(FoundryError::from_status(self.0, "down"))
        }
        async fn create_run(&self, _: &str, _: &str) -> Result<RunSnapshot, FoundryError> {
            Err(FoundryError::from_status(self.0, "down"))
        }
        async fn get_run(&self, _: &str, _: &str) -> Result<RunSnapshot, FoundryError> {
            Err(FoundryError::from_status(self.0, "down"))
        }
        async fn list_messages(&self, _: &str) -> Result<Vec<ThreadMessage>, FoundryError> {
            Err(FoundryError::from_status(self.0, "down"))
        }
        async fn delete_thread(&self, _: &str) -> Result<(), FoundryError> {
            Err(FoundryError::from_status(self.0, "down"))
        }
        async fn get_agent(&self, _: &str) -> Result<AgentInfo, FoundryError> {
            Err(FoundryError::from_status(self.0, "agent not found"))
        }
    }

    fn agent(status: u16) -> WeatherAgent<Unreachable> {
        WeatherAgent::new(Unreachable(status), AgentConfig::new("https://x.example"))
    }

    #[tokio::test]
    async fn test_blank_city_is_rejected_before_any_call() {
        let err = agent(500).get_weather("   ").await.unwrap_err();
        assert!(matches!(err, FoundryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_fatal_thread_creation_is_not_retried() {
        let err = agent(401).get_weather("Milan").await.unwrap_err();
        match err {
            FoundryError::Operation {
                operation, attempts, ..
            } => {
                assert_eq!(operation, "create_thread");
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_diagnose_reports_error_without_failing() {
        let diagnostics = agent(404).diagnose().await;
        assert_eq!(diagnostics.agent_id, crate::config::DEFAULT_ASSISTANT_ID);
        assert!(!diagnostics.agent_exists);
        assert!(diagnostics.agent_details.is_none());
        assert!(
            diagnostics
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with("Cannot access agent"))
        );
    }
}
