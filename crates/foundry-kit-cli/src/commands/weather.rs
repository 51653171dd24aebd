//! Weather lookup CLI commands.

use anyhow::anyhow;
use clap::Args;
use foundry_kit::agents::{FoundryAgentsClient, WeatherAgent};
use foundry_kit::config::AgentConfig;
use foundry_kit::run::{RunError, RunOutcome, RunStatus};
use foundry_kit::{FoundryError, WeatherReport};
use serde_json::json;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct WeatherArgs {
    /// Name of the city to get weather information for
    pub city: String,

    /// Run timeout in seconds (default from REQUEST_TIMEOUT or 60)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum attempts per remote call (default from MAX_RETRIES or 3)
    #[arg(long)]
    pub retries: Option<u32>,

    /// Output the report as JSON
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Space-separated list of city names
    #[arg(required = true)]
    pub cities: Vec<String>,

    /// Run timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Maximum attempts per remote call
    #[arg(long)]
    pub retries: Option<u32>,
}

/// Loads the agent configuration, applying command-line overrides.
pub(crate) fn agent_config(timeout: Option<u64>, retries: Option<u32>) -> anyhow::Result<AgentConfig> {
    let mut config = AgentConfig::from_env().map_err(explain_config_error)?;
    if let Some(secs) = timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    if let Some(retries) = retries {
        config = config.with_max_retries(retries);
    }
    tracing::debug!(
        timeout_secs = config.timeout.as_secs(),
        retries = config.max_retries,
        "Agent configuration"
    );
    Ok(config)
}

pub(crate) fn build_agent(config: AgentConfig) -> anyhow::Result<WeatherAgent<FoundryAgentsClient>> {
    let client = FoundryAgentsClient::new(&config)?;
    tracing::info!(assistant_id = %config.assistant_id, "Using Azure AI Foundry assistant");
    Ok(WeatherAgent::new(client, config))
}

fn explain_config_error(err: FoundryError) -> anyhow::Error {
    match err {
        FoundryError::ConfigurationMissing(var) => anyhow!(
            "{var} is not configured!\n\
             Please set {var} in your environment or .env file\n\n\
             Example:\n\
             {var}=https://<resource>.services.ai.azure.com/api/projects/<project>"
        ),
        other => other.into(),
    }
}

pub(crate) fn format_weather_report(report: &WeatherReport, requested: &str, assistant_id: &str) -> String {
    let rule = "=".repeat(25 + report.city.chars().count());
    format!(
        "\n🌤️  Weather Information for {city}\n\
         {rule}\n\
         🌡️  Temperature: {temperature}\n\
         ☁️  Condition:   {condition}\n\
         💧 Humidity:    {humidity}\n\n\
         Requested city: {requested}\n\
         Resolved city:  {city}\n\n\
         🤖 Source: Azure AI Foundry Agent ({assistant_id})",
        city = report.city,
        temperature = report.temperature,
        condition = report.condition,
        humidity = report.humidity,
    )
}

pub(crate) fn raw_report(report: &WeatherReport, assistant_id: &str) -> serde_json::Value {
    json!({
        "city": report.city,
        "temperature": report.temperature,
        "condition": report.condition,
        "humidity": report.humidity,
        "source": "azure_ai_foundry",
        "assistant_id": assistant_id,
    })
}

pub(crate) fn describe_unsuccessful(status: RunStatus, last_error: Option<&RunError>) -> String {
    match last_error {
        Some(err) => format!("Assistant run failed with status: {status} - {err}"),
        None => format!("Assistant run failed with status: {status}"),
    }
}

/// Run the `weather` command.
pub async fn run_weather_command(args: WeatherArgs) -> anyhow::Result<ExitCode> {
    let config = agent_config(args.timeout, args.retries)?;
    let assistant_id = config.assistant_id.clone();
    let agent = build_agent(config)?;

    if !args.raw {
        println!("🤖 Getting weather for {} using Azure AI Foundry...", args.city);
    }

    match agent.get_weather(&args.city).await {
        Ok(RunOutcome::Completed(report)) => {
            if args.raw {
                println!("{}", serde_json::to_string_pretty(&raw_report(&report, &assistant_id))?);
            } else {
                println!("{}", format_weather_report(&report, &args.city, &assistant_id));
            }
            Ok(ExitCode::SUCCESS)
        }
        Ok(RunOutcome::Unsuccessful { status, last_error }) => {
            eprintln!(
                "❌ AI Foundry Agent Error: {} (Code: {status})",
                describe_unsuccessful(status, last_error.as_ref())
            );
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            eprintln!("❌ AI Foundry Agent Error: {e} (Code: {})", e.error_code());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run the `batch` command. Cities are processed sequentially.
pub async fn run_batch_command(args: BatchArgs, verbose: bool) -> anyhow::Result<ExitCode> {
    let agent = build_agent(agent_config(args.timeout, args.retries)?)?;

    let mut successes = 0usize;
    let mut errors = Vec::new();

    for city in &args.cities {
        println!("🔄 Fetching weather for {city}...");
        match agent.get_weather(city).await {
            Ok(RunOutcome::Completed(report)) => {
                successes += 1;
                println!("✅ {city}: {}, {}", report.temperature, report.condition);
            }
            Ok(RunOutcome::Unsuccessful { status, last_error }) => {
                let message = format!("{city}: {}", describe_unsuccessful(status, last_error.as_ref()));
                eprintln!("❌ {message}");
                errors.push(message);
            }
            Err(e) => {
                let message = format!("{city}: {e}");
                eprintln!("❌ {message}");
                errors.push(message);
            }
        }
    }

    println!("\n📊 Summary: {successes} successful, {} failed", errors.len());
    if verbose && !errors.is_empty() {
        println!("\n❌ Errors:");
        for error in &errors {
            println!("   {error}");
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn milan() -> WeatherReport {
        WeatherReport {
            city: "Milan".to_string(),
            temperature: "20°C".to_string(),
            condition: "Sunny".to_string(),
            humidity: "60%".to_string(),
        }
    }

    #[test]
    fn test_format_weather_report() {
        let text = format_weather_report(&milan(), "milan", "asst_1");
        assert!(text.contains("🌤️  Weather Information for Milan\n"));
        assert!(text.contains(&format!("\n{}\n", "=".repeat(30))));
        assert!(text.contains("🌡️  Temperature: 20°C"));
        assert!(text.contains("Requested city: milan"));
        assert!(text.ends_with("🤖 Source: Azure AI Foundry Agent (asst_1)"));
    }

    #[test]
    fn test_raw_report_adds_source_fields() {
        let value = raw_report(&milan(), "asst_1");
        assert_eq!(value["source"], "azure_ai_foundry");
        assert_eq!(value["assistant_id"], "asst_1");
        assert_eq!(value["humidity"], "60%");
    }

    #[test]
    fn test_describe_unsuccessful() {
        let err = RunError {
            code: Some("server_error".to_string()),
            message: "boom".to_string(),
        };
        assert_eq!(
            describe_unsuccessful(RunStatus::Failed, Some(&err)),
            "Assistant run failed with status: failed - server_error: boom"
        );
        assert_eq!(
            describe_unsuccessful(RunStatus::Expired, None),
            "Assistant run failed with status: expired"
        );
    }

    #[test]
    fn test_missing_endpoint_message_names_variable() {
        let err = explain_config_error(FoundryError::ConfigurationMissing(
            "AZURE_AI_PROJECT_ENDPOINT".to_string(),
        ));
        assert!(err.to_string().contains("Please set AZURE_AI_PROJECT_ENDPOINT"));
    }
}
