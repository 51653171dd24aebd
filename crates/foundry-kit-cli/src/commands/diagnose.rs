//! Agent diagnostics and connection test commands.

use super::weather::{agent_config, build_agent};
use foundry_kit::Diagnostics;
use foundry_kit::run::RunOutcome;
use std::process::ExitCode;

const TEST_CITY: &str = "Milan";

fn render(diagnostics: &Diagnostics, verbose: bool) -> String {
    let mut out = String::from("\n📋 Diagnostic Results:\n");
    out.push_str(&format!("   Agent ID:      {}\n", diagnostics.agent_id));
    out.push_str(&format!("   Endpoint:      {}\n", diagnostics.endpoint));
    out.push_str(&format!(
        "   Agent Exists:  {}\n",
        if diagnostics.agent_exists { "✅ Yes" } else { "❌ No" }
    ));
    if let Some(error) = &diagnostics.error {
        out.push_str(&format!("   ❌ Error:      {error}\n"));
    }

    if let Some(details) = &diagnostics.agent_details {
        let unknown = || "Unknown".to_string();
        out.push_str("\n🤖 Agent Details:\n");
        out.push_str(&format!("   Name:         {}\n", details.name.clone().unwrap_or_else(unknown)));
        out.push_str(&format!(
            "   Description:  {}\n",
            details.description.clone().unwrap_or_else(unknown)
        ));
        out.push_str(&format!("   Model:        {}\n", details.model.clone().unwrap_or_else(unknown)));
        out.push_str(&format!("   Tools:        {} tools configured\n", details.tools.len()));

        if verbose && !details.tools.is_empty() {
            out.push_str("\n🔧 Tools:\n");
            for (i, tool) in details.tools.iter().enumerate() {
                out.push_str(&format!("     {}. {tool}\n", i + 1));
            }
        }
    }

    out
}

/// Run the `diagnose` command.
pub async fn run_diagnose_command(verbose: bool) -> anyhow::Result<ExitCode> {
    let agent = build_agent(agent_config(None, None)?)?;

    println!("🔍 Diagnosing Azure AI Foundry Agent...");
    let diagnostics = agent.diagnose().await;
    print!("{}", render(&diagnostics, verbose));

    Ok(if diagnostics.agent_exists {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Run the `test` command: one short, single-attempt weather request.
pub async fn run_test_command() -> anyhow::Result<ExitCode> {
    println!("🧪 Testing Azure AI Foundry Connection...");

    let config = agent_config(Some(30), Some(1))?;
    println!("✅ Configuration loaded");
    println!("   Assistant ID: {}", config.assistant_id);

    let agent = build_agent(config)?;
    println!("✅ AI Foundry client created successfully");

    println!("🔄 Testing weather request for {TEST_CITY}...");
    match agent.get_weather(TEST_CITY).await? {
        RunOutcome::Completed(report) => {
            println!("✅ Test successful!");
            println!("   City: {}", report.city);
            println!("   Temperature: {}", report.temperature);
            println!("   Condition: {}", report.condition);
            println!("   Humidity: {}", report.humidity);
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Unsuccessful { status, .. } => {
            eprintln!("❌ Test failed: run ended with status {status}");
            Ok(ExitCode::FAILURE)
        }
    }
}
