//! The `config` command: show configuration without requiring it to be valid.

use foundry_kit::config::{
    AgentConfig, ChatConfig, Credential, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, RagConfig,
    vars,
};
use std::process::ExitCode;

const NOT_SET: &str = "❌ NOT SET";

pub fn run_config_command() -> anyhow::Result<ExitCode> {
    // Loads `.env` as a side effect, so the lookups below see it too.
    let agent = AgentConfig::from_env();
    print!("{}", render(&agent, |key| std::env::var(key).ok()));
    Ok(ExitCode::SUCCESS)
}

fn render(
    agent: &Result<AgentConfig, foundry_kit::FoundryError>,
    lookup: impl Fn(&str) -> Option<String>,
) -> String {
    let mut out = String::from("🔧 Azure AI Foundry Configuration:\n");

    let endpoint = match agent {
        Ok(_) => "***configured***".to_string(),
        Err(foundry_kit::FoundryError::ConfigurationMissing(_)) => NOT_SET.to_string(),
        Err(e) => format!("⚠️  {e}"),
    };
    let assistant_id = lookup(vars::ASSISTANT_ID)
        .unwrap_or_else(|| foundry_kit::config::DEFAULT_ASSISTANT_ID.to_string());
    let timeout = lookup(vars::REQUEST_TIMEOUT).unwrap_or_else(|| DEFAULT_TIMEOUT_SECS.to_string());
    let retries = lookup(vars::MAX_RETRIES).unwrap_or_else(|| DEFAULT_MAX_RETRIES.to_string());
    let log_level = lookup(vars::LOG_LEVEL).unwrap_or_else(|| "INFO".to_string());

    out.push_str(&format!("   Project Endpoint:   {endpoint}\n"));
    out.push_str(&format!("   Assistant ID:       {assistant_id}\n"));
    out.push_str(&format!("   Timeout:            {timeout}s\n"));
    out.push_str(&format!("   Max Retries:        {retries}\n"));
    out.push_str(&format!("   Log Level:          {log_level}\n"));

    out.push_str("\n🔐 Authentication:\n");
    let credential = agent.as_ref().ok().and_then(|c| c.credential.as_ref());
    out.push_str(match credential {
        Some(Credential::Bearer(_)) => "   ✅ Bearer token (AZURE_AI_ACCESS_TOKEN)\n",
        Some(Credential::ApiKey(_)) => "   ✅ API key (AZURE_AI_API_KEY)\n",
        None => "   ⚠️  No agent credential configured\n",
    });

    out.push_str("\n💬 Chat:\n");
    match ChatConfig::from_lookup(&lookup) {
        Ok(chat) => {
            out.push_str("   Endpoint:           ***configured***\n");
            out.push_str(&format!("   Deployment:         {}\n", chat.deployment_name));
            out.push_str(&format!("   API Version:        {}\n", chat.api_version));
        }
        Err(_) => out.push_str(&format!("   Endpoint:           {NOT_SET}\n")),
    }

    out.push_str("\n📚 Travel assistant (RAG):\n");
    match RagConfig::from_lookup(&lookup) {
        Ok(rag) => {
            out.push_str(&format!("   Chat Model:         {}\n", rag.chat.deployment_name));
            out.push_str(&format!("   Search Index:       {}\n", rag.search.index_name));
            out.push_str(&format!("   Port:               {}\n", rag.port));
        }
        Err(e) => out.push_str(&format!("   {NOT_SET} ({e})\n")),
    }

    out
}
