//! Interactive chat with the project deployment.

use foundry_kit::chat::{AzureOpenAiChat, ChatSession, project_system_prompt};
use foundry_kit::config::ChatConfig;
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

fn is_exit_command(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "exit" | "quit" | "bye")
}

/// Run the `chat` command until the user types an exit word or closes stdin.
pub async fn run_chat_command() -> anyhow::Result<ExitCode> {
    let config = ChatConfig::from_env()?;
    let backend = AzureOpenAiChat::new(&config)?;
    let policy = config.retry_policy();
    let mut session = ChatSession::with_system_prompt(project_system_prompt(
        &config.project_name,
        &config.deployment_name,
    ));

    tracing::info!(project = %config.project_name, deployment = %config.deployment_name, "🤖 Chat application ready");
    println!("\n🤖 Azure AI Foundry Chat - Project: {}", config.project_name);
    println!("🎯 Using deployment: {}", config.deployment_name);
    println!("Type 'exit' to quit\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!("\n👋 Goodbye!");
            break;
        };

        let input = line.trim();
        if is_exit_command(input) {
            println!("👋 Goodbye!");
            break;
        }
        if input.is_empty() {
            continue;
        }

        print!("🤔 Thinking...");
        std::io::stdout().flush()?;
        let result = session.send(&backend, &policy, input).await;
        print!("\r{}\r", " ".repeat(15));

        match result {
            Ok(reply) => println!("Assistant: {reply}\n"),
            Err(e) => {
                tracing::error!(error = %e, "❌ Chat turn failed");
                println!("⚠️ An error occurred: {e}. Please try again.\n");
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        for word in ["exit", "QUIT", "Bye"] {
            assert!(is_exit_command(word), "{word}");
        }
        assert!(!is_exit_command("goodbye"));
        assert!(!is_exit_command(""));
    }
}
