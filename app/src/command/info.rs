use botline_config::Config;

/// Strategy for displaying configuration information.
///
/// Outputs the relay endpoint, the secret (masked), and the console
/// settings the relay loop will run with.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== botline Configuration ===\n");

        println!("Relay:");
        println!("  Endpoint: {}", config.relay.endpoint);
        println!("  Secret: {}", mask_secret(&config.relay.secret));
        if config.relay.bot_id.is_empty() {
            println!("  Bot ID: (not set)");
        } else {
            println!("  Bot ID: {}", config.relay.bot_id);
        }
        println!();

        println!("Console:");
        println!("  From User: {}", config.console.from_user);
        println!("  Exit Phrase: {}", config.console.exit_phrase);
        println!("  Transport: {}", config.console.transport);
        println!("  Debug Render: {}", config.console.debug_render);
        println!("  Only From Bot: {}", config.console.only_from_bot);

        Ok(())
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else if secret.len() > 8 {
        format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
    } else {
        "***".to_string()
    }
}
