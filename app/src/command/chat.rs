//! Interactive chat command: bootstrap a session, then run the relay loop.
//!
//! Without flags this shows the start/continue menu; with `--conversation`
//! it resumes directly.

use botline_client::RelayClient;
use botline_config::Config;
use botline_core::Session;
use botline_relay::{
    CallbackTransport, LoopConfig, RelayLoop, RenderMode, Renderer, SessionBootstrapper,
    SocketTransport, TransportKind,
};
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Conversation to resume (interactive menu when absent)
    pub conversation: Option<String>,
    /// Watermark to replay history from when resuming
    pub watermark: Option<String>,
}

/// Strategy for executing the Chat command.
///
/// This strategy owns the whole console session:
/// - Starts a new conversation or resumes an existing one
/// - Opens the configured streaming transport
/// - Relays operator input until the exit phrase is typed
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        if config.relay.secret.is_empty() {
            anyhow::bail!(
                "Relay secret not configured. Set \"relay.secret\" in config or export BOTLINE_SECRET"
            );
        }

        let client = RelayClient::new(config.relay.secret.clone())
            .with_base_url(config.relay.endpoint.clone());
        let bootstrapper = SessionBootstrapper::new(client.clone());

        let session = match input.conversation {
            Some(id) => {
                bootstrapper
                    .resume(&id, input.watermark.as_deref())
                    .await?
            }
            None => bootstrap_from_menu(&bootstrapper).await?,
        };

        run_relay_loop(&client, &config, session).await
    }
}

/// The start/continue menu read from standard input.
async fn bootstrap_from_menu(
    bootstrapper: &SessionBootstrapper<RelayClient>,
) -> anyhow::Result<Session> {
    println!("botline console using WebSockets");
    println!("================================");
    println!();
    println!("Please select from the following:");
    println!("[1] Start a new conversation");
    println!("[2] Continue a conversation");
    println!();

    let choice = prompt_line("Choice: ")?;

    match choice.as_str() {
        "1" => Ok(bootstrapper.start_new().await?),
        "2" => {
            println!();
            println!("Please provide the conversation ID and watermark:");
            let conversation_id = prompt_line("Conversation ID: ")?;
            if conversation_id.is_empty() {
                anyhow::bail!("Conversation ID must not be empty");
            }

            let watermark = prompt_line("Watermark: ")?;
            let watermark = (!watermark.is_empty()).then_some(watermark);

            Ok(bootstrapper
                .resume(&conversation_id, watermark.as_deref())
                .await?)
        }
        other => anyhow::bail!("Unrecognized choice: {other}"),
    }
}

fn prompt_line(prompt: &str) -> anyhow::Result<String> {
    print!("{prompt}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn run_relay_loop(
    client: &RelayClient,
    config: &Config,
    session: Session,
) -> anyhow::Result<()> {
    // Everything after bootstrap authenticates with the conversation token,
    // never the long-lived secret.
    let scoped = client.scoped(&session.token);

    let mode = if config.console.debug_render {
        RenderMode::Debug
    } else {
        RenderMode::Messages
    };
    let sender_filter = config
        .console
        .only_from_bot
        .then(|| config.relay.bot_id.clone());
    let renderer = Renderer::new(mode).with_sender_filter(sender_filter);

    let loop_config = LoopConfig::default()
        .with_from_user(config.console.from_user.clone())
        .with_exit_phrase(config.console.exit_phrase.clone());

    let kind: TransportKind = config.console.transport.parse()?;
    info!("Using {kind:?} streaming transport");

    match kind {
        TransportKind::Callback => {
            let transport = CallbackTransport::new(Arc::new(scoped.clone()));
            RelayLoop::new(scoped, transport, session, loop_config, renderer)
                .run()
                .await?;
        }
        TransportKind::Socket => {
            RelayLoop::new(scoped, SocketTransport::new(), session, loop_config, renderer)
                .run()
                .await?;
        }
    }

    Ok(())
}
