//! The interactive relay loop: stream inbound, loop outbound.
//!
//! Inbound delivery runs on its own task, driven by the transport, so bot
//! output can appear while the operator is mid-prompt. The outbound side is
//! a line-based read-and-send cycle that ends when the exit phrase is typed
//! as a standalone line, or when the streaming connection dies.

use crate::render::Renderer;
use crate::transport::Transport;
use crate::{Error, Result};
use botline_core::{Activity, RelayApi, Session};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Configuration for one run of the relay loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Sender label attached to every outbound message.
    pub from_user: String,
    /// Standalone input line that ends the run (case-sensitive).
    pub exit_phrase: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            from_user: "botline console".to_string(),
            exit_phrase: "bye".to_string(),
        }
    }
}

impl LoopConfig {
    /// Set the sender label.
    #[must_use]
    pub fn with_from_user(mut self, from_user: String) -> Self {
        self.from_user = from_user;
        self
    }

    /// Set the exit phrase.
    #[must_use]
    pub fn with_exit_phrase(mut self, exit_phrase: String) -> Self {
        self.exit_phrase = exit_phrase;
        self
    }
}

/// Connected confirmation shown before the operator starts typing.
#[must_use]
pub(crate) fn connected_banner(conversation_id: &str) -> String {
    format!("- Successfully connected via WebSockets\n- Starting conversation - {conversation_id}")
}

/// Drives one bootstrapped session until the exit phrase is entered.
pub struct RelayLoop<A, T> {
    api: A,
    transport: T,
    session: Session,
    config: LoopConfig,
    renderer: Renderer,
}

impl<A, T> RelayLoop<A, T>
where
    A: RelayApi,
    T: Transport,
{
    pub fn new(api: A, transport: T, session: Session, config: LoopConfig, renderer: Renderer) -> Self {
        Self {
            api,
            transport,
            session,
            config,
            renderer,
        }
    }

    /// Run the loop, blocking until the exit phrase is entered or the
    /// streaming connection is lost.
    pub async fn run(&self) -> Result<()> {
        info!(
            "Opening streaming channel for conversation {}",
            self.session.conversation_id
        );

        let mut inbound = self.transport.connect(&self.session).await?;

        println!();
        println!("{}", connected_banner(&self.session.conversation_id));
        println!();

        self.replay_history().await;

        // Render task ends when the transport drops its sender; the watch
        // signal then cancels the pending console read below.
        let (closed_tx, closed_rx) = watch::channel(false);
        let renderer = self.renderer.clone();
        tokio::spawn(async move {
            while let Some(batch) = inbound.recv().await {
                debug!("Received batch of {} activities", batch.activities.len());
                if let Err(e) = renderer.render_batch(&batch, &mut std::io::stdout()) {
                    warn!("Failed to render inbound batch: {e}");
                }
            }
            let _ = closed_tx.send(true);
        });

        self.pump_outbound(BufReader::new(tokio::io::stdin()), closed_rx)
            .await
    }

    /// Fetch and render the backlog when the operator supplied a watermark.
    ///
    /// Replay failure is reported but does not abort the session.
    async fn replay_history(&self) {
        let Some(watermark) = self.session.watermark.as_deref() else {
            return;
        };
        if watermark.is_empty() {
            return;
        }

        match self
            .api
            .activities_after(&self.session.conversation_id, Some(watermark))
            .await
        {
            Ok(backlog) => {
                if let Err(e) = self.renderer.render_batch(&backlog, &mut std::io::stdout()) {
                    warn!("Failed to render history: {e}");
                }
            }
            Err(e) => warn!("History replay failed: {e}"),
        }
    }

    /// Read, trim, and post operator lines until the exit phrase or end
    /// of input.
    ///
    /// Sending is fire-and-forget: a failed send is reported per message
    /// and the loop keeps going.
    async fn pump_outbound<R>(&self, reader: R, mut closed: watch::Receiver<bool>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();

        loop {
            print!("You: ");
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = closed.changed() => {
                    warn!("Streaming connection closed; ending session");
                    return Err(Error::StreamClosed);
                }
            };

            let Some(line) = line else {
                // End of input behaves like the exit phrase.
                break;
            };

            let input = line.trim();
            if input == self.config.exit_phrase {
                break;
            }
            if input.is_empty() {
                continue;
            }

            let activity = Activity::message(&self.config.from_user, input);
            match self
                .api
                .post_activity(&self.session.conversation_id, &activity)
                .await
            {
                Ok(id) => debug!("Posted activity {id}"),
                Err(e) => eprintln!("Failed to send message: {e}"),
            }
        }

        info!("Session ended by operator");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionBootstrapper;
    use crate::render::RenderMode;
    use async_trait::async_trait;
    use botline_core::{ActivitySet, Conversation, TokenResponse};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    #[derive(Default, Clone)]
    struct RecordingRelay {
        posts: Arc<Mutex<Vec<Activity>>>,
        fail_sends: bool,
    }

    #[async_trait]
    impl RelayApi for RecordingRelay {
        async fn generate_token(&self) -> anyhow::Result<TokenResponse> {
            Ok(TokenResponse {
                conversation_id: Some("C1".into()),
                token: "fresh-token".into(),
                expires_in: Some(1800),
            })
        }

        async fn start_conversation(&self, _token: &str) -> anyhow::Result<Conversation> {
            Ok(Conversation {
                conversation_id: "C1".into(),
                token: "conversation-token".into(),
                stream_url: Some("wss://relay.example.test/stream".into()),
                expires_in: Some(1800),
            })
        }

        async fn reconnect(
            &self,
            conversation_id: &str,
            _watermark: Option<&str>,
        ) -> anyhow::Result<Conversation> {
            Ok(Conversation {
                conversation_id: conversation_id.into(),
                token: "refreshed-token".into(),
                stream_url: None,
                expires_in: None,
            })
        }

        async fn activities_after(
            &self,
            _conversation_id: &str,
            _watermark: Option<&str>,
        ) -> anyhow::Result<ActivitySet> {
            Ok(ActivitySet::default())
        }

        async fn post_activity(
            &self,
            _conversation_id: &str,
            activity: &Activity,
        ) -> anyhow::Result<String> {
            if self.fail_sends {
                anyhow::bail!("service unavailable");
            }
            let mut posts = self.posts.lock().expect("lock poisoned");
            posts.push(activity.clone());
            Ok(format!("{:04}", posts.len()))
        }
    }

    /// Transport that hands the loop a channel the test controls.
    struct ScriptedTransport {
        rx: Mutex<Option<mpsc::Receiver<ActivitySet>>>,
    }

    impl ScriptedTransport {
        fn new(rx: mpsc::Receiver<ActivitySet>) -> Self {
            Self {
                rx: Mutex::new(Some(rx)),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self, _session: &Session) -> Result<mpsc::Receiver<ActivitySet>> {
            Ok(self
                .rx
                .lock()
                .expect("lock poisoned")
                .take()
                .expect("connect called once"))
        }
    }

    fn session() -> Session {
        Session {
            conversation_id: "C1".into(),
            token: "conversation-token".into(),
            stream_url: None,
            watermark: None,
        }
    }

    fn relay_loop(api: RecordingRelay) -> RelayLoop<RecordingRelay, ScriptedTransport> {
        let (_tx, rx) = mpsc::channel(1);
        RelayLoop::new(
            api,
            ScriptedTransport::new(rx),
            session(),
            LoopConfig::default(),
            Renderer::new(RenderMode::Messages),
        )
    }

    /// A watch pair whose sender must stay alive so the loop sees the
    /// inbound side as open.
    fn open_watch() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn nonempty_lines_become_one_message_each() {
        let api = RecordingRelay::default();
        let relay = relay_loop(api.clone());

        let input = BufReader::new(&b"  hello  \nsecond line\nbye\n"[..]);
        let (_open, closed) = open_watch();
        relay
            .pump_outbound(input, closed)
            .await
            .expect("clean exit");

        let posts = api.posts.lock().expect("lock poisoned");
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].text.as_deref(), Some("hello"));
        assert_eq!(posts[0].activity_type, "message");
        assert_eq!(posts[0].sender_id(), Some("botline console"));
        assert_eq!(posts[1].text.as_deref(), Some("second line"));
    }

    #[tokio::test]
    async fn exit_phrase_must_match_exactly() {
        let api = RecordingRelay::default();
        let relay = relay_loop(api.clone());

        let input = BufReader::new(&b"bye!\nBye\n bye \nnever sent\n"[..]);
        let (_open, closed) = open_watch();
        relay
            .pump_outbound(input, closed)
            .await
            .expect("clean exit");

        // "bye!" and "Bye" are ordinary messages; " bye " trims to the
        // sentinel and ends the loop before "never sent" is read.
        let posts = api.posts.lock().expect("lock poisoned");
        let texts: Vec<_> = posts.iter().filter_map(|a| a.text.as_deref()).collect();
        assert_eq!(texts, vec!["bye!", "Bye"]);
    }

    #[tokio::test]
    async fn blank_lines_send_nothing_and_keep_looping() {
        let api = RecordingRelay::default();
        let relay = relay_loop(api.clone());

        let input = BufReader::new(&b"\n   \n\t\nstill here\nbye\n"[..]);
        let (_open, closed) = open_watch();
        relay
            .pump_outbound(input, closed)
            .await
            .expect("clean exit");

        let posts = api.posts.lock().expect("lock poisoned");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text.as_deref(), Some("still here"));
    }

    #[tokio::test]
    async fn send_failure_is_reported_not_fatal() {
        let api = RecordingRelay {
            fail_sends: true,
            ..RecordingRelay::default()
        };
        let relay = relay_loop(api.clone());

        let input = BufReader::new(&b"doomed\nbye\n"[..]);
        let (_open, closed) = open_watch();
        relay
            .pump_outbound(input, closed)
            .await
            .expect("send failures do not end the loop");

        assert!(api.posts.lock().expect("lock poisoned").is_empty());
    }

    #[tokio::test]
    async fn closed_stream_cancels_pending_read() {
        let api = RecordingRelay::default();
        let relay = relay_loop(api.clone());

        // A duplex reader that never produces a line keeps the loop parked
        // in the console read until the watch fires.
        let (reader, _writer) = tokio::io::duplex(64);
        let (closed_tx, closed_rx) = watch::channel(false);
        closed_tx.send(true).expect("receiver alive");

        let result = relay.pump_outbound(BufReader::new(reader), closed_rx).await;
        assert!(matches!(result, Err(Error::StreamClosed)));
    }

    #[tokio::test]
    async fn fresh_session_flows_into_the_loop() {
        // Scenario: mode "1" bootstraps C1, the banner names it, "hello"
        // becomes one outbound message, "bye" ends the run.
        let api = RecordingRelay::default();
        let bootstrapper = SessionBootstrapper::new(api.clone());
        let session = bootstrapper.start_new().await.expect("bootstrap");
        assert_eq!(session.conversation_id, "C1");
        assert!(connected_banner(&session.conversation_id).contains("C1"));

        let (_tx, rx) = mpsc::channel(1);
        let relay = RelayLoop::new(
            api.clone(),
            ScriptedTransport::new(rx),
            session,
            LoopConfig::default(),
            Renderer::new(RenderMode::Messages),
        );

        let input = BufReader::new(&b"hello\nbye\n"[..]);
        let (_open, closed) = open_watch();
        relay
            .pump_outbound(input, closed)
            .await
            .expect("clean exit");

        let posts = api.posts.lock().expect("lock poisoned");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text.as_deref(), Some("hello"));
    }
}
