//! Rendering of inbound activity batches to the terminal.

use botline_core::ActivitySet;
use std::io::Write;

/// Marker printed before every bot message.
pub const BOT_LABEL: &str = "<Bot>";

/// How inbound batches are written to the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Canonical: only message-type entries, printed as `<Bot>: <text>`.
    Messages,
    /// Diagnostic: every entry as `<id>\t<text>`, unfiltered by type.
    Debug,
}

/// Writes inbound batches according to a [`RenderMode`].
#[derive(Debug, Clone)]
pub struct Renderer {
    mode: RenderMode,
    sender_filter: Option<String>,
}

impl Renderer {
    #[must_use]
    pub const fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            sender_filter: None,
        }
    }

    /// Only render entries sent by the given account id (typically the bot),
    /// so the operator's own echoed messages are suppressed.
    #[must_use]
    pub fn with_sender_filter(mut self, sender_id: Option<String>) -> Self {
        self.sender_filter = sender_id.filter(|id| !id.is_empty());
        self
    }

    pub fn render_batch<W: Write>(&self, batch: &ActivitySet, out: &mut W) -> std::io::Result<()> {
        for activity in &batch.activities {
            if let Some(wanted) = self.sender_filter.as_deref() {
                if activity.sender_id() != Some(wanted) {
                    continue;
                }
            }

            match self.mode {
                RenderMode::Messages => {
                    if !activity.is_message() {
                        continue;
                    }
                    writeln!(
                        out,
                        "{BOT_LABEL}: {}",
                        activity.text.as_deref().unwrap_or_default()
                    )?;
                }
                RenderMode::Debug => {
                    writeln!(
                        out,
                        "{}\t{}",
                        activity.id.as_deref().unwrap_or_default(),
                        activity.text.as_deref().unwrap_or_default()
                    )?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use botline_core::{Activity, ChannelAccount};

    fn batch() -> ActivitySet {
        ActivitySet {
            activities: vec![
                Activity {
                    activity_type: "message".into(),
                    id: Some("C1|0001".into()),
                    from: Some(ChannelAccount {
                        id: "echobot".into(),
                        name: None,
                    }),
                    text: Some("Hi there".into()),
                    timestamp: None,
                },
                Activity {
                    activity_type: "typing".into(),
                    id: Some("C1|0002".into()),
                    from: Some(ChannelAccount {
                        id: "echobot".into(),
                        name: None,
                    }),
                    text: None,
                    timestamp: None,
                },
            ],
            watermark: Some("2".into()),
        }
    }

    fn rendered(renderer: &Renderer, batch: &ActivitySet) -> String {
        let mut out = Vec::new();
        renderer
            .render_batch(batch, &mut out)
            .expect("write to Vec cannot fail");
        String::from_utf8(out).expect("renderer writes UTF-8")
    }

    #[test]
    fn test_messages_mode_filters_by_type() {
        let output = rendered(&Renderer::new(RenderMode::Messages), &batch());
        assert_eq!(output, "<Bot>: Hi there\n");
    }

    #[test]
    fn test_debug_mode_prints_all_entries() {
        let output = rendered(&Renderer::new(RenderMode::Debug), &batch());
        assert_eq!(output, "C1|0001\tHi there\nC1|0002\t\n");
    }

    #[test]
    fn test_sender_filter_drops_other_senders() {
        let renderer =
            Renderer::new(RenderMode::Messages).with_sender_filter(Some("otherbot".into()));
        assert_eq!(rendered(&renderer, &batch()), "");

        let renderer =
            Renderer::new(RenderMode::Messages).with_sender_filter(Some("echobot".into()));
        assert_eq!(rendered(&renderer, &batch()), "<Bot>: Hi there\n");
    }

    #[test]
    fn test_empty_sender_filter_is_ignored() {
        let renderer = Renderer::new(RenderMode::Messages).with_sender_filter(Some(String::new()));
        assert_eq!(rendered(&renderer, &batch()), "<Bot>: Hi there\n");
    }
}
