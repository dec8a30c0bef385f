use super::traits::{ChannelMessage, Notifier};
use crate::error::TransportError;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Console chat transport.
///
/// Reads `<channel> <nick> <message>` lines from stdin and prints channel
/// notices to stdout. Stands in for a real chat connection; the coordinator
/// only ever sees `ChannelMessage` and `Notifier`.
pub struct ConsoleTransport;

impl ConsoleTransport {
    pub fn new() -> Self {
        Self
    }

    /// Read messages from stdin until EOF, forwarding them to `tx`.
    pub async fn listen(&self, tx: mpsc::Sender<ChannelMessage>) -> anyhow::Result<()> {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        while let Some(line) = lines.next_line().await? {
            let Some(message) = parse_line(&line) else {
                if !line.trim().is_empty() {
                    tracing::warn!(
                        line = %line,
                        "ignoring malformed input, want: <channel> <nick> <message>"
                    );
                }
                continue;
            };
            if tx.send(message).await.is_err() {
                return Ok(());
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleTransport {
    async fn notify(&self, channel_id: &str, text: &str) -> Result<(), TransportError> {
        println!("[{channel_id}] {text}");
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<ChannelMessage> {
    let mut parts = line.trim_start().splitn(3, char::is_whitespace);
    let channel_id = parts.next()?.to_string();
    let author = parts.next()?.to_string();
    let text = parts.next()?.to_string();

    if channel_id.is_empty() || author.is_empty() || text.is_empty() {
        return None;
    }

    Some(ChannelMessage {
        channel_id,
        author,
        text,
    })
}
