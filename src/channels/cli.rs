//! CLI channel: stdin/stdout REPL for local testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;

/// A simple CLI channel that reads from stdin and writes to stdout.
///
/// Every line is sent as the configured user. Buttons from the last reply
/// are printed as a numbered list and can be picked by number.
pub struct CliChannel {
    user_id: i64,
    buttons: Arc<Mutex<Vec<String>>>,
}

impl CliChannel {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            buttons: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Replace a button number with the button's label.
fn resolve_choice(line: &str, buttons: &[String]) -> String {
    line.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| buttons.get(i))
        .cloned()
        .unwrap_or_else(|| line.to_string())
}

fn render_buttons(buttons: &[String]) -> String {
    buttons
        .iter()
        .enumerate()
        .map(|(i, b)| format!("  [{}] {b}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id.to_string();
        let buttons = Arc::clone(&self.buttons);

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            // Print prompt
            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let content = match buttons.lock() {
                            Ok(current) => resolve_choice(&line, &current),
                            Err(_) => line,
                        };
                        let msg = IncomingMessage::new("cli", user_id.as_str(), content)
                            .with_user_name("local-user");
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if response.buttons.is_empty() {
            println!("\n{}\n", response.content);
        } else {
            println!(
                "\n{}\n{}\n",
                response.content,
                render_buttons(&response.buttons)
            );
        }
        if let Ok(mut current) = self.buttons.lock() {
            *current = response.buttons;
        }
        eprint!("> ");
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        match status {
            StatusUpdate::Thinking(msg) => eprintln!("⏳ {}", msg),
            StatusUpdate::Status(msg) => eprintln!("ℹ️  {}", msg),
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["Да, удалить".to_string(), "Нет, отменить".to_string()]
    }

    #[test]
    fn number_picks_button() {
        assert_eq!(resolve_choice("1", &labels()), "Да, удалить");
        assert_eq!(resolve_choice("2", &labels()), "Нет, отменить");
    }

    #[test]
    fn out_of_range_or_text_passes_through() {
        assert_eq!(resolve_choice("0", &labels()), "0");
        assert_eq!(resolve_choice("3", &labels()), "3");
        assert_eq!(resolve_choice("30", &[]), "30");
        assert_eq!(resolve_choice("Анна", &labels()), "Анна");
    }

    #[test]
    fn buttons_render_numbered() {
        assert_eq!(
            render_buttons(&labels()),
            "  [1] Да, удалить\n  [2] Нет, отменить"
        );
    }

    #[tokio::test]
    async fn respond_remembers_buttons() {
        let cli = CliChannel::new(1);
        let msg = IncomingMessage::new("cli", "1", "/delete");
        cli.respond(&msg, OutgoingResponse::text("?").with_buttons(labels()))
            .await
            .unwrap();
        assert_eq!(*cli.buttons.lock().unwrap(), labels());

        cli.respond(&msg, OutgoingResponse::text("ok")).await.unwrap();
        assert!(cli.buttons.lock().unwrap().is_empty());
    }
}
