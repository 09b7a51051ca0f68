//! Read-eval-print loop over a single session.

use chatloop_core::{ConversationLoop, Session, ToolRegistry};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const PROMPT: &str = "User: ";
pub const RETRY_HINT: &str = "Your conversation is unchanged; send the message again to retry.";

/// `exit` or `quit`, ignoring case and surrounding whitespace
pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

/// Everything one interactive conversation needs
pub struct Repl {
    pub chat: ConversationLoop,
    pub tools: ToolRegistry,
    pub session: Session,
    /// Label printed before each answer
    pub name: String,
}

impl Repl {
    /// Run until `exit`, `quit` or end of input.
    ///
    /// Turn errors go to `errors` and the loop keeps going; only I/O failures
    /// on the streams themselves end it early.
    pub async fn run<R, W, E>(&mut self, input: R, mut output: W, mut errors: E) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            output.write_all(PROMPT.as_bytes()).await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                // EOF ends like `exit`
                output.write_all(b"\n").await?;
                break;
            };

            if is_exit_command(&line) {
                break;
            }
            let message = line.trim();
            if message.is_empty() {
                continue;
            }

            match self.session.ask(&self.chat, message, &self.tools).await {
                Ok(answer) => {
                    output
                        .write_all(format!("{}: {answer}\n", self.name).as_bytes())
                        .await?;
                }
                Err(e) => {
                    tracing::error!(session = %self.session.id, error = %e, "Turn failed");
                    errors
                        .write_all(format!("Error: {}\n", e.user_message()).as_bytes())
                        .await?;
                    if e.is_retryable() {
                        errors.write_all(format!("{RETRY_HINT}\n").as_bytes()).await?;
                    }
                    errors.flush().await?;
                }
            }
        }

        output.flush().await?;
        tracing::info!(
            session = %self.session.id,
            turns = self.session.turn_count(),
            "Conversation ended"
        );
        Ok(())
    }
}
