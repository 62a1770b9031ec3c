// Director console access
// Trait seams for the console connection plus command and envelope handling

mod command;
mod envelope;
mod tcp;

pub use command::{sanitize_text, ConsoleCommand};
pub use envelope::{parse_envelope, parse_result, Envelope};
pub use tcp::{TcpConsoleClient, TcpConsoleConnector};

use crate::errors::ConsoleError;
use async_trait::async_trait;

/// One open console connection to the director.
///
/// Implementations own framing and JSON mode; callers only deal in command
/// text and JSON response text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsoleClient: Send {
    /// Send one command and return the raw JSON response text
    async fn send(&mut self, command: &str) -> Result<String, ConsoleError>;

    /// Close the connection
    async fn disconnect(&mut self) -> Result<(), ConsoleError>;
}

/// Opens console connections, one per engine operation
#[async_trait]
pub trait ConsoleConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn ConsoleClient>, ConsoleError>;
}

/// Send a built command and parse its `result` object
pub async fn execute(
    console: &mut dyn ConsoleClient,
    command: &ConsoleCommand,
) -> Result<serde_json::Value, ConsoleError> {
    let text = command.render();
    tracing::debug!(command = %text, "Sending console command");
    metrics::counter!("console_round_trips_total", "verb" => command.verb().to_string())
        .increment(1);

    let response = console.send(&text).await?;
    parse_result(&response)
}
