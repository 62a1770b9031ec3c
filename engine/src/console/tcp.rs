// TCP console connection to the director
// Length-prefixed frames; non-positive lengths are signals

use super::{ConsoleClient, ConsoleConnector};
use crate::config::ConsoleConfig;
use crate::errors::ConsoleError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, error, info, instrument, warn};

/// End of data for the current response
const SIGNAL_END_OF_DATA: i32 = -1;
/// Peer is closing the session
const SIGNAL_TERMINATE: i32 = -4;
/// Largest frame accepted from the director
const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Console connection wrapper
pub struct TcpConsoleClient {
    stream: TcpStream,
    address: String,
}

impl TcpConsoleClient {
    /// Open a console connection and switch it to JSON output
    #[instrument(skip(config), fields(host = %config.host, port = %config.port))]
    pub async fn connect(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        let address = format!("{}:{}", config.host, config.port);
        info!(address = %address, director = %config.director_name, "Connecting to director console");

        let timeout = Duration::from_secs(config.connect_timeout_seconds);
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                error!(error = %e, address = %address, "Failed to connect");
                return Err(ConsoleError::Connection {
                    address,
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                error!(address = %address, "Connection attempt timed out");
                return Err(ConsoleError::Connection {
                    address,
                    reason: format!("timed out after {} seconds", config.connect_timeout_seconds),
                });
            }
        };
        stream.set_nodelay(true)?;

        let mut client = Self { stream, address };
        let api = format!(".api {}", config.api_version);
        client.exchange(&api).await?;

        info!(address = %client.address, "Console connection established");
        Ok(client)
    }

    async fn exchange(&mut self, command: &str) -> Result<String, ConsoleError> {
        self.write_frame(command.as_bytes()).await?;
        self.read_response().await
    }

    async fn write_frame(&mut self, payload: &[u8]) -> Result<(), ConsoleError> {
        let len = i32::try_from(payload.len())
            .map_err(|_| ConsoleError::Protocol("command too long".to_string()))?;
        self.stream.write_i32(len).await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_response(&mut self) -> Result<String, ConsoleError> {
        let mut body = Vec::new();
        loop {
            let len = self.stream.read_i32().await?;
            match len {
                SIGNAL_END_OF_DATA => break,
                SIGNAL_TERMINATE => {
                    return Err(ConsoleError::Transport(
                        "director closed the console session".to_string(),
                    ))
                }
                len if len <= 0 => {
                    debug!(signal = len, "Ignoring console signal");
                }
                len => {
                    let len = len as usize;
                    if len > MAX_FRAME_LEN {
                        return Err(ConsoleError::Protocol(format!(
                            "frame of {} bytes exceeds limit of {}",
                            len, MAX_FRAME_LEN
                        )));
                    }
                    let start = body.len();
                    body.resize(start + len, 0);
                    self.stream.read_exact(&mut body[start..]).await?;
                }
            }
        }

        String::from_utf8(body)
            .map_err(|e| ConsoleError::MalformedResponse(format!("response is not UTF-8: {}", e)))
    }
}

#[async_trait]
impl ConsoleClient for TcpConsoleClient {
    async fn send(&mut self, command: &str) -> Result<String, ConsoleError> {
        self.exchange(command).await
    }

    async fn disconnect(&mut self) -> Result<(), ConsoleError> {
        debug!(address = %self.address, "Closing console connection");
        if let Err(e) = self.stream.write_i32(SIGNAL_TERMINATE).await {
            warn!(error = %e, "Failed to send terminate signal");
        }
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Connector producing TCP console connections from configuration
#[derive(Debug, Clone)]
pub struct TcpConsoleConnector {
    config: ConsoleConfig,
}

impl TcpConsoleConnector {
    pub fn new(config: ConsoleConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConsoleConnector for TcpConsoleConnector {
    async fn connect(&self) -> Result<Box<dyn ConsoleClient>, ConsoleError> {
        let client = TcpConsoleClient::connect(&self.config).await?;
        Ok(Box::new(client))
    }
}
