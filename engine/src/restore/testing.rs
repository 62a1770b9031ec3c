// Scripted console doubles shared by the restore unit tests

use crate::console::{ConsoleClient, ConsoleConnector};
use crate::errors::ConsoleError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    replies: VecDeque<Result<String, String>>,
    commands: Vec<String>,
    connects: usize,
    disconnects: usize,
}

/// Console replying from a queue and recording every command it receives
#[derive(Clone, Default)]
pub struct ScriptedConsole {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConsole {
    pub fn new(replies: Vec<&str>) -> Self {
        let console = Self::default();
        for reply in replies {
            console.push_reply(reply);
        }
        console
    }

    pub fn push_reply(&self, reply: &str) {
        self.script
            .lock()
            .unwrap()
            .replies
            .push_back(Ok(reply.to_string()));
    }

    pub fn push_transport_error(&self, reason: &str) {
        self.script
            .lock()
            .unwrap()
            .replies
            .push_back(Err(reason.to_string()));
    }

    pub fn commands(&self) -> Vec<String> {
        self.script.lock().unwrap().commands.clone()
    }

    pub fn connects(&self) -> usize {
        self.script.lock().unwrap().connects
    }

    pub fn disconnects(&self) -> usize {
        self.script.lock().unwrap().disconnects
    }
}

#[async_trait]
impl ConsoleClient for ScriptedConsole {
    async fn send(&mut self, command: &str) -> Result<String, ConsoleError> {
        let mut script = self.script.lock().unwrap();
        script.commands.push(command.to_string());
        match script.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(reason)) => Err(ConsoleError::Transport(reason)),
            None => Err(ConsoleError::Transport(format!(
                "no scripted reply for '{}'",
                command
            ))),
        }
    }

    async fn disconnect(&mut self) -> Result<(), ConsoleError> {
        self.script.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

/// Connector handing out clones of one scripted console
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    pub console: ScriptedConsole,
    pub refuse: bool,
}

impl ScriptedConnector {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            console: ScriptedConsole::new(replies),
            refuse: false,
        }
    }
}

#[async_trait]
impl ConsoleConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn ConsoleClient>, ConsoleError> {
        if self.refuse {
            return Err(ConsoleError::Connection {
                address: "scripted".to_string(),
                reason: "refused".to_string(),
            });
        }
        self.console.script.lock().unwrap().connects += 1;
        Ok(Box::new(self.console.clone()))
    }
}
