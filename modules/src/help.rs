//! Help Module
//!
//! Answers `!help` with the list of loaded modules, or with the help text
//! of a single module when one is named (`!help url`).

use marvin_core::{async_trait, Client, Hook, Message, Module, Result, Settings};
use serde::{Deserialize, Serialize};

/// Configuration for the help module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelpConfig {
    /// Command word the module reacts to
    pub trigger: String,
}

/// Module describing the other modules
pub struct HelpModule {
    config: HelpConfig,
    topics: Vec<(String, String)>,
}

impl HelpModule {
    /// Create the module from the (name, help) pairs it should list
    pub fn new(topics: Vec<(String, String)>) -> Self {
        let mut module = Self {
            config: HelpConfig::default(),
            topics,
        };
        let own = (module.name().to_string(), module.help().to_string());
        module.topics.push(own);
        module
    }
}

impl Module for HelpModule {
    fn name(&self) -> &str {
        "help"
    }

    fn help(&self) -> &str {
        "Lists modules and what they do; '!help <module>' describes one."
    }

    fn defaults(&mut self) {
        self.config.trigger = "!help".to_string();
    }

    fn settings(&mut self) -> &mut dyn Settings {
        &mut self.config
    }

    fn load(&mut self, client: &mut Client) -> Result<()> {
        client.register_hook(
            "privmsg",
            HelpReply {
                trigger: self.config.trigger.clone(),
                topics: self.topics.clone(),
            },
        );
        Ok(())
    }
}

struct HelpReply {
    trigger: String,
    topics: Vec<(String, String)>,
}

impl HelpReply {
    /// Lines to send in answer to `text`, if it asks for help at all
    fn answer(&self, text: &str) -> Option<Vec<String>> {
        let mut words = text.split_whitespace();
        if words.next()? != self.trigger {
            return None;
        }

        let lines = match words.next() {
            None => self
                .topics
                .iter()
                .map(|(name, help)| format!("{}: {}", name, help))
                .collect(),
            Some(wanted) => match self.topics.iter().find(|(name, _)| name == wanted) {
                Some((name, help)) => vec![format!("{}: {}", name, help)],
                None => vec![format!("No such module: {}", wanted)],
            },
        };
        Some(lines)
    }
}

#[async_trait]
impl Hook for HelpReply {
    async fn call(&self, client: &Client, message: &Message) -> Result<()> {
        let Some(receiver) = message.receiver.as_deref() else {
            return Ok(());
        };
        let Some(lines) = self.answer(message.text()) else {
            return Ok(());
        };

        for line in lines {
            client.write(format!("NOTICE {} :{}", receiver, line)).await?;
        }
        Ok(())
    }
}
