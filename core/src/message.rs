//! IRC message parsing
//!
//! Implements the RFC 1459 line grammar as seen by a client:
//! `[":" prefix " "] command *(" " param) [" :" trailing]`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// IRC message prefix (server or user)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prefix {
    /// Server name, or a bare nickname without user and host parts
    Server(String),
    /// User prefix (nick!user@host)
    User {
        nick: String,
        user: String,
        host: String,
    },
}

impl Prefix {
    fn parse(input: &str) -> Self {
        if let Some((nick, rest)) = input.split_once('!') {
            if let Some((user, host)) = rest.split_once('@') {
                if !nick.is_empty() {
                    return Prefix::User {
                        nick: nick.to_string(),
                        user: user.to_string(),
                        host: host.to_string(),
                    };
                }
            }
        }
        Prefix::Server(input.to_string())
    }

    /// Nickname for user prefixes, server name otherwise
    pub fn name(&self) -> &str {
        match self {
            Prefix::Server(name) => name,
            Prefix::User { nick, .. } => nick,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => write!(f, "{}", name),
            Prefix::User { nick, user, host } => write!(f, "{}!{}@{}", nick, user, host),
        }
    }
}

/// A single parsed IRC line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Optional prefix (server or user)
    pub prefix: Option<Prefix>,
    /// Command verb or three digit numeric, case as received
    pub command: String,
    /// Middle parameters, without the trailing one
    pub params: Vec<String>,
    /// Trailing parameter (the text after " :")
    pub data: Option<String>,
    /// Where a reply to this message should go
    pub receiver: Option<String>,
}

impl Message {
    /// Parse an IRC message from a single line
    pub fn parse(input: &str) -> Result<Self> {
        let line = input.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(Error::MessageParse("Empty message".to_string()));
        }
        if line.contains(['\0', '\r', '\n']) {
            return Err(Error::MessageParse("Control character inside message".to_string()));
        }

        let (prefix, body) = match line.strip_prefix(':') {
            Some(rest) => {
                let (prefix, body) = rest
                    .split_once(' ')
                    .ok_or_else(|| Error::MessageParse("Prefix without command".to_string()))?;
                if prefix.is_empty() {
                    return Err(Error::MessageParse("Empty prefix".to_string()));
                }
                (Some(Prefix::parse(prefix)), body.trim_start_matches(' '))
            }
            None => (None, line),
        };

        let (command, mut rest) = body.split_once(' ').unwrap_or((body, ""));
        if !is_valid_command(command) {
            return Err(Error::MessageParse(format!("Invalid command {:?}", command)));
        }

        let mut params = Vec::new();
        let mut data = None;
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                data = Some(trailing.to_string());
                break;
            }
            let (param, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = tail;
        }

        let receiver = reply_target(prefix.as_ref(), &params);

        Ok(Message {
            prefix,
            command: command.to_string(),
            params,
            data,
            receiver,
        })
    }

    /// Trailing text, or an empty string when there is none
    pub fn text(&self) -> &str {
        self.data.as_deref().unwrap_or("")
    }

    /// Whether the command is a three digit numeric reply
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        write!(f, "{}", self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(ref data) = self.data {
            write!(f, " :{}", data)?;
        }
        Ok(())
    }
}

fn is_valid_command(command: &str) -> bool {
    if command.is_empty() {
        return false;
    }
    let bytes = command.as_bytes();
    bytes.iter().all(u8::is_ascii_alphabetic)
        || (bytes.len() == 3 && bytes.iter().all(u8::is_ascii_digit))
}

fn is_channel(name: &str) -> bool {
    name.starts_with(['#', '&', '+', '!'])
}

/// Channel messages are answered in the channel, private ones to the sender.
fn reply_target(prefix: Option<&Prefix>, params: &[String]) -> Option<String> {
    let first = params.first()?;
    if is_channel(first) {
        return Some(first.clone());
    }
    match prefix {
        Some(prefix) => Some(prefix.name().to_string()),
        None => Some(first.clone()),
    }
}
