//! The bot's side of the connection: identity, hook registry and the
//! read loop that dispatches every incoming line.

use crate::{
    hook::Pong,
    report::{ErrorSink, HookError},
    Hook, Message, Result,
};
use std::collections::HashMap;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::Mutex,
};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// IRC client dispatching parsed lines to registered hooks
///
/// Hooks can only be registered through `&mut Client`; once [`Client::run`]
/// takes ownership the registry is frozen for the rest of the session.
pub struct Client {
    /// Command key to hooks, in registration order
    hooks: HashMap<String, Vec<Box<dyn Hook>>>,
    /// Write half of the connection
    writer: Mutex<Writer>,
    nick: String,
    name: String,
    host: String,
}

impl Client {
    /// Create a client writing to the given connection half
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            hooks: HashMap::new(),
            writer: Mutex::new(Box::new(writer)),
            nick: String::new(),
            name: String::new(),
            host: String::new(),
        }
    }

    /// Register with the server and answer its keepalives
    pub async fn setup(&mut self, nick: &str, name: &str, host: &str) -> Result<()> {
        self.nick = nick.to_string();
        self.name = name.to_string();
        self.host = host.to_string();

        self.register_hook("ping", Pong);

        self.write(format!("USER {} {} * :{}", nick, host, name)).await?;
        self.write(format!("NICK {}", nick)).await
    }

    /// Append a hook for the given command key
    ///
    /// Keys are matched case-insensitively, so "privmsg" and "PRIVMSG" name
    /// the same key. Registering several hooks under one key is allowed and
    /// they all run.
    pub fn register_hook<H>(&mut self, command: &str, hook: H)
    where
        H: Hook + 'static,
    {
        tracing::debug!("Registering hook for {}", command);
        self.hooks.entry(hook_key(command)).or_default().push(Box::new(hook));
    }

    /// Number of hooks registered under a key
    pub fn hook_count(&self, command: &str) -> usize {
        self.hooks.get(&hook_key(command)).map_or(0, Vec::len)
    }

    /// Dispatch one raw line
    ///
    /// Lines that fail to parse are dropped. Every hook registered for the
    /// command runs in order; failures go to `errors` and do not stop the
    /// remaining hooks.
    pub async fn handle(&self, line: &str, errors: &ErrorSink) {
        let message = match Message::parse(line) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Discarding line {:?}: {}", line, e);
                return;
            }
        };

        let Some(hooks) = self.hooks.get(&hook_key(&message.command)) else {
            return;
        };

        for hook in hooks {
            if let Err(error) = hook.call(self, &message).await {
                if errors.send(HookError::new(&message.command, error)).is_err() {
                    tracing::warn!("Error reporter is gone, dropping hook failure for {}", message.command);
                }
            }
        }
    }

    /// Send a single line to the server
    pub async fn write(&self, line: impl AsRef<str>) -> Result<()> {
        let line = line.as_ref();
        tracing::trace!(">> {}", line);
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read lines until the server closes the connection
    ///
    /// With `echo` set every received line is printed to stdout.
    pub async fn run<R>(self, reader: R, errors: ErrorSink, echo: bool) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let n = reader.read_until(b'\n', &mut buf).await?;
            if n == 0 {
                tracing::info!("Connection closed by server");
                return Ok(());
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);
            if echo {
                println!("{}", line);
            }

            self.handle(line, &errors).await;
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("nick", &self.nick)
            .field("host", &self.host)
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn hook_key(command: &str) -> String {
    command.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_setup_registers_with_server() {
        let (ours, mut theirs) = tokio::io::duplex(1024);
        let mut client = Client::new(ours);
        client.setup("marvin", "Marvin the Bot", "irc.example.net").await.unwrap();
        assert_eq!(client.nick(), "marvin");
        assert_eq!(client.hook_count("PING"), 1);
        drop(client);

        let mut sent = String::new();
        theirs.read_to_string(&mut sent).await.unwrap();
        assert_eq!(sent, "USER marvin irc.example.net * :Marvin the Bot\r\nNICK marvin\r\n");
    }

    #[tokio::test]
    async fn test_ping_is_answered() {
        let (ours, mut theirs) = tokio::io::duplex(1024);
        let mut client = Client::new(ours);
        client.register_hook("ping", Pong);
        let (errors, _rx) = report::channel();

        client.handle("PING :irc.example.net", &errors).await;
        drop(client);

        let mut sent = String::new();
        theirs.read_to_string(&mut sent).await.unwrap();
        assert_eq!(sent, "PONG :irc.example.net\r\n");
    }
}
