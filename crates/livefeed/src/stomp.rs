//! Minimal STOMP 1.2 frame codec for the broker bridge.
//!
//! Only the commands the feed actually exchanges are modeled. Header values
//! use the STOMP 1.2 escape sequences (`\n`, `\c`, `\\`); bodies are carried
//! as opaque text and terminated by a NUL octet on the wire.

use crate::error::{FeedError, Result};

/// STOMP frame commands used by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Receipt,
    Disconnect,
    Error,
}

impl Command {
    fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Disconnect => "DISCONNECT",
            Command::Error => "ERROR",
        }
    }

    fn parse(input: &str) -> Result<Self> {
        match input {
            "CONNECT" => Ok(Command::Connect),
            "CONNECTED" => Ok(Command::Connected),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "SEND" => Ok(Command::Send),
            "MESSAGE" => Ok(Command::Message),
            "RECEIPT" => Ok(Command::Receipt),
            "DISCONNECT" => Ok(Command::Disconnect),
            "ERROR" => Ok(Command::Error),
            other => Err(FeedError::Frame(format!("unknown command: {other}"))),
        }
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value for a header name, if present.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Serialize to wire text, including the NUL terminator.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(&escape(name));
            out.push(':');
            out.push_str(&escape(value));
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame from wire text. Trailing NUL and EOL padding after it
    /// are accepted; anything structurally off is a [`FeedError::Frame`].
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim_end_matches(['\n', '\r']);
        let input = input
            .strip_suffix('\0')
            .ok_or_else(|| FeedError::Frame("missing NUL terminator".to_string()))?;

        let mut lines = input.split('\n');
        let command_line = lines
            .next()
            .ok_or_else(|| FeedError::Frame("empty frame".to_string()))?;
        let command = Command::parse(command_line.trim_end_matches('\r'))?;

        let mut headers = Vec::new();
        let mut consumed = command_line.len() + 1;
        for line in lines {
            consumed += line.len() + 1;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                // Blank line ends the header section; the rest is the body.
                let body = input.get(consumed..).unwrap_or("").to_string();
                return Ok(Self {
                    command,
                    headers,
                    body,
                });
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| FeedError::Frame(format!("header without colon: {line}")))?;
            headers.push((unescape(name)?, unescape(value)?));
        }

        Err(FeedError::Frame("missing header terminator".to_string()))
    }
}

/// CONNECT frame for the given virtual host.
pub fn connect_frame(host: &str) -> Frame {
    Frame::new(Command::Connect)
        .header("accept-version", "1.2")
        .header("host", host)
        .header("heart-beat", "0,0")
}

/// SUBSCRIBE frame registering `id` on `destination`.
pub fn subscribe_frame(id: &str, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
        .header("ack", "auto")
}

/// UNSUBSCRIBE frame for a previously registered `id`.
pub fn unsubscribe_frame(id: &str) -> Frame {
    Frame::new(Command::Unsubscribe).header("id", id)
}

/// SEND frame carrying `body` to `destination`.
pub fn send_frame(destination: &str, body: &str) -> Frame {
    Frame::new(Command::Send)
        .header("destination", destination)
        .header("content-length", body.len().to_string())
        .body(body)
}

/// DISCONNECT frame.
pub fn disconnect_frame() -> Frame {
    Frame::new(Command::Disconnect)
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            Some('r') => out.push('\r'),
            other => {
                return Err(FeedError::Frame(format!(
                    "bad escape sequence: \\{}",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
