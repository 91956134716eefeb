/// Command frame — the unit of routing.
///
/// A frame is one command byte plus a UTF-8 payload. Routed payloads are
/// colon-separated tuples:
///
///   chat      `sender:receiver:body[:correlationId]`
///   reaction  `sender:receiver:messageId;reactionCount`
///   presence  `server:<integer>` (server-authored)
///
/// Classification happens once, at [`Frame::classify`]; the routing code
/// never re-inspects raw payload text.
use super::command::{marker, Command};

/// One decoded inbound frame (or one outbound frame before encoding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw command byte. Unknown codes are still relayed untouched.
    pub code: u8,
    /// UTF-8 payload, never containing the newline terminator.
    pub payload: String,
}

/// Sender/receiver identifiers opportunistically extracted from a payload.
///
/// Extraction happens for every command, not only chat messages — it is how
/// the relay learns username→address bindings. A payload with no colon has
/// an unknown sender and no routable receiver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
    pub sender: Option<String>,
    pub receiver: Option<String>,
}

/// Frame classification, decided once per inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Chat {
        sender: String,
        receiver: String,
        body: String,
        correlation_id: Option<String>,
    },
    Reaction {
        message_id: String,
        count: String,
    },
    PresenceCount,
    HelloWorld,
    Welcome,
    GoodBye,
    /// Relayed verbatim; no delegate side effects.
    Other,
    /// Required colon/semicolon fields are missing for this command.
    Malformed,
}

/// Identifiers come off the wire with stray spaces; bindings and lookups
/// use the stripped form.
fn strip_spaces(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

impl Frame {
    pub fn new(command: Command, payload: impl Into<String>) -> Self {
        Self {
            code: command.code(),
            payload: payload.into(),
        }
    }

    /// The known command for this frame's byte, if any.
    pub fn command(&self) -> Option<Command> {
        Command::from_code(self.code)
    }

    /// Extract `(sender, receiver)` from the first two colon-separated fields.
    pub fn route(&self) -> Route {
        if !self.payload.contains(':') {
            return Route::default();
        }
        let mut fields = self.payload.split(':');
        let sender = fields.next().map(strip_spaces).filter(|s| !s.is_empty());
        let receiver = fields.next().map(strip_spaces).filter(|s| !s.is_empty());
        Route { sender, receiver }
    }

    /// Classify this frame for delegate dispatch.
    ///
    /// The command byte decides chat/reaction/presence frames; the presence
    /// payload markers decide the handshake frames; everything else is a
    /// plain relay.
    pub fn classify(&self) -> FrameKind {
        match self.command() {
            Some(Command::Message) => self.classify_chat(),
            Some(Command::AddReact) | Some(Command::RmReact) => self.classify_reaction(),
            Some(Command::ConnNb) => FrameKind::PresenceCount,
            _ => {
                if self.payload.contains(marker::HELLO_WORLD) {
                    FrameKind::HelloWorld
                } else if self.payload.contains(marker::WELCOME) {
                    FrameKind::Welcome
                } else if self.payload.contains(marker::GOOD_BYE) {
                    FrameKind::GoodBye
                } else {
                    FrameKind::Other
                }
            }
        }
    }

    fn classify_chat(&self) -> FrameKind {
        let fields: Vec<&str> = self.payload.split(':').collect();
        if fields.len() < 3 {
            return FrameKind::Malformed;
        }
        // A fifth field means the body itself contained colons; only the
        // exact four-field form carries a correlation id.
        let correlation_id = if fields.len() == 4 {
            Some(fields[3].to_owned())
        } else {
            None
        };
        FrameKind::Chat {
            sender: fields[0].to_owned(),
            receiver: strip_spaces(fields[1]),
            body: fields[2].to_owned(),
            correlation_id,
        }
    }

    fn classify_reaction(&self) -> FrameKind {
        let fields: Vec<&str> = self.payload.split(':').collect();
        if fields.len() < 3 {
            return FrameKind::Malformed;
        }
        match fields[2].split_once(';') {
            Some((message_id, count)) => FrameKind::Reaction {
                message_id: message_id.to_owned(),
                count: count.to_owned(),
            },
            None => FrameKind::Malformed,
        }
    }
}
