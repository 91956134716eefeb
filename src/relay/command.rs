/// Wire command codes and presence-protocol payload markers.
///
/// Every frame starts with a single command byte. The byte drives delegate
/// dispatch (chat persistence, reaction counters) and presence counts; the
/// relay forwards frames with codes it does not recognize untouched, so the
/// set can grow without a server release.
///
/// Independently of the command byte, the presence protocol embeds UUID
/// string markers in payload bodies. Clients match them by substring; the
/// relay never rewrites payloads, so the markers survive forwarding as-is.

/// Command byte values (closed set, extendable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Routed chat message: `sender:receiver:body[:correlationId]`.
    Message = 1,
    /// Reaction added: `sender:receiver:messageId;reactionCount`.
    AddReact = 2,
    /// Reaction removed: same grammar as [`Command::AddReact`].
    RmReact = 3,
    /// Server-authored connection count: `server:<integer>`.
    ConnNb = 4,
    HelloWorld = 5,
    Welcome = 6,
    GoodBye = 7,
}

impl Command {
    /// Map a raw wire byte to a known command, if any.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Message),
            2 => Some(Self::AddReact),
            3 => Some(Self::RmReact),
            4 => Some(Self::ConnNb),
            5 => Some(Self::HelloWorld),
            6 => Some(Self::Welcome),
            7 => Some(Self::GoodBye),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Payload markers matched by clients as substrings of the payload body.
pub mod marker {
    pub const HELLO_WORLD: &str = "BEE60C70-BD57-49BA-8721-5D0C85D1073E";
    pub const WELCOME: &str = "FC817DF7-E6F2-4F33-A65F-2457BD0D6235";
    pub const GOOD_BYE: &str = "AFDCF901-0BA2-46EC-AF21-72C8FC29442F";
    pub const CONN_NB: &str = "AC6C597D-BA33-436C-9FD5-97A43B33D3BB";
}
