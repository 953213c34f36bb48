//! The wire message type, plus construction ([`factory`]) and parsing
//! ([`parser`]) of it.
//!
//! See spec [3], [4.2], [4.3].

pub mod factory;
pub mod parser;
pub mod wire;

/// An immutable byte sequence with accessors for the fixed-offset header
/// fields. No trailing bus CRC is present at this layer — the transport
/// strips/adds it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message(Vec<u8>);

/// A message shorter than the 4-byte header could not be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("message too short: {0} bytes, minimum is 4")]
pub struct TooShort(pub usize);

impl Message {
    /// Wrap raw bytes as a message. Fails if shorter than the 4-byte header.
    pub fn new(bytes: Vec<u8>) -> Result<Self, TooShort> {
        if bytes.len() < 4 {
            Err(TooShort(bytes.len()))
        } else {
            Ok(Self(bytes))
        }
    }

    /// Borrow the full wire representation, header included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn priority(&self) -> u8 {
        self.0[0]
    }

    pub fn destination(&self) -> u8 {
        self.0[1]
    }

    pub fn source(&self) -> u8 {
        self.0[2]
    }

    pub fn mode(&self) -> u8 {
        self.0[3]
    }

    /// The mode-specific payload, i.e. everything from offset 4 onward.
    pub fn payload(&self) -> &[u8] {
        &self.0[4..]
    }
}

impl From<Message> for Vec<u8> {
    fn from(message: Message) -> Self {
        message.0
    }
}

impl Default for Message {
    /// A zeroed 4-byte header, used only as the failure-case carrier inside
    /// `Response<Message>` — never a message actually placed on the bus.
    fn default() -> Self {
        Self(vec![0, 0, 0, 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_messages() {
        assert!(Message::new(vec![0x6C, 0xF0, 0x10]).is_err());
    }

    #[test]
    fn exposes_header_fields() {
        let m = Message::new(vec![0x6C, 0xF0, 0x10, 0x3C, 0x01]).unwrap();
        assert_eq!(m.priority(), 0x6C);
        assert_eq!(m.destination(), 0xF0);
        assert_eq!(m.source(), 0x10);
        assert_eq!(m.mode(), 0x3C);
        assert_eq!(m.payload(), &[0x01]);
    }
}
