//! The [`Message`] value routed between applications and its binary
//! [`Payload`].

use crate::{device::Port, motherboard::DeviceId};
use std::fmt::Display;

/// Returns whether `s` is a binary string: non-empty and made only of the
/// characters `'0'` and `'1'`.
///
/// # Examples
///
/// ```
/// # use elvis_bus::message::is_binary;
/// assert!(is_binary("01010"));
/// assert!(!is_binary(""));
/// assert!(!is_binary("100a"));
/// ```
pub fn is_binary(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b == b'0' || b == b'1')
}

/// The contents of a message. Always a valid binary string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Payload(String);

impl Payload {
    /// Validates and wraps the given string.
    pub fn new(payload: impl Into<String>) -> Result<Self, InvalidPayload> {
        let payload = payload.into();
        if is_binary(&payload) {
            Ok(Self(payload))
        } else {
            Err(InvalidPayload(payload))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false, since a payload holds at least one bit.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for Payload {
    type Error = InvalidPayload;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for Payload {
    type Error = InvalidPayload;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl AsRef<str> for Payload {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("payload is not in the correct format (binary string): {0:?}")]
pub struct InvalidPayload(pub String);

/// A unicast message addressed to the application listening on `port` of
/// the device with ID `recipient`.
///
/// Messages are immutable once constructed. Equality and hashing are
/// structural over all three fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    recipient: DeviceId,
    port: Port,
    payload: Payload,
}

impl Message {
    /// Creates a new message, failing if `payload` is not a binary string.
    ///
    /// # Examples
    ///
    /// ```
    /// # use elvis_bus::Message;
    /// let message = Message::new(2, 2, "100").unwrap();
    /// assert_eq!(message.payload().as_str(), "100");
    /// assert!(Message::new(2, 2, "not binary").is_err());
    /// ```
    pub fn new(
        recipient: DeviceId,
        port: Port,
        payload: impl Into<String>,
    ) -> Result<Self, InvalidPayload> {
        Ok(Self::with_payload(recipient, port, Payload::new(payload)?))
    }

    /// Creates a new message from an already validated payload.
    pub fn with_payload(recipient: DeviceId, port: Port, payload: Payload) -> Self {
        Self {
            recipient,
            port,
            payload,
        }
    }

    /// The ID of the device the message is addressed to.
    pub fn recipient(&self) -> DeviceId {
        self.recipient
    }

    /// The port of the application the message is addressed to.
    pub fn port(&self) -> Port {
        self.port
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_strings() {
        for valid in ["0", "1", "01010", "100"] {
            assert!(is_binary(valid), "{valid:?} should be binary");
        }
        for invalid in ["", "100a", "not binary", "2", " 1", "1 0"] {
            assert!(!is_binary(invalid), "{invalid:?} should not be binary");
        }
    }

    #[test]
    fn payload_rejects_non_binary() {
        assert_eq!(Payload::new(""), Err(InvalidPayload(String::new())));
        assert_eq!(
            Payload::try_from("xyz"),
            Err(InvalidPayload("xyz".to_string()))
        );
        let payload = Payload::try_from(String::from("101")).unwrap();
        assert_eq!(payload.as_str(), "101");
        assert_eq!(payload.to_string(), "101");
    }

    #[test]
    fn structural_equality() {
        let a = Message::new(2, 2, "100").unwrap();
        let b = Message::with_payload(2, 2, Payload::new("100").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, Message::new(2, 3, "100").unwrap());
        assert_ne!(a, Message::new(1, 2, "100").unwrap());
        assert_ne!(a, Message::new(2, 2, "101").unwrap());
        assert_eq!(a.recipient(), 2);
        assert_eq!(a.port(), 2);
    }
}
