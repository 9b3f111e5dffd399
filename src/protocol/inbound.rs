//! Peer-to-relay message decoding.
//!
//! Inbound text is decoded into a closed set of shapes. Which shapes are
//! reachable depends on the [`RelayMode`]:
//!
//! | `type` | Fields read | Presence | Negotiation |
//! |--------|-------------|----------|-------------|
//! | `"ping"` | none | [`Inbound::Ping`] | [`Inbound::Ping`] |
//! | `"message"` | `content` | [`Inbound::Echo`] / [`Inbound::EmptyEcho`] | [`Inbound::Echo`] / [`Inbound::EmptyEcho`] |
//! | anything / absent | `offer`, `answer`, `targetSocketGuid` | unknown / missing type | [`Inbound::Negotiate`] |
//! | other | none of the above | unknown type | unknown type |
//! | absent | none of the above | missing type | missing type |
//!
//! Only the fields a shape needs are read, so unrelated fields never cause a
//! rejection. A field set to `null` counts as present: a `null` content is
//! echoed back as `null`, and a `null` negotiation field clears the stored value.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::RelayMode;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

const TYPE: &str = "type";
const CONTENT: &str = "content";
const OFFER: &str = "offer";
const ANSWER: &str = "answer";
const TARGET: &str = "targetSocketGuid";

const PING: &str = "ping";
const MESSAGE: &str = "message";

// ============================================================================
// NegotiationUpdate
// ============================================================================

/// Negotiation fields carried by one inbound message.
///
/// Absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NegotiationUpdate {
    /// New session-description offer.
    pub offer: Option<String>,

    /// New session-description answer.
    pub answer: Option<String>,

    /// Peer this connection negotiates with (`targetSocketGuid`).
    pub target: Option<String>,
}

impl NegotiationUpdate {
    /// Reads the negotiation fields of a message object.
    ///
    /// `null` becomes an empty value.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidMessage`] if a present field is neither a string nor `null`.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            offer: text_field(fields, OFFER)?.map(Option::unwrap_or_default),
            answer: text_field(fields, ANSWER)?.map(Option::unwrap_or_default),
            target: text_field(fields, TARGET)?.map(Option::unwrap_or_default),
        })
    }

    /// Returns `true` if no field is set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offer.is_none() && self.answer.is_none() && self.target.is_none()
    }

    /// Sets the offer.
    #[inline]
    #[must_use]
    pub fn with_offer(mut self, offer: impl Into<String>) -> Self {
        self.offer = Some(offer.into());
        self
    }

    /// Sets the answer.
    #[inline]
    #[must_use]
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    /// Sets the target peer.
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

// ============================================================================
// Inbound
// ============================================================================

/// A decoded peer message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Liveness check, answered with a pong.
    Ping,

    /// Echo request carrying a `content` field.
    Echo {
        /// Text to send back, `None` if the peer sent `null`.
        content: Option<String>,
    },

    /// Echo request without a `content` field. Not answered.
    EmptyEcho,

    /// Negotiation state change for the sending peer.
    Negotiate(NegotiationUpdate),
}

impl Inbound {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidJson`] if `text` is not JSON
    /// - [`Error::InvalidMessage`] if it is not an object or a field the
    ///   matched shape reads has the wrong type
    /// - [`Error::UnknownType`] if `type` is not recognized
    /// - [`Error::MissingType`] if `type` is absent and nothing else identifies the message
    pub fn decode(text: &str, mode: RelayMode) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| Error::invalid_json(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(Error::invalid_message("expected a JSON object"));
        };

        let kind = fields
            .get(TYPE)
            .filter(|kind| !kind.is_null())
            .map(kind_text);

        match kind.as_deref() {
            Some(PING) => return Ok(Self::Ping),
            Some(MESSAGE) => {
                return Ok(match text_field(&fields, CONTENT)? {
                    Some(content) => Self::Echo { content },
                    None => Self::EmptyEcho,
                });
            }
            _ => {}
        }

        if mode.accepts_negotiation() {
            let update = NegotiationUpdate::from_fields(&fields)?;
            if !update.is_empty() {
                return Ok(Self::Negotiate(update));
            }
        }

        match kind {
            Some(other) => Err(Error::unknown_type(other)),
            None => Err(Error::MissingType),
        }
    }
}

/// Reads an optional text field.
///
/// Returns `None` if the field is absent and `Some(None)` if it is `null`.
fn text_field(fields: &Map<String, Value>, name: &str) -> Result<Option<Option<String>>> {
    fields
        .get(name)
        .map(|value| {
            Option::<String>::deserialize(value)
                .map_err(|e| Error::invalid_message(format!("'{name}': {e}")))
        })
        .transpose()
}

/// Renders a `type` value as text. Non-string values keep their JSON form.
fn kind_text(kind: &Value) -> String {
    match kind {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> Result<Inbound> {
        Inbound::decode(text, RelayMode::Negotiation)
    }

    #[test]
    fn test_ping() {
        assert_eq!(decode(r#"{"type":"ping"}"#).unwrap(), Inbound::Ping);
    }

    #[test]
    fn test_ping_wins_over_negotiation_fields() {
        let inbound = decode(r#"{"type":"ping","offer":"sdp"}"#).unwrap();
        assert_eq!(inbound, Inbound::Ping);
    }

    #[test]
    fn test_message_with_content() {
        let inbound = decode(r#"{"type":"message","content":"hello"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Echo {
                content: Some("hello".to_string())
            }
        );
    }

    #[test]
    fn test_message_without_content() {
        let inbound = decode(r#"{"type":"message"}"#).unwrap();
        assert_eq!(inbound, Inbound::EmptyEcho);
    }

    #[test]
    fn test_message_with_null_content() {
        let inbound = decode(r#"{"type":"message","content":null}"#).unwrap();
        assert_eq!(inbound, Inbound::Echo { content: None });
    }

    #[test]
    fn test_ping_ignores_mistyped_fields() {
        for mode in [RelayMode::Presence, RelayMode::Negotiation] {
            for text in [
                r#"{"type":"ping","offer":5}"#,
                r#"{"type":"ping","content":5}"#,
                r#"{"type":"ping","targetSocketGuid":{}}"#,
            ] {
                assert_eq!(Inbound::decode(text, mode).unwrap(), Inbound::Ping, "{text}");
            }
        }
    }

    #[test]
    fn test_message_ignores_mistyped_negotiation_fields() {
        for mode in [RelayMode::Presence, RelayMode::Negotiation] {
            let inbound =
                Inbound::decode(r#"{"type":"message","content":"hi","answer":{}}"#, mode)
                    .unwrap();
            assert_eq!(
                inbound,
                Inbound::Echo {
                    content: Some("hi".to_string())
                }
            );
        }
    }

    #[test]
    fn test_message_with_mistyped_content() {
        let err = decode(r#"{"type":"message","content":5}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage { .. }));
    }

    #[test]
    fn test_presence_mode_never_reads_negotiation_fields() {
        let err = Inbound::decode(r#"{"type":"join","offer":5}"#, RelayMode::Presence)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: join");
    }

    #[test]
    fn test_null_offer_clears_field() {
        let inbound = decode(r#"{"offer":null}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Negotiate(NegotiationUpdate::default().with_offer(""))
        );
    }

    #[test]
    fn test_offer_without_type() {
        let inbound = decode(r#"{"offer":"v=0"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Negotiate(NegotiationUpdate::default().with_offer("v=0"))
        );
    }

    #[test]
    fn test_all_negotiation_fields() {
        let inbound =
            decode(r#"{"offer":"o","answer":"a","targetSocketGuid":"peer-2"}"#).unwrap();
        let expected = NegotiationUpdate::default()
            .with_offer("o")
            .with_answer("a")
            .with_target("peer-2");
        assert_eq!(inbound, Inbound::Negotiate(expected));
    }

    #[test]
    fn test_negotiation_ignores_other_type() {
        let inbound = decode(r#"{"type":"answer","answer":"a"}"#).unwrap();
        assert_eq!(
            inbound,
            Inbound::Negotiate(NegotiationUpdate::default().with_answer("a"))
        );
    }

    #[test]
    fn test_presence_mode_skips_negotiation_fields() {
        let err = Inbound::decode(r#"{"offer":"o"}"#, RelayMode::Presence).unwrap_err();
        assert!(matches!(err, Error::MissingType));

        let err = Inbound::decode(r#"{"type":"offer","offer":"o"}"#, RelayMode::Presence)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: offer");
    }

    #[test]
    fn test_unknown_type() {
        let err = decode(r#"{"type":"subscribe"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: subscribe");
    }

    #[test]
    fn test_type_is_case_sensitive() {
        let err = decode(r#"{"type":"PING"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: PING");
    }

    #[test]
    fn test_non_string_type() {
        let err = decode(r#"{"type":7}"#).unwrap_err();
        assert_eq!(err.to_string(), "Unknown message type: 7");
    }

    #[test]
    fn test_missing_type() {
        let err = decode(r#"{"content":"hello"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Message must have a 'type' property");
    }

    #[test]
    fn test_null_type_is_missing() {
        let err = decode(r#"{"type":null}"#).unwrap_err();
        assert!(matches!(err, Error::MissingType));
    }

    #[test]
    fn test_malformed_json() {
        let err = decode("{not json").unwrap_err();
        assert!(matches!(err, Error::InvalidJson { .. }));
        assert!(err.to_string().starts_with("Invalid JSON: "));
    }

    #[test]
    fn test_non_object_json() {
        let err = decode("[1,2,3]").unwrap_err();
        assert!(matches!(err, Error::InvalidMessage { .. }));
    }

    #[test]
    fn test_wrong_field_type() {
        let err = decode(r#"{"offer":42}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidMessage { .. }));
    }
}
