//! JSON events exchanged over the realtime channel.
//!
//! Every frame is a text frame shaped `{"event": "<name>", "data": {...}}`.

use serde::{Deserialize, Serialize};
use sonic_rs::JsonValueTrait;
use thiserror::Error;

use crate::models::message::PublicMessage;

/// Events a client may send.
#[derive(Debug)]
pub enum ClientEvent {
    Authenticate(AuthenticateRequest),
    SendMessage(SendMessageRequest),
}

/// Identity claimed during the handshake. Anything missing or of the wrong
/// type comes through as `None`, so every bad handshake can be answered with
/// `auth_error`.
#[derive(Debug, Default)]
pub struct AuthenticateRequest {
    pub user_id: Option<i64>,
    pub username: Option<String>,
}

impl AuthenticateRequest {
    fn from_data(data: Option<&sonic_rs::Value>) -> Self {
        Self {
            user_id: data.and_then(|d| d.get("userId")).and_then(|v| v.as_i64()),
            username: data
                .and_then(|d| d.get("username"))
                .and_then(|v| v.as_str())
                .map(str::to_owned),
        }
    }
}

#[derive(Debug, Default)]
pub struct SendMessageRequest {
    pub message: String,
}

impl SendMessageRequest {
    fn from_data(data: Option<&sonic_rs::Value>) -> Self {
        Self {
            message: data
                .and_then(|d| d.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_owned(),
        }
    }
}

/// Why a client frame could not be turned into an event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    Json(#[from] sonic_rs::Error),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
}

/// The `{"event", "data"}` wrapper. `data` is only interpreted once the
/// event name is known.
#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Option<sonic_rs::Value>,
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated { success: bool },
    AuthError { message: String },
    NewMessage(PublicMessage),
    Error { message: String },
}

impl ServerEvent {
    pub fn auth_error(message: impl Into<String>) -> Self {
        ServerEvent::AuthError {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            message: message.into(),
        }
    }

    pub fn encode(&self) -> sonic_rs::Result<String> {
        sonic_rs::to_string(self)
    }
}

/// Decodes a text frame from a client.
pub fn decode(text: &str) -> Result<ClientEvent, ProtocolError> {
    let envelope: Envelope = sonic_rs::from_str(text)?;
    let data = envelope.data.as_ref();

    match envelope.event.as_str() {
        "authenticate" => Ok(ClientEvent::Authenticate(AuthenticateRequest::from_data(data))),
        "send_message" => Ok(ClientEvent::SendMessage(SendMessageRequest::from_data(data))),
        other => Err(ProtocolError::UnknownEvent(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn decodes_authenticate() {
        let event = decode(r#"{"event":"authenticate","data":{"userId":1,"username":"alice"}}"#)
            .unwrap();
        match event {
            ClientEvent::Authenticate(req) => {
                assert_eq!(req.user_id, Some(1));
                assert_eq!(req.username.as_deref(), Some("alice"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn authenticate_fields_may_be_missing() {
        let event = decode(r#"{"event":"authenticate","data":{}}"#).unwrap();
        match event {
            ClientEvent::Authenticate(req) => {
                assert!(req.user_id.is_none());
                assert!(req.username.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn authenticate_without_usable_data_still_decodes() {
        for frame in [
            r#"{"event":"authenticate"}"#,
            r#"{"event":"authenticate","data":null}"#,
            r#"{"event":"authenticate","data":"alice"}"#,
            r#"{"event":"authenticate","data":{"userId":"1","username":7}}"#,
        ] {
            match decode(frame).unwrap() {
                ClientEvent::Authenticate(req) => {
                    assert!(req.user_id.is_none(), "{}", frame);
                    assert!(req.username.is_none(), "{}", frame);
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn decodes_send_message() {
        let event = decode(r#"{"event":"send_message","data":{"message":"hi"}}"#).unwrap();
        assert!(matches!(event, ClientEvent::SendMessage(req) if req.message == "hi"));
    }

    #[test]
    fn rejects_unknown_event() {
        assert!(matches!(
            decode(r#"{"event":"shout","data":{"message":"hi"}}"#),
            Err(ProtocolError::UnknownEvent(name)) if name == "shout"
        ));
        assert!(matches!(decode("not json"), Err(ProtocolError::Json(_))));
        assert!(decode(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn new_message_wire_shape() {
        let event = ServerEvent::NewMessage(PublicMessage {
            username: "alice".into(),
            message: "hi".into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        });

        let encoded = event.encode().unwrap();
        let value: sonic_rs::Value = sonic_rs::from_str(&encoded).unwrap();
        assert_eq!(value["event"].as_str(), Some("new_message"));
        assert_eq!(value["data"]["username"].as_str(), Some("alice"));
        assert_eq!(value["data"]["message"].as_str(), Some("hi"));
        assert_eq!(value["data"]["created_at"].as_str(), Some("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn auth_events_wire_shape() {
        let ok = ServerEvent::Authenticated { success: true }.encode().unwrap();
        assert_eq!(ok, r#"{"event":"authenticated","data":{"success":true}}"#);

        let err = ServerEvent::auth_error("Invalid authentication data").encode().unwrap();
        assert_eq!(
            err,
            r#"{"event":"auth_error","data":{"message":"Invalid authentication data"}}"#
        );
    }
}
