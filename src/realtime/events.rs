/**
 * Gateway Event Types
 *
 * Wire-level events exchanged over the WebSocket gateway. Every frame is a
 * JSON object `{ "event": ..., "data": ... }`; event names follow the
 * client's vocabulary exactly.
 */

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events a client may send to the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Join an extra room (group or cross-tab delivery)
    #[serde(rename = "joinRoom")]
    JoinRoom { room: String },

    /// Request the current online user set
    #[serde(rename = "getOnlineUsers")]
    GetOnlineUsers,

    /// The client started typing to a specific counterpart
    #[serde(rename = "typing")]
    Typing { to: Uuid },

    /// The client stopped typing
    #[serde(rename = "stopTyping")]
    StopTyping { to: Uuid },
}

/// Events the gateway pushes to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// A new message for one of the connection's rooms; the payload is the
    /// full message JSON as returned by the HTTP API
    #[serde(rename = "receiveMessage")]
    ReceiveMessage(serde_json::Value),

    /// Reply to `getOnlineUsers`
    #[serde(rename = "onlineUsers")]
    OnlineUsers(Vec<Uuid>),

    /// A user came online
    #[serde(rename = "user_online")]
    UserOnline(Uuid),

    /// A user went offline
    #[serde(rename = "user_offline")]
    UserOffline(Uuid),

    /// The counterpart read the conversation
    #[serde(rename = "messages_read")]
    MessagesRead { by: Uuid, from: Uuid },

    /// Audible notification trigger for the receiver of a new message
    #[serde(rename = "playNotification")]
    PlayNotification { from: Uuid },

    /// A counterpart started typing
    #[serde(rename = "typing")]
    Typing { from: Uuid },

    /// A counterpart stopped typing
    #[serde(rename = "stopTyping")]
    StopTyping { from: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_client_event_names() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"joinRoom","data":{"room":"abc"}}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinRoom {
                room: "abc".to_string()
            }
        );

        let event: ClientEvent = serde_json::from_str(r#"{"event":"getOnlineUsers"}"#).unwrap();
        assert_eq!(event, ClientEvent::GetOnlineUsers);
    }

    #[test]
    fn test_typing_events_carry_counterpart() {
        let to = Uuid::new_v4();
        let json = serde_json::to_string(&ClientEvent::Typing { to }).unwrap();
        assert!(json.contains(r#""event":"typing""#));
        let back: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ClientEvent::Typing { to });
    }

    #[test]
    fn test_server_event_names() {
        let user = Uuid::new_v4();
        let json = serde_json::to_string(&ServerEvent::UserOnline(user)).unwrap();
        assert!(json.contains(r#""event":"user_online""#));

        let json = serde_json::to_string(&ServerEvent::MessagesRead {
            by: user,
            from: user,
        })
        .unwrap();
        assert!(json.contains(r#""event":"messages_read""#));

        let json = serde_json::to_string(&ServerEvent::PlayNotification { from: user }).unwrap();
        assert!(json.contains(r#""event":"playNotification""#));

        let json =
            serde_json::to_string(&ServerEvent::ReceiveMessage(serde_json::json!({"text": "hi"})))
                .unwrap();
        assert!(json.contains(r#""event":"receiveMessage""#));
    }

    #[test]
    fn test_server_event_roundtrip() {
        let event = ServerEvent::OnlineUsers(vec![Uuid::new_v4(), Uuid::new_v4()]);
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_receive_message_roundtrip(text in ".*") {
            let event = ServerEvent::ReceiveMessage(serde_json::json!({ "text": text }));
            let json = serde_json::to_string(&event).unwrap();
            let back: ServerEvent = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(event, back);
        }
    }
}
