/**
 * Gateway Rooms and Broadcasting
 *
 * The gateway hub: per-room `tokio::sync::broadcast` channels plus the
 * presence registry. Every connected user is subscribed to a room keyed by
 * their own user ID; connections may subscribe to extra rooms, and presence
 * transitions go out on a global channel every connection listens to.
 *
 * Rooms are created lazily on first subscription or emit, and rooms whose
 * subscribers have all disconnected are dropped by the periodic cleanup
 * task (see `server::init`).
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::realtime::events::ServerEvent;
use crate::realtime::presence::PresenceRegistry;

/// Per-room channel capacity. A slow consumer past this many buffered events
/// observes a lag error and skips ahead.
const ROOM_CHANNEL_CAPACITY: usize = 100;

/// Global channel capacity (presence events fan out to every connection).
const GLOBAL_CHANNEL_CAPACITY: usize = 1000;

/// The real-time gateway hub
///
/// Cheap to clone; all clones share the same rooms and presence registry.
#[derive(Clone)]
pub struct Gateway {
    rooms: Arc<Mutex<HashMap<String, broadcast::Sender<ServerEvent>>>>,
    global: broadcast::Sender<ServerEvent>,
    presence: PresenceRegistry,
}

impl Gateway {
    pub fn new() -> Self {
        let (global, _) = broadcast::channel(GLOBAL_CHANNEL_CAPACITY);
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            global,
            presence: PresenceRegistry::new(),
        }
    }

    /// The presence registry (query interface only)
    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    /// Subscribe to a room, creating it if needed
    pub fn subscribe_room(&self, room: &str) -> broadcast::Receiver<ServerEvent> {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Subscribe to the global channel (presence events)
    pub fn subscribe_global(&self) -> broadcast::Receiver<ServerEvent> {
        self.global.subscribe()
    }

    /// Emit an event to all subscribers of a room.
    ///
    /// Returns the number of subscribers that received the event; 0 when the
    /// room does not exist or nobody is listening.
    pub fn emit_to_room(&self, room: &str, event: ServerEvent) -> usize {
        let sender = self.rooms.lock().unwrap().get(room).cloned();
        match sender {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Emit an event to a user's own room
    pub fn emit_to_user(&self, user_id: Uuid, event: ServerEvent) -> usize {
        self.emit_to_room(&user_id.to_string(), event)
    }

    /// Broadcast an event to every connected client
    pub fn broadcast_all(&self, event: ServerEvent) -> usize {
        match self.global.send(event) {
            Ok(count) => count,
            Err(_) => {
                // No subscribers, that's okay
                tracing::debug!("[Gateway] No subscribers to receive event");
                0
            }
        }
    }

    /// Drop rooms with no live subscribers
    pub fn cleanup_inactive_rooms(&self) {
        self.rooms
            .lock()
            .unwrap()
            .retain(|_, sender| sender.receiver_count() > 0);
    }

    /// Number of subscribers in a room (for logging)
    pub fn room_subscriber_count(&self, room: &str) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_to_room_with_subscriber() {
        let gateway = Gateway::new();
        let user = Uuid::new_v4();

        let mut rx = gateway.subscribe_room(&user.to_string());
        let delivered = gateway.emit_to_user(user, ServerEvent::PlayNotification { from: user });
        assert_eq!(delivered, 1);

        let event = rx.recv().await.unwrap();
        assert_eq!(event, ServerEvent::PlayNotification { from: user });
    }

    #[tokio::test]
    async fn test_emit_to_missing_room_is_dropped() {
        let gateway = Gateway::new();
        let delivered = gateway.emit_to_room("nobody-here", ServerEvent::OnlineUsers(vec![]));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_broadcast_all_reaches_every_subscriber() {
        let gateway = Gateway::new();
        let mut rx1 = gateway.subscribe_global();
        let mut rx2 = gateway.subscribe_global();

        let user = Uuid::new_v4();
        let delivered = gateway.broadcast_all(ServerEvent::UserOnline(user));
        assert_eq!(delivered, 2);

        assert_eq!(rx1.recv().await.unwrap(), ServerEvent::UserOnline(user));
        assert_eq!(rx2.recv().await.unwrap(), ServerEvent::UserOnline(user));
    }

    #[tokio::test]
    async fn test_cleanup_drops_empty_rooms() {
        let gateway = Gateway::new();
        {
            let _rx = gateway.subscribe_room("transient");
            assert_eq!(gateway.room_subscriber_count("transient"), 1);
        }
        gateway.cleanup_inactive_rooms();
        assert_eq!(gateway.room_subscriber_count("transient"), 0);
        assert!(gateway.rooms.lock().unwrap().is_empty());
    }
}
