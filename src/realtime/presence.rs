/**
 * Presence Registry
 *
 * In-memory registry of connected users, keyed by user ID. A user may hold
 * several simultaneous connections (multiple tabs); the registry counts them
 * and reports online/offline transitions only on the first connect and the
 * last disconnect.
 *
 * The registry is owned by the gateway. Other components query it through
 * `is_online` / `online_users`; the map itself is never handed out.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Connection-counting presence registry
#[derive(Clone, Default)]
pub struct PresenceRegistry {
    online: Arc<Mutex<HashMap<Uuid, usize>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection for a user.
    ///
    /// Returns `true` when this is the user's first live connection, i.e.
    /// the user just came online.
    pub fn connect(&self, user_id: Uuid) -> bool {
        let mut online = self.online.lock().unwrap();
        let count = online.entry(user_id).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Record a closed connection for a user.
    ///
    /// Returns `true` when this was the user's last live connection, i.e.
    /// the user just went offline.
    pub fn disconnect(&self, user_id: Uuid) -> bool {
        let mut online = self.online.lock().unwrap();
        match online.get_mut(&user_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                online.remove(&user_id);
                true
            }
            None => false,
        }
    }

    /// Is the user currently connected?
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.online.lock().unwrap().contains_key(&user_id)
    }

    /// Snapshot of all currently connected user IDs
    pub fn online_users(&self) -> Vec<Uuid> {
        self.online.lock().unwrap().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_marks_online() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();

        assert!(!registry.is_online(user));
        assert!(registry.connect(user));
        assert!(registry.is_online(user));
    }

    #[test]
    fn test_second_connection_is_not_a_transition() {
        let registry = PresenceRegistry::new();
        let user = Uuid::new_v4();

        assert!(registry.connect(user));
        assert!(!registry.connect(user));

        // First disconnect leaves the user online (one tab still open)
        assert!(!registry.disconnect(user));
        assert!(registry.is_online(user));

        // Last disconnect is the offline transition
        assert!(registry.disconnect(user));
        assert!(!registry.is_online(user));
    }

    #[test]
    fn test_disconnect_unknown_user_is_noop() {
        let registry = PresenceRegistry::new();
        assert!(!registry.disconnect(Uuid::new_v4()));
    }

    #[test]
    fn test_online_users_snapshot() {
        let registry = PresenceRegistry::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        registry.connect(a);
        registry.connect(b);

        let mut online = registry.online_users();
        online.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(online, expected);

        registry.disconnect(a);
        assert_eq!(registry.online_users(), vec![b]);
    }
}
