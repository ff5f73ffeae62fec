/**
 * Real-time Gateway
 *
 * Authenticated WebSocket push channel for message delivery, read receipts,
 * typing indicators, and online presence.
 *
 * # Architecture
 *
 * - **`events`** - the wire-level event types (client -> server and
 *   server -> client)
 * - **`presence`** - in-memory registry of connected users, owned by the
 *   gateway and queried by the rest of the app only through its methods
 * - **`rooms`** - per-room broadcast channels; every user has a room keyed
 *   by their user ID, and connections may join extra rooms
 * - **`subscription`** - the WebSocket handshake and per-connection loop
 *
 * Presence state lives only in process memory and is lost on restart;
 * presence is best-effort, not durable.
 */

pub mod events;
pub mod presence;
pub mod rooms;
pub mod subscription;

pub use events::{ClientEvent, ServerEvent};
pub use presence::PresenceRegistry;
pub use rooms::Gateway;
pub use subscription::handle_gateway_upgrade;
