/**
 * Authentication Handlers
 *
 * Handlers for user registration, login, logout, and the current-user
 * endpoint.
 */

pub mod login;
pub mod me;
pub mod signup;
pub mod types;

pub use login::{login, logout};
pub use me::get_me;
pub use signup::signup;
