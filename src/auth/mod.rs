/**
 * Authentication
 *
 * JWT session tokens and the signup/login/me handlers.
 */

pub mod handlers;
pub mod sessions;

pub use handlers::{get_me, login, logout, signup};
pub use sessions::{create_token, verify_token, Claims};
