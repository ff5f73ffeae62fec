/**
 * Backend Error Types
 *
 * This module defines the error type used by HTTP handlers and its
 * conversion into HTTP responses.
 */

pub mod types;

pub use types::ApiError;
