/**
 * Posts and the Feed
 *
 * Post creation, feed assembly (followed authors first, backfilled with the
 * rest), and the like toggle.
 */

pub mod db;
pub mod handlers;

pub use db::PostResponse;
