//! Services layer for vidtube
//!
//! Business logic per entity. Each operation resolves ids and ownership,
//! writes through the entity store or reads through the aggregation query
//! layer, and returns the value the route wraps in a response envelope.

pub mod comments;
pub mod likes;
pub mod owned;
pub mod playlists;
pub mod subscriptions;
pub mod toggle;
pub mod tweets;
pub mod users;
pub mod videos;

pub use toggle::{toggle, ToggleState, ToggleStore};
