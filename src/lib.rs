//! vidtube - REST backend for a video-sharing platform
//!
//! Users publish videos, comment, like, subscribe to channels, post short
//! text tweets and curate playlists.
//!
//! ## Layers
//!
//! - **db**: MongoDB collections, schemas and typed update builders
//! - **query**: aggregation pipelines, read views and pagination
//! - **services**: the operations behind each endpoint, including the
//!   toggle engine for likes and subscriptions
//! - **auth**: password hashing, JWT sessions, cookies and ownership checks
//! - **media**: multipart uploads and the Cloudinary-compatible media host
//! - **routes** / **server**: hyper http1 server and path dispatch

pub mod auth;
pub mod config;
pub mod db;
pub mod media;
pub mod query;
pub mod routes;
pub mod server;
pub mod services;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, VidtubeError};
