//! HTTP server for vidtube

mod http;

pub use http::{run, AppState};
