//! Shared types for vidtube

pub mod error;
pub mod response;

pub use error::{Result, VidtubeError};
pub use response::{ApiResponse, ErrorBody};
