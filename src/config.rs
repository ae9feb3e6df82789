//! Configuration for vidtube
//!
//! CLI arguments and environment variable handling using clap. Everything is
//! resolved once at startup and handed to the store and media client
//! constructors; nothing reads the environment after that.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEV_ACCESS_SECRET: &str = "dev-only-insecure-access-token-secret";
const DEV_REFRESH_SECRET: &str = "dev-only-insecure-refresh-token-secret";

/// Minimum accepted length for token signing secrets
pub const MIN_SECRET_LEN: usize = 32;

/// vidtube - video sharing REST backend
#[derive(Parser, Debug, Clone)]
#[command(name = "vidtube")]
#[command(about = "REST backend for videos, channels, comments, likes, tweets and playlists")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8000")]
    pub listen: SocketAddr,

    /// Enable development mode (insecure default secrets, verbose errors)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "vidtube")]
    pub mongodb_db: String,

    /// Secret used to sign access tokens (required in production)
    #[arg(long, env = "ACCESS_TOKEN_SECRET")]
    pub access_token_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY_SECONDS", default_value = "86400")]
    pub access_token_expiry_seconds: u64,

    /// Secret used to sign refresh tokens (required in production)
    #[arg(long, env = "REFRESH_TOKEN_SECRET")]
    pub refresh_token_secret: Option<String>,

    /// Refresh token lifetime in seconds
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY_SECONDS", default_value = "864000")]
    pub refresh_token_expiry_seconds: u64,

    /// Media host configuration
    #[command(flatten)]
    pub media: MediaArgs,

    /// Allowed CORS origins, comma-separated; `*` allows any origin without credentials
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Deadline for every database and media host call, in milliseconds
    #[arg(long, env = "DEPENDENCY_TIMEOUT_MS", default_value = "10000")]
    pub dependency_timeout_ms: u64,

    /// Deadline for relaying one upload to the media host, in milliseconds
    #[arg(long, env = "MEDIA_UPLOAD_TIMEOUT_MS", default_value = "600000")]
    pub media_upload_timeout_ms: u64,

    /// Upper bound for the `limit` query parameter on paginated endpoints
    #[arg(long, env = "MAX_PAGE_LIMIT", default_value = "100")]
    pub max_page_limit: u32,

    /// Maximum accepted size of a single uploaded file
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "209715200")]
    pub max_upload_bytes: u64,

    /// Directory for temporary upload files (system temp dir when unset)
    #[arg(long, env = "UPLOAD_TMP_DIR")]
    pub upload_tmp_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

/// Media host (Cloudinary-compatible) configuration
#[derive(Parser, Debug, Clone)]
pub struct MediaArgs {
    /// Cloud name of the media host account
    #[arg(long, env = "CLOUDINARY_CLOUD_NAME", default_value = "")]
    pub cloud_name: String,

    /// API key of the media host account
    #[arg(long, env = "CLOUDINARY_API_KEY", default_value = "")]
    pub api_key: String,

    /// API secret of the media host account
    #[arg(long, env = "CLOUDINARY_API_SECRET", default_value = "")]
    pub api_secret: String,

    /// Base URL of the media host API
    #[arg(long, env = "CLOUDINARY_BASE_URL", default_value = "https://api.cloudinary.com")]
    pub base_url: String,
}

impl Args {
    /// Effective access token secret (insecure default in dev mode)
    pub fn access_secret(&self) -> String {
        self.access_token_secret
            .clone()
            .unwrap_or_else(|| DEV_ACCESS_SECRET.to_string())
    }

    /// Effective refresh token secret (insecure default in dev mode)
    pub fn refresh_secret(&self) -> String {
        self.refresh_token_secret
            .clone()
            .unwrap_or_else(|| DEV_REFRESH_SECRET.to_string())
    }

    pub fn dependency_timeout(&self) -> Duration {
        Duration::from_millis(self.dependency_timeout_ms)
    }

    pub fn media_upload_timeout(&self) -> Duration {
        Duration::from_millis(self.media_upload_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            for (name, secret) in [
                ("ACCESS_TOKEN_SECRET", &self.access_token_secret),
                ("REFRESH_TOKEN_SECRET", &self.refresh_token_secret),
            ] {
                match secret {
                    None => return Err(format!("{} is required in production mode", name)),
                    Some(s) if s.len() < MIN_SECRET_LEN => {
                        return Err(format!(
                            "{} must be at least {} characters",
                            name, MIN_SECRET_LEN
                        ))
                    }
                    Some(_) => {}
                }
            }

            if self.media.cloud_name.is_empty()
                || self.media.api_key.is_empty()
                || self.media.api_secret.is_empty()
            {
                return Err("CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET are required in production mode".to_string());
            }
        }

        if self.access_token_secret.is_some()
            && self.access_token_secret == self.refresh_token_secret
        {
            return Err("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ".to_string());
        }

        if self.max_page_limit == 0 {
            return Err("MAX_PAGE_LIMIT must be at least 1".to_string());
        }

        if self.dependency_timeout_ms == 0 {
            return Err("DEPENDENCY_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.media_upload_timeout_ms < self.dependency_timeout_ms {
            return Err(
                "MEDIA_UPLOAD_TIMEOUT_MS must not be shorter than DEPENDENCY_TIMEOUT_MS".to_string(),
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["vidtube"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_dev_mode_defaults_validate() {
        let args = parse(&["--dev-mode"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.max_page_limit, 100);
        assert_eq!(args.dependency_timeout(), Duration::from_secs(10));
        assert_eq!(args.media_upload_timeout(), Duration::from_secs(600));
        assert_eq!(args.cors_origin, "*");
        assert_ne!(args.access_secret(), args.refresh_secret());
    }

    #[test]
    fn test_production_requires_secrets() {
        let args = parse(&[]);
        let err = args.validate().unwrap_err();
        assert!(err.contains("ACCESS_TOKEN_SECRET"));
    }

    #[test]
    fn test_production_rejects_short_secret() {
        let args = parse(&[
            "--access-token-secret",
            "short",
            "--refresh-token-secret",
            "refresh-secret-that-is-at-least-32-characters",
        ]);
        assert!(args.validate().unwrap_err().contains("at least"));
    }

    #[test]
    fn test_production_with_full_config() {
        let args = parse(&[
            "--access-token-secret",
            "access-secret-that-is-at-least-32-characters",
            "--refresh-token-secret",
            "refresh-secret-that-is-at-least-32-characters",
            "--cloud-name",
            "demo",
            "--api-key",
            "key",
            "--api-secret",
            "secret",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        let args = parse(&["--dev-mode", "--max-page-limit", "0"]);
        assert!(args.validate().is_err());
    }
}
