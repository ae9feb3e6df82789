//! Cloudinary-compatible media host client
//!
//! Uploads are signed with the account secret (sha256 over the sorted
//! parameters) and streamed from the spooled temp file; deletes go through
//! the admin API with basic auth.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::MediaArgs;
use crate::media::{public_id_from_url, MediaStore, ResourceKind, TempUpload, UploadedAsset};
use crate::types::{Result, VidtubeError};

/// Upload response fields we rely on
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    public_id: String,
    #[serde(default)]
    duration: Option<f64>,
}

/// Client for a Cloudinary-compatible REST API
#[derive(Clone)]
pub struct CloudinaryClient {
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    http_client: reqwest::Client,
    request_timeout: Duration,
    upload_timeout: Duration,
}

impl CloudinaryClient {
    /// Create a client
    ///
    /// Uploads are bounded by `upload_timeout`, every other request and
    /// connection setup by `timeout`.
    pub fn new(config: &MediaArgs, timeout: Duration, upload_timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("vidtube/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VidtubeError::Config(format!("Failed to build media client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            http_client,
            request_timeout: timeout,
            upload_timeout,
        })
    }

    fn upload_url(&self, kind: ResourceKind) -> String {
        format!("{}/v1_1/{}/{}/upload", self.base_url, self.cloud_name, kind)
    }

    fn delete_url(&self, kind: ResourceKind) -> String {
        format!(
            "{}/v1_1/{}/resources/{}/upload",
            self.base_url, self.cloud_name, kind
        )
    }

    /// Signature over `key=value` pairs sorted by key, joined with `&`,
    /// followed by the secret
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let to_sign = sorted
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl MediaStore for CloudinaryClient {
    async fn upload(&self, file: &TempUpload, kind: ResourceKind) -> Result<UploadedAsset> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("timestamp", timestamp.clone())]);

        let spooled = tokio::fs::File::open(file.path()).await?;
        let mut part = reqwest::multipart::Part::stream_with_length(spooled, file.size())
            .file_name(file.file_name().to_string());
        if let Some(content_type) = file.content_type() {
            part = part
                .mime_str(content_type)
                .map_err(|e| VidtubeError::InvalidInput(format!("Invalid content type: {}", e)))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        debug!(field = %file.field(), size = file.size(), kind = %kind, "Uploading asset");

        let response = self
            .http_client
            .post(self.upload_url(kind))
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VidtubeError::Media(format!(
                "Upload rejected with HTTP {}: {}",
                status, body
            )));
        }

        let uploaded: UploadResponse = response.json().await?;
        let url = uploaded
            .secure_url
            .or(uploaded.url)
            .ok_or_else(|| VidtubeError::Media("Upload response without URL".into()))?;

        info!(public_id = %uploaded.public_id, "Asset uploaded");

        Ok(UploadedAsset {
            url,
            public_id: uploaded.public_id,
            duration: uploaded.duration,
        })
    }

    async fn delete(&self, urls: &[String], kind: ResourceKind) -> Result<()> {
        let kind = match kind {
            ResourceKind::Auto => ResourceKind::Image,
            other => other,
        };

        let query: Vec<(&str, String)> = urls
            .iter()
            .filter_map(|url| public_id_from_url(url))
            .map(|id| ("public_ids[]", id))
            .collect();

        if query.is_empty() {
            return Ok(());
        }

        let response = self
            .http_client
            .delete(self.delete_url(kind))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .timeout(self.request_timeout)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VidtubeError::Media(format!(
                "Delete rejected with HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MultipartForm, UploadLimits};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client_for(base_url: &str) -> CloudinaryClient {
        CloudinaryClient::new(
            &MediaArgs {
                cloud_name: "demo".into(),
                api_key: "1234".into(),
                api_secret: "abcd".into(),
                base_url: base_url.into(),
            },
            Duration::from_secs(5),
            Duration::from_secs(600),
        )
        .unwrap()
    }

    fn client() -> CloudinaryClient {
        client_for("https://api.cloudinary.com/")
    }

    async fn spooled(payload: &str) -> TempUpload {
        let boundary = "X-MEDIA-TEST";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"videoFile\"; filename=\"clip.mp4\"\r\nContent-Type: video/mp4\r\n\r\n{p}\r\n--{b}--\r\n",
            b = boundary,
            p = payload
        );
        let stream = futures::stream::iter(vec![Ok::<_, std::io::Error>(bytes::Bytes::from(body))]);
        let limits = UploadLimits {
            max_file_bytes: 1024,
            tmp_dir: None,
        };
        let mut form = MultipartForm::parse(stream, boundary, &limits).await.unwrap();
        form.take_file("videoFile").unwrap()
    }

    #[test]
    fn test_upload_deadline_is_separate() {
        let client = client();
        assert_eq!(client.request_timeout, Duration::from_secs(5));
        assert_eq!(client.upload_timeout, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_upload_streams_spooled_file() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let host = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            while !received.ends_with(b"--\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }

            let json = r#"{"secure_url":"https://cdn.example/demo/video/upload/v1/clip.mp4","public_id":"clip","duration":12.5}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                json.len(),
                json
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&received).into_owned()
        });

        let file = spooled("frame-data-0123").await;
        let client = client_for(&format!("http://{}", addr));
        let asset = client.upload(&file, ResourceKind::Video).await.unwrap();

        assert_eq!(asset.public_id, "clip");
        assert_eq!(asset.duration, Some(12.5));

        let request = host.await.unwrap();
        assert!(request.starts_with("POST /v1_1/demo/video/upload"));
        assert!(request.contains("frame-data-0123"));
        assert!(request.contains("name=\"signature\""));
    }

    #[test]
    fn test_endpoint_urls() {
        let client = client();
        assert_eq!(
            client.upload_url(ResourceKind::Auto),
            "https://api.cloudinary.com/v1_1/demo/auto/upload"
        );
        assert_eq!(
            client.delete_url(ResourceKind::Video),
            "https://api.cloudinary.com/v1_1/demo/resources/video/upload"
        );
    }

    #[test]
    fn test_signature_sorts_parameters() {
        let client = client();
        let a = client.sign(&[("timestamp", "1".into()), ("folder", "x".into())]);
        let b = client.sign(&[("folder", "x".into()), ("timestamp", "1".into())]);
        assert_eq!(a, b);

        let mut hasher = Sha256::new();
        hasher.update(b"folder=x&timestamp=1abcd");
        assert_eq!(a, hex::encode(hasher.finalize()));
    }
}
