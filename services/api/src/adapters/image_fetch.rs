//! services/api/src/adapters/image_fetch.rs
//!
//! Downloads remote images (usually from our own storage bucket) and inlines
//! them as base64 for the multimodal chat request.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{header::CONTENT_TYPE, Client};
use study_assistant_core::domain::InlineImage;
use study_assistant_core::ports::{ImageFetcher, PortError, PortResult};
use study_assistant_core::prompt::resolve_media_type;

/// Images larger than this are refused rather than forwarded to the model.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

fn too_large(len: u64) -> PortError {
    PortError::Invalid(format!(
        "Image is at least {} bytes, the limit is {}",
        len, MAX_IMAGE_BYTES
    ))
}

#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> PortResult<InlineImage> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Image request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PortError::NotFound(format!(
                "Image host returned {} for {}",
                response.status(),
                url
            )));
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(declared_len) = response.content_length() {
            if declared_len > MAX_IMAGE_BYTES as u64 {
                return Err(too_large(declared_len));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to read image body: {}", e)))?
        {
            if bytes.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(too_large((bytes.len() + chunk.len()) as u64));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(PortError::Invalid("Image is empty".to_string()));
        }

        Ok(InlineImage {
            media_type: resolve_media_type(declared.as_deref()),
            data: BASE64_STANDARD.encode(&bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    enum Body {
        Sized(Vec<u8>),
        /// Announces this many bytes but never sends them.
        Declared(usize),
        /// Chunked transfer of this many bytes, no content-length.
        Streamed(usize),
    }

    /// Serves a single image response and returns its URL.
    async fn serve_once(body: Body) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;

            let head = "HTTP/1.1 200 OK\r\ncontent-type: image/png\r\nconnection: close\r\n";
            let _ = match body {
                Body::Sized(data) => {
                    let mut out = format!("{}content-length: {}\r\n\r\n", head, data.len())
                        .into_bytes();
                    out.extend_from_slice(&data);
                    socket.write_all(&out).await
                }
                Body::Declared(len) => {
                    socket
                        .write_all(format!("{}content-length: {}\r\n\r\n", head, len).as_bytes())
                        .await
                }
                Body::Streamed(len) => {
                    let mut result = socket
                        .write_all(format!("{}transfer-encoding: chunked\r\n\r\n", head).as_bytes())
                        .await;
                    let chunk = vec![0u8; 1024 * 1024];
                    let mut sent = 0;
                    while result.is_ok() && sent < len {
                        let n = chunk.len().min(len - sent);
                        let mut frame = format!("{:x}\r\n", n).into_bytes();
                        frame.extend_from_slice(&chunk[..n]);
                        frame.extend_from_slice(b"\r\n");
                        result = socket.write_all(&frame).await;
                        sent += n;
                    }
                    if result.is_ok() {
                        result = socket.write_all(b"0\r\n\r\n").await;
                    }
                    result
                }
            };
        });
        format!("http://{}/image.png", addr)
    }

    fn fetcher() -> HttpImageFetcher {
        HttpImageFetcher::new(Client::new())
    }

    #[tokio::test]
    async fn small_image_is_inlined_with_declared_type() {
        let url = serve_once(Body::Sized(b"png-bytes".to_vec())).await;

        let image = fetcher().fetch(&url).await.unwrap();

        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.data, BASE64_STANDARD.encode(b"png-bytes"));
    }

    #[tokio::test]
    async fn oversized_content_length_is_refused_before_reading() {
        let url = serve_once(Body::Declared(MAX_IMAGE_BYTES + 1)).await;

        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, PortError::Invalid(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn oversized_stream_is_cut_off_at_the_limit() {
        let url = serve_once(Body::Streamed(MAX_IMAGE_BYTES + 1)).await;

        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, PortError::Invalid(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn empty_body_is_invalid() {
        let url = serve_once(Body::Sized(Vec::new())).await;

        let err = fetcher().fetch(&url).await.unwrap_err();

        assert!(matches!(err, PortError::Invalid(_)), "got {:?}", err);
    }
}
