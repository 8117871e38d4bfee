//! Chunked file serving with HTTP range support.
//!
//! Reads are done in 64KB chunks via `ReaderStream` so memory stays
//! bounded regardless of file size. Ranged responses seek to the start
//! offset and wrap the file in a `Take` so exactly the declared number of
//! bytes is emitted, in ascending offset order.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use reelgate_common::paths::content_type_for;
use reelgate_common::{Error, Result};

use super::range::ByteRange;

const CHUNK_SIZE: usize = 64 * 1024;

/// Serve a file, applying the Range header when present.
///
/// Emits 200 for full responses, 206 for ranged ones, and 416 (with
/// `Content-Range: bytes */{size}` and no body) when the range cannot be
/// satisfied. A 416 is terminal; there is no fallback.
pub async fn serve_file(path: &std::path::Path, range_header: Option<&str>) -> Result<Response> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| Error::not_found(path.display()))?;

    let file_size = metadata.len();
    let content_type = content_type_for(path);

    let range = match range_header {
        None => None,
        Some(value) => match ByteRange::parse(value, file_size) {
            Ok(range) => Some(range),
            Err(Error::RangeNotSatisfiable(reason)) => {
                tracing::debug!(path = %path.display(), %reason, "unsatisfiable range");
                return Ok((
                    StatusCode::RANGE_NOT_SATISFIABLE,
                    [(
                        header::CONTENT_RANGE.as_str(),
                        format!("bytes */{file_size}"),
                    )],
                    Body::empty(),
                )
                    .into_response());
            }
            Err(e) => return Err(e),
        },
    };

    match range {
        Some(range) => {
            let mut file = tokio::fs::File::open(path)
                .await
                .map_err(|_| Error::not_found(path.display()))?;
            file.seek(std::io::SeekFrom::Start(range.start))
                .await
                .map_err(|e| Error::internal(format!("seek failed: {e}")))?;

            // Wrap in a Take to limit reads to exactly the range length.
            let limited = file.take(range.length());
            let stream = ReaderStream::with_capacity(limited, CHUNK_SIZE);
            let body = Body::from_stream(stream);

            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE.as_str(), content_type.to_string()),
                    (header::CONTENT_RANGE.as_str(), range.content_range()),
                    (
                        header::CONTENT_LENGTH.as_str(),
                        range.length().to_string(),
                    ),
                    (header::ACCEPT_RANGES.as_str(), "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
        None => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|_| Error::not_found(path.display()))?;

            let stream = ReaderStream::with_capacity(file, CHUNK_SIZE);
            let body = Body::from_stream(stream);

            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE.as_str(), content_type.to_string()),
                    (header::CONTENT_LENGTH.as_str(), file_size.to_string()),
                    (header::ACCEPT_RANGES.as_str(), "bytes".to_string()),
                ],
                body,
            )
                .into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_file(contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("media.mp4");
        tokio::fs::write(&path, contents).await.unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn full_response_headers() {
        let (_dir, path) = temp_file(&[7u8; 1000]).await;
        let resp = serve_file(&path, None).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "video/mp4");
        assert_eq!(resp.headers()["content-length"], "1000");
        assert_eq!(resp.headers()["accept-ranges"], "bytes");
    }

    #[tokio::test]
    async fn ranged_response_headers() {
        let (_dir, path) = temp_file(&[7u8; 1000]).await;
        let resp = serve_file(&path, Some("bytes=0-99")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(resp.headers()["content-range"], "bytes 0-99/1000");
        assert_eq!(resp.headers()["content-length"], "100");
    }

    #[tokio::test]
    async fn unsatisfiable_range_is_416_with_no_body() {
        let (_dir, path) = temp_file(&[7u8; 1000]).await;
        let resp = serve_file(&path, Some("bytes=900-1500")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(resp.headers()["content-range"], "bytes */1000");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = serve_file(std::path::Path::new("/nonexistent/x.mp4"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
