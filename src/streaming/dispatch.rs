//! The stream dispatcher: the `GET /api/stream` handler.
//!
//! Resolves and authorizes the requested path, decides between serving the
//! original file and a transcoded rendition, and emits the correctly
//! framed response. Transcoding is a best-effort enhancement: when the
//! encoder is missing or fails, the original file is streamed instead,
//! and only path, existence, and range errors reach the client.

use std::path::{Path, PathBuf};

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use serde::Deserialize;

use reelgate_av::{EncodeRequest, OutputFormat, QualityProfile, Transcoder};
use reelgate_common::paths::is_video_file;
use reelgate_common::resolve::resolve;
use reelgate_common::Error;

use crate::config::TranscodingConfig;
use crate::server::error::AppError;
use crate::server::AppContext;

use super::serve::serve_file;

/// Query parameters for the stream endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// Logical path of the media file.
    pub path: Option<String>,
    /// Requested quality: `auto`, `original`, `1080p`, `720p`, `480p`, `360p`.
    pub quality: Option<String>,
}

/// GET /api/stream?path=<logical>&quality=<auto|original|1080p|720p|480p|360p>
pub async fn stream(
    State(ctx): State<AppContext>,
    Query(params): Query<StreamParams>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let logical = params
        .path
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::validation("missing path parameter"))?;

    let media = resolve(logical, &ctx.mappings, &ctx.allowed_roots)?;
    let quality = resolve_quality(params.quality.as_deref(), &ctx.config.transcoding)?;

    // 404 on stat failure before any encoder work.
    tokio::fs::metadata(media.path())
        .await
        .map_err(|_| Error::not_found(logical))?;

    let mut serve_path = media.into_path();

    if wants_transcode(&serve_path, quality, &ctx.config.transcoding) {
        match transcode_rendition(&ctx, &serve_path, quality).await {
            Ok(rendition) => serve_path = rendition,
            Err(e @ (Error::ToolNotFound { .. } | Error::ToolFailed { .. })) => {
                tracing::warn!(
                    error = %e,
                    path = %serve_path.display(),
                    %quality,
                    "transcode unavailable, serving original file"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    let range_header = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    Ok(serve_file(&serve_path, range_header.as_deref()).await?)
}

/// Map the `quality` query parameter to a profile.
///
/// No parameter streams the original; `auto` defers to the configured
/// default.
fn resolve_quality(
    param: Option<&str>,
    transcoding: &TranscodingConfig,
) -> Result<QualityProfile, Error> {
    match param {
        None => Ok(QualityProfile::Original),
        Some("auto") => Ok(transcoding.default_quality),
        Some(value) => value.parse(),
    }
}

/// Transcode only streamable video, only when enabled, and never for
/// original quality.
fn wants_transcode(path: &Path, quality: QualityProfile, transcoding: &TranscodingConfig) -> bool {
    transcoding.enabled && quality != QualityProfile::Original && is_video_file(path)
}

/// Fetch the rendition from the cache, encoding it first on a miss.
async fn transcode_rendition(
    ctx: &AppContext,
    source: &Path,
    quality: QualityProfile,
) -> Result<PathBuf, Error> {
    let transcoder = Transcoder::new(
        (*ctx.tools).clone(),
        ctx.config.transcoding.encode_timeout(),
    );
    let input = source.to_path_buf();

    ctx.renditions
        .get_or_encode(source, quality, OutputFormat::Mp4, move |output| async move {
            let request = EncodeRequest::new(input, output, quality);
            transcoder
                .transcode(&request, |progress| {
                    tracing::debug!(
                        time_secs = progress.time_secs,
                        bitrate = progress.bitrate.as_deref().unwrap_or("?"),
                        speed = progress.speed.as_deref().unwrap_or("?"),
                        "encode progress"
                    );
                })
                .await
                .map(|_| ())
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_quality_streams_original() {
        let transcoding = TranscodingConfig::default();
        assert_eq!(
            resolve_quality(None, &transcoding).unwrap(),
            QualityProfile::Original
        );
    }

    #[test]
    fn auto_uses_configured_default() {
        let transcoding = TranscodingConfig {
            default_quality: QualityProfile::P480,
            ..TranscodingConfig::default()
        };
        assert_eq!(
            resolve_quality(Some("auto"), &transcoding).unwrap(),
            QualityProfile::P480
        );
    }

    #[test]
    fn explicit_quality_is_parsed() {
        let transcoding = TranscodingConfig::default();
        assert_eq!(
            resolve_quality(Some("1080p"), &transcoding).unwrap(),
            QualityProfile::P1080
        );
        assert!(resolve_quality(Some("4k"), &transcoding).is_err());
    }

    #[test]
    fn transcode_decision() {
        let enabled = TranscodingConfig::default();
        let disabled = TranscodingConfig {
            enabled: false,
            ..TranscodingConfig::default()
        };
        let video = Path::new("/media/movie.mkv");
        let subtitle = Path::new("/media/movie.srt");

        assert!(wants_transcode(video, QualityProfile::P720, &enabled));
        assert!(!wants_transcode(video, QualityProfile::Original, &enabled));
        assert!(!wants_transcode(video, QualityProfile::P720, &disabled));
        assert!(!wants_transcode(subtitle, QualityProfile::P720, &enabled));
    }
}
