//! On-demand transcoding via the external encoder.
//!
//! Builds the encode command from a [`QualityProfile`]'s fixed parameters,
//! runs the encoder as a child process, and scans its diagnostic stream
//! for `time=`, `bitrate=` and `speed=` tokens to drive progress callbacks.

use std::path::PathBuf;
use std::time::Duration;

use reelgate_common::{Error, Result};

use crate::command::ToolCommand;
use crate::profiles::{OutputFormat, QualityProfile};
use crate::tools::ToolRegistry;

/// A single transcode invocation.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Source media file.
    pub input: PathBuf,
    /// Where the rendition is written.
    pub output: PathBuf,
    /// Target quality.
    pub quality: QualityProfile,
    /// Output container.
    pub format: OutputFormat,
    /// Optional start offset in seconds (trims the head).
    pub start_time: Option<f64>,
    /// Optional duration in seconds (trims the tail).
    pub duration: Option<f64>,
}

impl EncodeRequest {
    /// Encode `input` to `output` at `quality`, MP4 container, no trimming.
    pub fn new(input: PathBuf, output: PathBuf, quality: QualityProfile) -> Self {
        Self {
            input,
            output,
            quality,
            format: OutputFormat::Mp4,
            start_time: None,
            duration: None,
        }
    }
}

/// Progress stats parsed from the encoder's diagnostic stream.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    /// Always 0.0: percent-complete needs the source duration, which the
    /// encoder's stats line does not carry.
    pub percent: f64,
    /// Seconds of output produced so far.
    pub time_secs: f64,
    /// Current bitrate as reported, e.g. "511.1kbits/s".
    pub bitrate: Option<String>,
    /// Encode speed relative to realtime, e.g. "1.24x".
    pub speed: Option<String>,
}

/// Invokes the external encoder to produce quality-reduced renditions.
#[derive(Debug, Clone)]
pub struct Transcoder {
    tools: ToolRegistry,
    timeout: Duration,
}

impl Transcoder {
    /// Create a transcoder bounded by `timeout` per encode.
    pub fn new(tools: ToolRegistry, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    /// Transcode per the request, returning the path of the produced file.
    ///
    /// `quality == original` short-circuits: the input path is returned
    /// unchanged and no encoder runs.
    ///
    /// # Errors
    ///
    /// - [`Error::ToolNotFound`] if no encoder executable is available or
    ///   spawning it fails; callers fall back to streaming the original.
    /// - [`Error::ToolFailed`] on nonzero exit (message carries the bounded
    ///   stderr tail) or when the encode exceeds the timeout. The partial
    ///   output file, if any, is removed.
    pub async fn transcode(
        &self,
        req: &EncodeRequest,
        mut on_progress: impl FnMut(EncodeProgress),
    ) -> Result<PathBuf> {
        let Some(params) = req.quality.encode_params() else {
            return Ok(req.input.clone());
        };

        let ffmpeg = self.tools.require("ffmpeg")?;

        let mut cmd = ToolCommand::new(ffmpeg.path.clone());
        cmd.timeout(self.timeout);

        // Input trimming must precede -i for fast seeking.
        if let Some(start) = req.start_time {
            cmd.args(["-ss".to_string(), start.to_string()]);
        }
        cmd.arg("-i");
        cmd.arg(req.input.to_string_lossy().as_ref());

        cmd.args(["-c:v", "libx264", "-preset", "fast", "-crf", "23"]);
        cmd.args([
            "-maxrate".to_string(),
            format!("{}k", params.video_kbps),
            "-bufsize".to_string(),
            format!("{}k", params.video_kbps * 2),
        ]);
        cmd.args([
            "-vf".to_string(),
            format!("scale={}:force_original_aspect_ratio=decrease", params.scale),
        ]);
        cmd.args(["-c:a", "aac", "-b:a", params.audio_bitrate]);
        // Frontload container metadata so playback can start before the
        // download completes.
        cmd.args(["-movflags", "+faststart"]);

        if let Some(duration) = req.duration {
            cmd.args(["-t".to_string(), duration.to_string()]);
        }

        cmd.args(["-f", req.format.ext(), "-y"]);
        cmd.arg(req.output.to_string_lossy().as_ref());

        tracing::debug!(
            input = %req.input.display(),
            output = %req.output.display(),
            quality = %req.quality,
            "starting encode"
        );

        let run = cmd
            .execute_streaming(|line| {
                if let Some(progress) = parse_progress_line(line) {
                    on_progress(progress);
                }
            })
            .await;

        let output = match run {
            Ok(output) => output,
            Err(e) => {
                remove_partial(&req.output).await;
                return Err(e);
            }
        };

        if !output.status.success() {
            remove_partial(&req.output).await;
            return Err(Error::tool_failed(
                "ffmpeg",
                format!(
                    "exited with status {}: {}",
                    output.status, output.stderr_tail
                ),
            ));
        }

        if !tokio::fs::try_exists(&req.output).await.unwrap_or(false) {
            return Err(Error::tool_failed(
                "ffmpeg",
                format!(
                    "exited 0 but produced no output: {}",
                    output.stderr_tail
                ),
            ));
        }

        Ok(req.output.clone())
    }
}

/// Delete a partial output file left behind by a failed encode.
async fn remove_partial(path: &std::path::Path) {
    if tokio::fs::remove_file(path).await.is_ok() {
        tracing::debug!(path = %path.display(), "removed partial encode output");
    }
}

/// Parse one encoder stats line into progress values.
///
/// Stats lines look like:
/// `frame=  142 fps= 48 q=28.0 size=     512kB time=00:00:05.92 bitrate= 707.6kbits/s speed=1.98x`
///
/// Returns `None` for lines without a `time=` token. Percent-complete is
/// reported as zero; the total duration is unknown here.
pub fn parse_progress_line(line: &str) -> Option<EncodeProgress> {
    let time = token_value(line, "time=")?;
    let time_secs = parse_timestamp(time)?;

    Some(EncodeProgress {
        percent: 0.0,
        time_secs,
        bitrate: token_value(line, "bitrate=").map(|s| s.to_string()),
        speed: token_value(line, "speed=").map(|s| s.to_string()),
    })
}

/// Extract the value following `key`, skipping the spaces the encoder pads
/// its stats columns with.
fn token_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let idx = line.find(key)?;
    let rest = line[idx + key.len()..].trim_start();
    let end = rest
        .find(char::is_whitespace)
        .unwrap_or(rest.len());
    let value = &rest[..end];
    if value.is_empty() || value == "N/A" {
        None
    } else {
        Some(value)
    }
}

/// Parse an `HH:MM:SS.cc` timestamp into seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let mut parts = ts.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_stats_line() {
        let line = "frame=  142 fps= 48 q=28.0 size=     512kB time=00:00:05.92 bitrate= 707.6kbits/s speed=1.98x";
        let p = parse_progress_line(line).unwrap();
        assert_eq!(p.percent, 0.0);
        assert!((p.time_secs - 5.92).abs() < 1e-9);
        assert_eq!(p.bitrate.as_deref(), Some("707.6kbits/s"));
        assert_eq!(p.speed.as_deref(), Some("1.98x"));
    }

    #[test]
    fn parses_hours_and_minutes() {
        let line = "size= 10240kB time=01:02:03.50 bitrate=1000.0kbits/s speed=1.0x";
        let p = parse_progress_line(line).unwrap();
        assert!((p.time_secs - (3600.0 + 123.5)).abs() < 1e-9);
    }

    #[test]
    fn ignores_non_progress_lines() {
        assert!(parse_progress_line("Stream mapping:").is_none());
        assert!(parse_progress_line("  Metadata:").is_none());
        assert!(parse_progress_line("").is_none());
    }

    #[test]
    fn handles_na_values() {
        let line = "size=N/A time=00:00:01.00 bitrate=N/A speed=N/A";
        let p = parse_progress_line(line).unwrap();
        assert_eq!(p.bitrate, None);
        assert_eq!(p.speed, None);
        assert!((p.time_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_timestamp_is_skipped() {
        assert!(parse_progress_line("time=abc bitrate=1k speed=1x").is_none());
        assert!(parse_progress_line("time=00:01 speed=1x").is_none());
    }

    #[tokio::test]
    async fn original_quality_short_circuits() {
        let transcoder = Transcoder::new(ToolRegistry::empty(), Duration::from_secs(1));
        let req = EncodeRequest::new(
            PathBuf::from("/media/movie.mkv"),
            PathBuf::from("/cache/out.mp4"),
            QualityProfile::Original,
        );
        // No encoder is available, but original never needs one.
        let out = transcoder.transcode(&req, |_| {}).await.unwrap();
        assert_eq!(out, PathBuf::from("/media/movie.mkv"));
    }

    #[tokio::test]
    async fn missing_encoder_is_tool_not_found() {
        let transcoder = Transcoder::new(ToolRegistry::empty(), Duration::from_secs(1));
        let req = EncodeRequest::new(
            PathBuf::from("/media/movie.mkv"),
            PathBuf::from("/cache/out.mp4"),
            QualityProfile::P720,
        );
        let err = transcoder.transcode(&req, |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
