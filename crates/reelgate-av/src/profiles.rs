//! Quality profiles and output formats for transcoded renditions.
//!
//! Each profile maps to a fixed set of encode parameters. The sets are
//! deliberately immutable: the rendition cache keys on the profile label,
//! so changing a profile's parameters would silently serve stale output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use reelgate_common::Error;

/// Target quality for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityProfile {
    /// Serve the source file untouched.
    #[serde(rename = "original")]
    Original,
    /// 1080p rendition (5000k video, 192k audio).
    #[serde(rename = "1080p")]
    P1080,
    /// 720p rendition (2500k video, 128k audio).
    #[serde(rename = "720p")]
    P720,
    /// 480p rendition (1000k video, 96k audio).
    #[serde(rename = "480p")]
    P480,
    /// 360p rendition (500k video, 64k audio).
    #[serde(rename = "360p")]
    P360,
}

/// Fixed encode parameters for a non-original profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    /// Video bitrate cap in kbit/s (feeds `-maxrate`; `-bufsize` is twice this).
    pub video_kbps: u32,
    /// Target resolution as an ffmpeg scale expression, `W:H`.
    pub scale: &'static str,
    /// AAC audio bitrate, e.g. "128k".
    pub audio_bitrate: &'static str,
}

impl QualityProfile {
    /// All profiles, highest quality first.
    pub const ALL: &'static [QualityProfile] = &[
        QualityProfile::Original,
        QualityProfile::P1080,
        QualityProfile::P720,
        QualityProfile::P480,
        QualityProfile::P360,
    ];

    /// Encode parameters for this profile. `None` for [`Original`](Self::Original),
    /// which is never encoded.
    pub fn encode_params(&self) -> Option<EncodeParams> {
        match self {
            QualityProfile::Original => None,
            QualityProfile::P1080 => Some(EncodeParams {
                video_kbps: 5000,
                scale: "1920:1080",
                audio_bitrate: "192k",
            }),
            QualityProfile::P720 => Some(EncodeParams {
                video_kbps: 2500,
                scale: "1280:720",
                audio_bitrate: "128k",
            }),
            QualityProfile::P480 => Some(EncodeParams {
                video_kbps: 1000,
                scale: "854:480",
                audio_bitrate: "96k",
            }),
            QualityProfile::P360 => Some(EncodeParams {
                video_kbps: 500,
                scale: "640:360",
                audio_bitrate: "64k",
            }),
        }
    }

    /// Stable label used in cache file names and query parameters.
    pub fn label(&self) -> &'static str {
        match self {
            QualityProfile::Original => "original",
            QualityProfile::P1080 => "1080p",
            QualityProfile::P720 => "720p",
            QualityProfile::P480 => "480p",
            QualityProfile::P360 => "360p",
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for QualityProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(QualityProfile::Original),
            "1080p" => Ok(QualityProfile::P1080),
            "720p" => Ok(QualityProfile::P720),
            "480p" => Ok(QualityProfile::P480),
            "360p" => Ok(QualityProfile::P360),
            other => Err(Error::validation(format!("unknown quality: {other}"))),
        }
    }
}

/// Container format for transcoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// MP4, the default for progressive playback.
    Mp4,
    /// WebM.
    Webm,
}

impl OutputFormat {
    /// File extension (also the ffmpeg `-f` muxer name).
    pub fn ext(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }
}
