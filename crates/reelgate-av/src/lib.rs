//! Reelgate-AV: on-demand transcoding for media streaming.
//!
//! This crate owns everything between "a stream request wants a lower
//! quality rendition" and "a finished MP4 exists on disk":
//!
//! - **Tool discovery** ([`tools::ToolRegistry`]): locates the external
//!   encoder once at startup, preferring a configured path over `PATH`.
//! - **Command execution** ([`command::ToolCommand`]): runs the encoder as
//!   a child process with a bounded run time and a guaranteed reap on
//!   every exit path.
//! - **Quality profiles** ([`profiles::QualityProfile`]): the fixed encode
//!   parameter sets renditions are produced with.
//! - **Transcoding** ([`encode::Transcoder`]): builds the encode command,
//!   parses encoder diagnostics into progress callbacks, and surfaces
//!   failure with a bounded diagnostic tail.
//! - **Rendition cache** ([`cache::RenditionCache`]): content-addressed
//!   on-disk store with per-key single-flight encoding and atomic
//!   publication.

pub mod cache;
pub mod command;
pub mod encode;
pub mod profiles;
pub mod tools;

pub use cache::RenditionCache;
pub use encode::{EncodeProgress, EncodeRequest, Transcoder};
pub use profiles::{OutputFormat, QualityProfile};
pub use tools::{ToolPaths, ToolRegistry};
