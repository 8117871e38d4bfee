//! Reelgate-Common: shared error handling and path utilities.
//!
//! This crate provides the pieces used by both the server and the
//! transcoding library:
//!
//! - **Error Handling**: a unified error type with HTTP status mapping
//! - **Path Utilities**: file-type detection and content-type sniffing
//! - **Path Resolution**: mapping logical library paths to real files,
//!   constrained to allow-listed roots
//!
//! # Examples
//!
//! ```
//! use reelgate_common::{Error, Result};
//! use reelgate_common::paths::is_video_file;
//! use std::path::Path;
//!
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("no such file"))
//! }
//! ```

pub mod error;
pub mod paths;
pub mod resolve;

pub use error::{Error, Result};
pub use resolve::{MediaPath, PathMapping};
