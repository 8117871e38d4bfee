//! Media streaming module.
//!
//! Serves library files over HTTP with range-request support and optional
//! on-demand transcoding.
//!
//! # Routes
//!
//! - `GET /stream?path=<logical>&quality=<auto|original|1080p|720p|480p|360p>`
//!   - stream a file, transcoding to the requested quality when possible

mod dispatch;
mod range;
mod serve;

pub use dispatch::{stream, StreamParams};
pub use range::ByteRange;
pub use serve::serve_file;

use axum::{routing::get, Router};

use crate::server::AppContext;

/// Create the streaming router.
pub fn routes() -> Router<AppContext> {
    Router::new().route("/stream", get(stream))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_creation() {
        let _router: Router<AppContext> = routes();
    }
}
