//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates temp library directories, a
//! default config pointing at them, and a full [`AppContext`]. The
//! [`TestHarness::with_server`] constructor starts Axum on a random port
//! for HTTP-level testing. Tests get an empty tool registry by default so
//! no encoder is ever invoked; the direct-streaming and fallback paths
//! are what integration tests exercise deterministically.

use std::net::SocketAddr;
use std::path::PathBuf;

use reelgate::config::Config;
use reelgate::server::{create_router, AppContext};
use reelgate_av::ToolRegistry;
use tempfile::TempDir;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by
/// temporary library directories.
pub struct TestHarness {
    pub ctx: AppContext,
    /// Real directory the `/movies` prefix maps to.
    pub movies_dir: PathBuf,
    _dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration (auth disabled,
    /// transcoding disabled).
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a new harness, letting the caller adjust the config after
    /// the temp library paths are filled in.
    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let movies_dir = dir.path().join("movies");
        let tv_dir = dir.path().join("tv");
        std::fs::create_dir_all(&movies_dir).expect("failed to create movies dir");
        std::fs::create_dir_all(&tv_dir).expect("failed to create tv dir");

        let mut config = Config::default();
        config.storage.movies_path = Some(movies_dir.clone());
        config.storage.tv_path = Some(tv_dir);
        config.transcoding.cache_dir = dir.path().join("transcode-cache");
        config.transcoding.enabled = false;
        customize(&mut config);

        let ctx = AppContext::new(config, ToolRegistry::empty());

        Self {
            ctx,
            movies_dir,
            _dir: dir,
        }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    /// Start an Axum server with a customized config on a random port.
    pub async fn with_server_config(
        customize: impl FnOnce(&mut Config),
    ) -> (Self, SocketAddr) {
        Self::serve(Self::with_config(customize)).await
    }

    async fn serve(harness: Self) -> (Self, SocketAddr) {
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Write a movie file into the library; returns its logical path.
    pub fn write_movie(&self, name: &str, contents: &[u8]) -> String {
        let path = self.movies_dir.join(name);
        std::fs::write(&path, contents).expect("failed to write movie file");
        format!("/movies/{name}")
    }

    /// The physical path of a movie written with [`write_movie`].
    pub fn movie_path(&self, name: &str) -> PathBuf {
        self.movies_dir.join(name)
    }
}
