// Test fixtures: throwaway document roots under the system temp directory

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cli::CliArgs;
use crate::config::{AppState, Config};

/// First bytes of a PNG file, enough to check binary bodies byte for byte
pub const LOGO_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0xff, 0x00, 0x80,
];

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A temporary directory holding `site/` (the document root) and room for
/// files outside it. Removed on drop.
pub struct TestDir {
    base: PathBuf,
}

impl TestDir {
    pub fn new(name: &str) -> Self {
        let base = std::env::temp_dir().join(format!(
            "localserve-{}-{}-{name}",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        fs::create_dir_all(base.join("site")).unwrap();
        Self { base }
    }

    /// Root with `index.html` ("hello") and `img/logo.png`
    pub fn with_site(name: &str) -> Self {
        let dir = Self::new(name);
        dir.write("index.html", b"hello");
        dir.write("img/logo.png", LOGO_PNG);
        dir
    }

    pub fn root(&self) -> PathBuf {
        self.base.join("site")
    }

    /// Write a file relative to the document root
    pub fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        write_file(&self.root().join(relative), content)
    }

    /// Write a file next to the document root, outside of it
    pub fn write_outside(&self, name: &str, content: &[u8]) -> PathBuf {
        write_file(&self.base.join(name), content)
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.base);
    }
}

fn write_file(path: &Path, content: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    path.to_path_buf()
}

/// Config serving `dir` on an ephemeral loopback port
pub fn fixture_config(dir: &TestDir) -> Config {
    let args = CliArgs {
        port: Some(0),
        bind: Some("127.0.0.1".to_string()),
        directory: Some(dir.root()),
    };
    let mut config = Config::load(&args).unwrap();
    config.logging.access_log = false;
    config
}

pub fn fixture_state(dir: &TestDir) -> AppState {
    AppState::new(fixture_config(dir)).unwrap()
}
