// Runtime configuration

use std::path::PathBuf;
use std::time::Duration;

/// How long the "last updated" marker stays set after an update
pub const DEFAULT_MARKER_DELAY: Duration = Duration::from_secs(2);

/// Directory name under the platform data dir
pub const APP_DIR_NAME: &str = "tasklist";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the SQLite database
    pub store_path: PathBuf,
    /// Delay before `last_updated_id` clears
    pub marker_delay: Duration,
}

impl Config {
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            marker_delay: DEFAULT_MARKER_DELAY,
        }
    }

    pub fn with_marker_delay(mut self, marker_delay: Duration) -> Self {
        self.marker_delay = marker_delay;
        self
    }

    /// `{data_dir}/tasklist`, or `./tasklist` when the platform has no data dir
    pub fn default_store_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_store_path())
    }
}
