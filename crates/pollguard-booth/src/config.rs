use std::path::PathBuf;
use std::time::Duration;

/// Booth configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite voter database.
    pub db_path: PathBuf,
    /// Euclidean-distance threshold for a positive match.
    pub match_threshold: f32,
    /// Embedding dimensionality enforced by the registry.
    pub embedding_dim: usize,
    /// Timeout in seconds for one provider call (OCR or embedding extraction).
    pub capture_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `POLLGUARD_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("pollguard");

        let db_path = std::env::var("POLLGUARD_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("voters.db"));

        Self {
            db_path,
            match_threshold: env_f32(
                "POLLGUARD_MATCH_THRESHOLD",
                pollguard_core::MATCH_THRESHOLD,
            ),
            embedding_dim: env_usize("POLLGUARD_EMBEDDING_DIM", 128),
            capture_timeout_secs: env_u64("POLLGUARD_CAPTURE_TIMEOUT_SECS", 30),
        }
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
