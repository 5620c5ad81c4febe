use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration loaded from `~/.config/mlt/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MltConfig {
    /// Bot owner; always allowed to cancel, force-start and select.
    pub owner_id: i64,
    /// Privileged (sudo) users.
    #[serde(default)]
    pub sudo_users: Vec<i64>,
    /// Bot username; commands addressed to another bot (`/cancel_x@other`) are ignored.
    #[serde(default)]
    pub bot_name: String,
    /// Maximum active downloads + uploads (None or 0 = unlimited).
    #[serde(default)]
    pub queue_all: Option<usize>,
    /// Maximum active downloads (None or 0 = unlimited).
    #[serde(default)]
    pub queue_download: Option<usize>,
    /// Maximum active uploads (None or 0 = unlimited).
    #[serde(default)]
    pub queue_upload: Option<usize>,
    /// Entries shown per status page.
    pub status_limit: usize,
    /// Minimum seconds between two non-forced status refreshes of one chat.
    pub status_update_interval_secs: u64,
    /// Pause between two cancellations of a bulk cancel.
    pub bulk_cancel_delay_ms: u64,
    /// Pause between two submissions of a multi-link batch.
    pub multi_link_delay_ms: u64,
    /// Public URL of the file-selection web page. File selection is disabled without it.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for MltConfig {
    fn default() -> Self {
        Self {
            owner_id: 0,
            sudo_users: Vec::new(),
            bot_name: String::new(),
            queue_all: None,
            queue_download: None,
            queue_upload: None,
            status_limit: 4,
            status_update_interval_secs: 10,
            bulk_cancel_delay_ms: 2000,
            multi_link_delay_ms: 4000,
            base_url: None,
        }
    }
}

impl MltConfig {
    /// Concurrency limits with `0` normalized to "unlimited".
    pub fn queue_limits(&self) -> QueueLimits {
        let norm = |v: Option<usize>| v.filter(|n| *n > 0);
        QueueLimits {
            all: norm(self.queue_all),
            download: norm(self.queue_download),
            upload: norm(self.queue_upload),
        }
    }

    pub fn bulk_cancel_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_cancel_delay_ms)
    }

    pub fn multi_link_delay(&self) -> Duration {
        Duration::from_millis(self.multi_link_delay_ms)
    }

    pub fn status_update_interval(&self) -> Duration {
        Duration::from_secs(self.status_update_interval_secs)
    }
}

/// Active-task limits used by the admission controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueLimits {
    pub all: Option<usize>,
    pub download: Option<usize>,
    pub upload: Option<usize>,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mlt")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MltConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MltConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit path.
pub fn load_from_path(path: &Path) -> Result<MltConfig> {
    let data = fs::read_to_string(path)?;
    let cfg: MltConfig = toml::from_str(&data)?;
    Ok(cfg)
}
