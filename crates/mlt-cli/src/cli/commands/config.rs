//! `mlt config` – show where the config lives and what is in effect.

use anyhow::Result;
use mlt_core::config::{self, MltConfig};

pub fn run_config(cfg: &MltConfig) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    let limits = cfg.queue_limits();
    println!(
        "# effective limits: all={} download={} upload={}",
        fmt_limit(limits.all),
        fmt_limit(limits.download),
        fmt_limit(limits.upload)
    );
    Ok(())
}

fn fmt_limit(limit: Option<usize>) -> String {
    limit.map_or_else(|| "unlimited".to_string(), |n| n.to_string())
}
