//! `rangefetch config` – show where the config and log live, and what the config says.

use anyhow::Result;
use rangefetch_core::config::{self, FetchConfig};
use rangefetch_core::logging;

pub fn run_config(cfg: &FetchConfig) -> Result<()> {
    println!("# config: {}", config::config_path()?.display());
    println!("# log:    {}", logging::log_path()?.display());
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}
