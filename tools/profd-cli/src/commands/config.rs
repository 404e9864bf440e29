//! Show or persist the daemon configuration.

use profd_common::config::{config_file_path, DaemonConfig};

pub fn run(config: &DaemonConfig, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to save config: {e}"))?;
        println!();
        println!("Saved to {}", config_file_path().display());
    }
    Ok(())
}
