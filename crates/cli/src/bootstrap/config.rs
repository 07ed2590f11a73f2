use ferrous_adblock_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(
    config_path: Option<&str>,
    cli_overrides: CliOverrides,
) -> anyhow::Result<Config> {
    let config = Config::load(config_path, cli_overrides)?;
    config.validate()?;

    info!(
        config_file = config_path.unwrap_or("default"),
        data_dir = %config.storage.data_dir.display(),
        check_interval_secs = config.updates.check_interval_secs,
        preloaded = config.preloaded.len(),
        "Configuration loaded"
    );

    Ok(config)
}
