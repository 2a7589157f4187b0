use pixelscan_core::AppConfig;

pub fn show(config: &AppConfig) -> anyhow::Result<()> {
    println!("# {}", AppConfig::config_path()?.display());
    println!("# output: {}", config.output_dir()?.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
