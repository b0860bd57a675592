use anyhow::{Context, Result};
use log::info;

use lantern::ViewerConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = ViewerConfig::default();
    info!("starting {} ({}x{})", config.title, config.width, config.height);
    lantern::run(config).context("viewer failed to initialize")?;
    info!("viewer closed");
    Ok(())
}
