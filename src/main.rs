use clap::Parser;

use docker_exporter::config::{BuildInfo, Config};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    if config.version {
        println!("{}", BuildInfo::current());
        return Ok(());
    }

    docker_exporter::logging::init(config.log_level(), config.log_path.as_deref())?;
    docker_exporter::run(config).await?;
    Ok(())
}
