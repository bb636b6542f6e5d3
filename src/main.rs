use clap::Parser;
use fieldcanvas::replay;
use fieldcanvas::{init_logging, CanvasConfig};
use std::path::PathBuf;

/// Replays scripted input against a template and prints the saved fields
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Template JSON (`fields` and `page_count`)
    template: PathBuf,

    /// Script JSON with the steps to replay
    script: PathBuf,

    /// Page image whose natural size the canvas uses
    #[arg(long)]
    image: Option<PathBuf>,

    /// Canvas config (.json or .toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    tracing::info!(
        "fieldcanvas {} ({}, {})",
        fieldcanvas::VERSION,
        fieldcanvas::BUILD_REVISION,
        fieldcanvas::BUILD_DATE
    );

    let config = match &cli.config {
        Some(path) => CanvasConfig::load_from_file(path)?,
        None => CanvasConfig::default(),
    };
    let record = replay::read_template(&cli.template)?;
    let script = replay::read_script(&cli.script)?;
    let page_image = cli.image.as_deref().map(replay::image_size).transpose()?;

    let report = replay::run(record, script, page_image, config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.saved {
        anyhow::bail!("finalize failed");
    }
    Ok(())
}
