use std::path::PathBuf;

use clap::Parser;
use grantgate::{App, Settings, logging};

/// OAuth2-style token endpoint.
#[derive(Debug, Parser)]
#[command(name = "grantgate", version, about)]
struct Cli {
    /// TOML settings file (defaults to ./grantgate.toml when present).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the settings file.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        settings.bind = bind;
    }
    logging::init(settings.mode);

    let app = App::from_settings(&settings).await?;
    app.run().await
}
