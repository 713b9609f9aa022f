use clap::Parser;
use webqa_cli::cli::Cli;
use webqa_cli::{commands, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init(cli.options.log_format);

    commands::run(cli).await
}
