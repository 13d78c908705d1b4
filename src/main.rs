use clap::Parser;
use resetmail::{http, telemetry, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    let config = Config::parse();

    telemetry::init(&config.log_file)?;

    http::serve(config).await
}
