use anyhow::Result;
use mindual::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
