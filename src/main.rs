use anyhow::Result;
use clap::Parser;
use pdf_chat::cli;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = cli::Args::parse();
    cli::run(args).await
}
