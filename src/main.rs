use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    promptcast::cli::run().await
}
