//! ensd - naming-registry rollout CLI

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ensd_cli::run().await?;
    Ok(())
}
