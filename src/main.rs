use std::sync::Arc;

use shopflow::{ProcessHost, load_yaml_config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let config = load_yaml_config()?;
    let host = Arc::new(ProcessHost::new(config)?);

    host.serve().await
}
