use dotenv::dotenv;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use publication_indexer::{Dependencies, IndexingError, Settings};
use publication_indexer_pipeline::consumer::JsonLinesConsumer;

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();

    let settings = Settings::from_env()?;
    init_tracing(settings.json_logs);

    let dependencies = Dependencies::new(&settings).await?;

    // Change events arrive as JSON lines on stdin
    let consumer = JsonLinesConsumer::new(BufReader::new(tokio::io::stdin()));
    let summary = dependencies.pipeline.run(consumer).await?;

    info!(
        succeeded = summary.succeeded,
        failed = summary.failures.len(),
        "Publication indexer finished"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
