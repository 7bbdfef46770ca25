use log::info;
use tracing_subscriber::EnvFilter;

use query_loom::{ QueryService, ServiceConfig };

/// Illustrative startup: train with the defaults from the training-data
/// file, show what landed in the index, then ask one sample question.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let api_key = ["OPENROUTER_API_KEY", "OPENAI_API_KEY"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .ok_or("set OPENROUTER_API_KEY (or OPENAI_API_KEY) to run the demo")?;

    let mut config = ServiceConfig::new(api_key);
    config.site_url = Some("http://example.com".to_string());
    config.site_name = Some("query-loom demo".to_string());

    let mut service = QueryService::new(&config).await?;
    let defaults = service.default_examples().clone();
    service.train(None, None, Some(&defaults)).await?;

    for document in service.dump_index().await? {
        info!("{} [{}]: {}", document.id, document.kind.as_str(), document.content);
    }

    let question =
        "Find accounts with name Test, site test.com, phone 4444, and owned by Natalia Natalia";
    info!("Question: {}", question);
    let raw = service.ask(question).await?;
    println!("{}", raw);
    Ok(())
}
