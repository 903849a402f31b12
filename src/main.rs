use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use market_snapshot::{prepare_analysis, Interval, MarketDataConfig, PayloadBuilder, PromptRegistry};

fn usage() -> ! {
    eprintln!("Usage: market-snapshot <SYMBOL> <INTERVAL> [PROMPT]");
    eprintln!("Example: market-snapshot BTCUSDT 5m market_analysis");
    eprintln!(
        "Intervals: {}",
        Interval::ALL.iter().map(|iv| iv.as_str()).collect::<Vec<_>>().join(", ")
    );
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // stdout carries the payload, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,market_snapshot=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 || args.len() > 4 {
        usage();
    }

    let symbol = args[1].trim().to_string();
    if symbol.is_empty() {
        usage();
    }
    let interval: Interval = match args[2].parse() {
        Ok(interval) => interval,
        Err(e) => {
            eprintln!("{}", e);
            usage();
        }
    };

    let config = Arc::new(MarketDataConfig::from_env());
    tracing::debug!(config = ?config, "Loaded market data configuration");

    let builder = PayloadBuilder::from_config(config.clone());

    match args.get(3) {
        None => {
            let payload = builder.fetch_payload(&symbol, interval).await;
            println!("{}", serde_json::to_string(&payload)?);
        }
        Some(prompt) => {
            let registry = PromptRegistry::new(config.prompt_dir.clone());
            match prepare_analysis(&builder, &registry, &symbol, interval, prompt).await {
                Ok(request) => {
                    println!("{}", request.system_prompt);
                    println!("{}", request.data_json);
                }
                Err(e) => {
                    eprintln!("{}", e);
                    if let Ok(names) = registry.list_prompts() {
                        eprintln!("Available prompts: {}", names.join(", "));
                    }
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
