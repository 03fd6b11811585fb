use anyhow::Context;

use warehouse_app::{Console, Feedback};
use warehouse_infra::{Ledger, LedgerConfig, SqliteLedgerStore};

fn print(feedback: Feedback) -> anyhow::Result<()> {
    match feedback {
        Feedback::Table(table) => print!("{table}"),
        Feedback::Ack(msg) => println!("{msg}"),
        Feedback::Error(msg) => anyhow::bail!(msg),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warehouse_observability::init();

    let json = std::env::args().skip(1).any(|arg| arg == "--json");

    let config = LedgerConfig::from_env().context("invalid warehouse configuration")?;
    let store = SqliteLedgerStore::connect(&config)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    tracing::info!(database_url = %config.database_url, "schema ready");

    let console = Console::new(Ledger::new(store, config));

    if json {
        let summary = console.ledger().summary().await?;
        let low_stock = console.ledger().low_stock().await?;
        let report = serde_json::json!({
            "summary": summary,
            "low_stock": low_stock,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print(console.dashboard().await)?;
    println!();
    print(console.low_stock_table().await)?;
    Ok(())
}
