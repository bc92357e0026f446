// Dump stored endpoint reports as JSON.
//
// Usage: cargo run --example dump_reports -- [DB_PATH] [LIMIT] [ENDPOINT]
//   DB_PATH   default: ./data/probe.db
//   LIMIT     default: 20
//   ENDPOINT  default: all endpoints

use probe_report::store::SqliteStore;
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/probe.db");
    let limit: u32 = args
        .get(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let endpoint = args.get(3).map(String::as_str);

    let store = SqliteStore::connect(path, 1).await?;
    store.init().await?;
    let reports = store.list_reports(endpoint, i64::MIN, i64::MAX, limit).await?;

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
