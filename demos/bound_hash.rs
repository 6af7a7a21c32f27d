//! Walk through the bound hash API against a local server.
//!
//! Run with: cargo run --example bound_hash -- redis://127.0.0.1:6379/0
//! Set RUST_LOG=kvwire=debug to see the command trace.

use kvwire::{ConnectionFactory, ConnectionInfo, Json, PoolConfig, ScanOptions};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct Profile {
    name: String,
    visits: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "redis://127.0.0.1:6379/0".to_string());
    let info = ConnectionInfo::parse(&url)?;
    let config = info
        .to_configuration_builder()
        .command_timeout(Duration::from_secs(5))
        .with_connection_pooling(PoolConfig::builder().max_total(4).max_idle(4).min_idle(1).build()?)
        .build();

    let ops = ConnectionFactory::new(info, config)?.operations().await?;

    let counters = ops.bound_hash_ops::<_, String, i64>("demo:counters");
    for page in ["home", "about", "home", "pricing", "home"] {
        counters.increment(&page.to_string(), 1).await?;
    }
    println!("home views: {:?}", counters.get(&"home".to_string()).await?);
    println!("pages tracked: {}", counters.size().await?);

    let profiles = ops.bound_hash_ops::<_, String, Json<Profile>>("demo:profiles");
    let ada = Json(Profile {
        name: "Ada".into(),
        visits: 3,
    });
    if profiles.put_if_absent(&"ada".to_string(), &ada).await? {
        println!("stored profile for ada");
    }
    counters.expire(Duration::from_secs(60)).await?;
    println!("counters expire: {:?}", counters.get_expire().await?);

    let mut cursor = counters.scan(ScanOptions::builder().pattern("h*").count(10).build())?;
    while let Some(entry) = cursor.next().await {
        let (page, views) = entry?;
        println!("{page}: {views}");
    }

    ops.delete_key("demo:counters").await?;
    ops.delete_key("demo:profiles").await?;
    ops.shutdown().await;
    Ok(())
}
