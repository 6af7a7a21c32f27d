//! Tests against a real server
//!
//! These tests require a Redis-compatible server on localhost:6379
//! (override with `KVWIRE_TEST_URL`).

use kvwire::{ConnectionFactory, ConnectionInfo, DataType, Operations, PoolConfig, ScanOptions};
use std::time::Duration;

fn test_url() -> String {
    std::env::var("KVWIRE_TEST_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into())
}

async fn connect(pooled: bool) -> Operations {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let info = ConnectionInfo::parse(&test_url()).expect("url");
    let builder = info.to_configuration_builder();
    let config = if pooled {
        builder
            .with_connection_pooling(PoolConfig::default())
            .build()
    } else {
        builder.build()
    };
    ConnectionFactory::new(info, config)
        .expect("factory")
        .operations()
        .await
        .expect("connect")
}

#[tokio::test]
#[ignore] // Requires a running server
async fn test_round_trip() {
    let ops = connect(false).await;
    let key = "kvwire:test:round_trip";
    ops.delete_key(key).await.expect("del");

    let hash = ops.bound_hash_ops::<_, String, String>(key);
    hash.put(&"a".into(), &"1".into()).await.expect("put");
    assert_eq!(hash.get(&"a".into()).await.expect("get"), Some("1".into()));
    assert_eq!(hash.key_type().await.expect("type"), DataType::Hash);
    assert!(hash.expire(Duration::from_secs(30)).await.expect("expire"));

    ops.delete_key(key).await.expect("del");
    ops.shutdown().await;
}

#[tokio::test]
#[ignore] // Requires a running server
async fn test_scan_large_hash() {
    let ops = connect(true).await;
    let key = "kvwire:test:scan";
    ops.delete_key(key).await.expect("del");

    let hash = ops.bound_hash_ops::<_, String, u64>(key);
    let entries: Vec<(String, u64)> = (0..1000).map(|i| (format!("f{}", i), i)).collect();
    hash.put_all(entries.iter().map(|(f, v)| (f, v))).await.expect("put_all");

    let mut cursor = hash
        .scan(ScanOptions::builder().count(100).build())
        .expect("scan");
    let mut seen = std::collections::HashSet::new();
    while let Some(entry) = cursor.next().await {
        seen.insert(entry.expect("entry").0);
    }
    assert_eq!(seen.len(), 1000);

    ops.delete_key(key).await.expect("del");
    ops.shutdown().await;
}
