use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use claimgate::cache::CacheStore;
use claimgate::store::MemoryStore;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct Entry {
    name: String,
    hits: u32,
}

fn cache() -> (CacheStore, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (CacheStore::new(store.clone()), store)
}

#[tokio::test]
async fn set_then_get_roundtrips() {
    let (cache, _store) = cache();
    let entry = Entry {
        name: "verdict".to_string(),
        hits: 3,
    };
    cache.set("k", &entry, Duration::from_secs(60)).await;
    assert_eq!(cache.get::<Entry>("k").await, Some(entry));
}

#[tokio::test]
async fn absent_key_is_a_miss() {
    let (cache, _store) = cache();
    assert_eq!(cache.get::<Entry>("nope").await, None);
    assert!(!cache.exists("nope").await);
}

#[tokio::test]
async fn entries_expire_at_their_ttl() {
    let (cache, _store) = cache();
    cache
        .set("k", &"short-lived".to_string(), Duration::from_millis(50))
        .await;
    assert!(cache.exists("k").await);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(cache.get::<String>("k").await, None);
    assert!(!cache.exists("k").await);
}

#[tokio::test]
async fn delete_removes_the_entry() {
    let (cache, _store) = cache();
    cache
        .set("k", &"value".to_string(), Duration::from_secs(60))
        .await;
    cache.delete("k").await;
    assert_eq!(cache.get::<String>("k").await, None);
}

#[tokio::test]
async fn deleting_an_absent_key_is_a_no_op() {
    let (cache, _store) = cache();
    cache.delete("never-set").await;
    assert!(!cache.exists("never-set").await);
}

#[tokio::test]
async fn undecodable_value_degrades_to_a_miss() {
    use claimgate::store::SharedStore;

    let (cache, store) = cache();
    store
        .cache_set("k", b"not json at all", Duration::from_secs(60))
        .await
        .expect("raw set");
    // The bytes are there but do not decode; the cache reports a miss
    // rather than an error.
    assert_eq!(cache.get::<Entry>("k").await, None);
}
