// Cache tests: key determinism, memory backend expiry, cache-aside wrapper behavior

mod common;

use async_trait::async_trait;
use common::ts;
use hostmetrics::analytics::Direction;
use hostmetrics::cache::key::{self, CacheKeyParts, KeyParts, make_cache_key};
use hostmetrics::cache::{CacheBackend, CachedReader, MemoryCache};
use hostmetrics::error::{CacheError, QueryError, QueryResult};
use hostmetrics::models::*;
use hostmetrics::reader::MetricsReader;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Duration;

fn latest_query(target: Target) -> LatestQuery {
    LatestQuery {
        metric: "cpu_usage".into(),
        target,
        resolution: Resolution::OneMinute,
    }
}

#[test]
fn test_key_identical_queries_identical_keys() {
    let a = latest_query(Target::Host { host: "h1".into() });
    let b = latest_query(Target::Host { host: "h1".into() });
    assert_eq!(
        a.cache_key(key::PREFIX_LATEST),
        b.cache_key(key::PREFIX_LATEST)
    );
}

#[test]
fn test_key_absent_field_differs_from_empty_string() {
    let absent = make_cache_key("p", &KeyParts::default());
    let empty = make_cache_key(
        "p",
        &KeyParts {
            host: Some(""),
            ..Default::default()
        },
    );
    assert_ne!(absent, empty);
    assert_eq!(absent, "p");
    assert_eq!(empty, "p:host=\"\"");
}

#[test]
fn test_key_prefix_separates_top_and_bottom() {
    let q = RankQuery {
        metric: "cpu_usage".into(),
        scope: RankScope::Host,
        limit: Limit::new(5).unwrap(),
        resolution: Resolution::OneMinute,
    };
    assert_ne!(q.cache_key(key::PREFIX_TOP), q.cache_key(key::PREFIX_BOTTOM));
}

#[test]
fn test_key_separator_in_values_does_not_collide() {
    let a = make_cache_key(
        "p",
        &KeyParts {
            host: Some("a:vm=\"b\""),
            ..Default::default()
        },
    );
    let b = make_cache_key(
        "p",
        &KeyParts {
            host: Some("a"),
            vm: Some("b"),
            ..Default::default()
        },
    );
    assert_ne!(a, b);
}

#[test]
fn test_key_compare_includes_both_windows() {
    let q = CompareQuery::new(
        "cpu_usage".into(),
        Target::Global,
        TimeWindow::new(ts(0), ts(60)).unwrap(),
        TimeWindow::new(ts(120), ts(180)).unwrap(),
        Resolution::OneMinute,
    )
    .unwrap();
    let k = q.cache_key(key::PREFIX_COMPARE);
    assert!(k.starts_with("metrics:compare:metric=\"cpu_usage\":scope=\"global\""));
    assert!(k.contains(":from_a="));
    assert!(k.contains(":to_b="));
    assert!(!k.contains(":host="));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn key_is_deterministic(host in ".*", vm in ".*", metric in ".*", limit in 1u32..10_000) {
            let parts = KeyParts {
                metric: Some(&metric),
                host: Some(&host),
                vm: Some(&vm),
                limit: Some(limit),
                ..Default::default()
            };
            prop_assert_eq!(make_cache_key("p", &parts), make_cache_key("p", &parts.clone()));
        }

        #[test]
        fn key_distinguishes_hosts(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            prop_assume!(a != b);
            let ka = make_cache_key("p", &KeyParts { host: Some(&a), ..Default::default() });
            let kb = make_cache_key("p", &KeyParts { host: Some(&b), ..Default::default() });
            prop_assert_ne!(ka, kb);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_memory_cache_expires_after_ttl() {
    let cache = MemoryCache::new(10);
    cache
        .set("k", "v".into(), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_memory_cache_evicts_when_full() {
    let cache = MemoryCache::new(2);
    cache.set("a", "1".into(), Duration::from_secs(10)).await.unwrap();
    cache.set("b", "2".into(), Duration::from_secs(20)).await.unwrap();
    cache.set("c", "3".into(), Duration::from_secs(30)).await.unwrap();
    assert_eq!(cache.len(), 2);
    // Soonest to expire goes first.
    assert_eq!(cache.get("a").await.unwrap(), None);
    assert_eq!(cache.get("c").await.unwrap().as_deref(), Some("3"));
}

/// Reader that counts calls and returns fixed results.
#[derive(Default)]
struct CountingReader {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingReader {
    fn hit(&self) -> QueryResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(QueryError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsReader for CountingReader {
    async fn range(&self, _: &RangeQuery) -> QueryResult<Vec<AggregateRow>> {
        self.hit()?;
        Ok(vec![AggregateRow {
            bucket: ts(0),
            host: None,
            vm: None,
            avg: 20.0,
            min: 10.0,
            max: 30.0,
        }])
    }
    async fn latest(&self, _: &LatestQuery) -> QueryResult<LatestResult> {
        self.hit()?;
        Ok(LatestResult::from_row(None))
    }
    async fn top(&self, _: &RankQuery) -> QueryResult<Vec<RankedEntity>> {
        self.hit()?;
        Ok(vec![])
    }
    async fn bottom(&self, _: &RankQuery) -> QueryResult<Vec<RankedEntity>> {
        self.hit()?;
        Ok(vec![])
    }
    async fn extremes(&self, _: &ExtremesQuery) -> QueryResult<ExtremesResult> {
        self.hit()?;
        Ok(ExtremesResult::new())
    }
    async fn cardinality(&self, q: &CardinalityQuery) -> QueryResult<CardinalityResult> {
        self.hit()?;
        Ok(CardinalityResult {
            kind: q.kind,
            value: 3,
        })
    }
    async fn compare(&self, _: &CompareQuery) -> QueryResult<CompareResult> {
        self.hit()?;
        Ok(CompareResult::from_windows(None, None))
    }
    async fn trend(&self, _: &TrendQuery) -> QueryResult<TrendResult> {
        self.hit()?;
        Ok(TrendResult {
            status: Status::NoData,
            points: 0,
            slope: 0.0,
            intercept: 0.0,
            direction: Direction::Flat,
        })
    }
}

/// Backend that is always unreachable.
struct DownBackend;

#[async_trait]
impl CacheBackend for DownBackend {
    async fn get(&self, _: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
    async fn set(&self, _: &str, _: String, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".into()))
    }
}

fn range_query() -> RangeQuery {
    RangeQuery {
        metric: "cpu_usage".into(),
        target: Target::Global,
        window: TimeWindow::new(ts(0), ts(59)).unwrap(),
        resolution: Resolution::OneMinute,
    }
}

#[tokio::test]
async fn test_cached_reader_second_read_is_a_hit() {
    let backend = Arc::new(MemoryCache::new(100));
    let reader = CachedReader::new(CountingReader::default(), backend, Duration::from_secs(60));
    let first = reader.range(&range_query()).await.unwrap();
    let second = reader.range(&range_query()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second[0].avg, 20.0);
    assert_eq!(reader.inner().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cached_reader_different_params_miss() {
    let backend = Arc::new(MemoryCache::new(100));
    let reader = CachedReader::new(CountingReader::default(), backend, Duration::from_secs(60));
    reader.range(&range_query()).await.unwrap();
    let mut other = range_query();
    other.resolution = Resolution::FiveMinutes;
    reader.range(&other).await.unwrap();
    assert_eq!(reader.inner().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cached_reader_reloads_after_ttl() {
    let backend = Arc::new(MemoryCache::new(100));
    let reader = CachedReader::new(CountingReader::default(), backend, Duration::from_secs(60));
    let q = CardinalityQuery {
        kind: CardinalityKind::Host,
        window: None,
        resolution: Resolution::OneMinute,
    };
    reader.cardinality(&q).await.unwrap();
    reader.cardinality(&q).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    reader.cardinality(&q).await.unwrap();
    assert_eq!(reader.inner().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cached_reader_passes_through_when_backend_down() {
    let reader = CachedReader::new(
        CountingReader::default(),
        Arc::new(DownBackend),
        Duration::from_secs(60),
    );
    let rows = reader.range(&range_query()).await.unwrap();
    assert_eq!(rows.len(), 1);
    reader.range(&range_query()).await.unwrap();
    assert_eq!(reader.inner().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cached_reader_does_not_cache_store_errors() {
    let backend = Arc::new(MemoryCache::new(100));
    let reader = CachedReader::new(
        CountingReader {
            fail: true,
            ..Default::default()
        },
        backend.clone(),
        Duration::from_secs(60),
    );
    let err = reader.range(&range_query()).await.unwrap_err();
    assert!(matches!(err, QueryError::Store(_)));
    assert!(backend.is_empty());
}

#[tokio::test]
async fn test_cached_reader_unreadable_entry_treated_as_miss() {
    let backend = Arc::new(MemoryCache::new(100));
    let q = range_query();
    backend
        .set(&q.cache_key(key::PREFIX_RANGE), "not json".into(), Duration::from_secs(60))
        .await
        .unwrap();
    let reader = CachedReader::new(CountingReader::default(), backend, Duration::from_secs(60));
    let rows = reader.range(&q).await.unwrap();
    assert_eq!(rows[0].max, 30.0);
    assert_eq!(reader.inner().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cached_reader_caches_no_data_results() {
    let backend = Arc::new(MemoryCache::new(100));
    let reader = CachedReader::new(CountingReader::default(), backend, Duration::from_secs(60));
    let q = latest_query(Target::Global);
    assert_eq!(reader.latest(&q).await.unwrap().status, Status::NoData);
    assert_eq!(reader.latest(&q).await.unwrap().status, Status::NoData);
    assert_eq!(reader.inner().calls.load(Ordering::SeqCst), 1);
}
