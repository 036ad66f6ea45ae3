// Rollup maintenance pass: merge settled buckets, prune by retention

mod common;

use common::{ingest_at, point, temp_repo, ts};
use hostmetrics::ingest::IngestWriter;
use hostmetrics::models::{RangeQuery, Resolution, Target, TimeWindow};
use hostmetrics::reader::{MetricsReader, ReaderConfig, RepoReader};
use hostmetrics::rollup_worker::{run_one_tick, RollupWorkerConfig, TickSummary};

const DAY: i64 = 86_400;

fn config() -> RollupWorkerConfig {
    RollupWorkerConfig {
        merge_interval_secs: 60,
        settle_secs: 120,
        raw_retention_days: 3,
        rollup_retention_days: 30,
        vacuum_schedule: None,
        vacuum_interval_secs: 86_400,
    }
}

#[tokio::test]
async fn tick_leaves_fresh_buckets_alone() {
    let (_dir, repo) = temp_repo().await;
    let writer = IngestWriter::new(repo.clone());
    ingest_at(&writer, 5, vec![point("h1", "v1", "cpu_usage", 1.0)]).await;
    ingest_at(&writer, 20, vec![point("h1", "v1", "cpu_usage", 3.0)]).await;

    let summary = run_one_tick(&repo, &config(), ts(60)).await.unwrap();
    assert_eq!(summary, TickSummary::default());
    assert_eq!(repo.count_partial_rows(Resolution::OneMinute).await.unwrap(), 2);
}

#[tokio::test]
async fn tick_merges_settled_buckets_in_every_resolution() {
    let (_dir, repo) = temp_repo().await;
    let writer = IngestWriter::new(repo.clone());
    ingest_at(&writer, 5, vec![point("h1", "v1", "cpu_usage", 1.0)]).await;
    ingest_at(&writer, 20, vec![point("h1", "v1", "cpu_usage", 3.0)]).await;

    let summary = run_one_tick(&repo, &config(), ts(3600 + 120)).await.unwrap();
    assert_eq!(summary.merged_keys, 3);
    assert_eq!(summary.pruned_rows, 0);
    for r in Resolution::ALL {
        assert_eq!(repo.count_partial_rows(r).await.unwrap(), 1, "{r}");
    }

    let again = run_one_tick(&repo, &config(), ts(3600 + 120)).await.unwrap();
    assert_eq!(again.merged_keys, 0);
}

#[tokio::test]
async fn tick_prunes_raw_before_rollups() {
    let (_dir, repo) = temp_repo().await;
    let writer = IngestWriter::new(repo.clone());
    ingest_at(
        &writer,
        0,
        vec![
            point("h1", "v1", "cpu_usage", 2.0),
            point("h1", "v2", "cpu_usage", 4.0),
        ],
    )
    .await;

    let summary = run_one_tick(&repo, &config(), ts(4 * DAY)).await.unwrap();
    assert_eq!(summary.pruned_rows, 2);
    assert_eq!(repo.count_raw_rows().await.unwrap(), 0);

    // Rollups outlive the raw rows they were built from.
    let reader = RepoReader::new(repo.clone(), ReaderConfig::default());
    let rows = reader
        .range(&RangeQuery {
            metric: "cpu_usage".into(),
            target: Target::Host { host: "h1".into() },
            window: TimeWindow::new(ts(0), ts(59)).unwrap(),
            resolution: Resolution::OneMinute,
        })
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].avg, 3.0);

    let summary = run_one_tick(&repo, &config(), ts(31 * DAY)).await.unwrap();
    // Two vm keys per resolution.
    assert_eq!(summary.pruned_rows, 6);
    for r in Resolution::ALL {
        assert_eq!(repo.count_partial_rows(r).await.unwrap(), 0);
    }
}

#[tokio::test]
async fn tick_rejects_out_of_range_cutoffs() {
    let (_dir, repo) = temp_repo().await;

    let huge_retention = RollupWorkerConfig {
        raw_retention_days: u32::MAX,
        rollup_retention_days: u32::MAX,
        ..config()
    };
    let err = run_one_tick(&repo, &huge_retention, ts(0)).await.unwrap_err();
    assert!(err.to_string().contains("raw_retention_days"));

    let huge_settle = RollupWorkerConfig {
        settle_secs: u64::MAX,
        ..config()
    };
    let err = run_one_tick(&repo, &huge_settle, ts(0)).await.unwrap_err();
    assert!(err.to_string().contains("settle_secs"));
}
