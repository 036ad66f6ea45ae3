// Model tests: wire params -> validated queries, point/result JSON shapes

mod common;

use common::ts;
use hostmetrics::error::QueryError;
use hostmetrics::models::*;

fn range_params(scope: &str, host: Option<&str>, vm: Option<&str>) -> RangeParams {
    RangeParams {
        metric: "cpu_usage".into(),
        scope: scope.into(),
        host: host.map(Into::into),
        vm: vm.map(Into::into),
        from_ts: ts(0),
        to_ts: ts(3600),
        resolution: None,
    }
}

#[test]
fn test_range_params_valid_scopes() {
    let q = RangeQuery::try_from(range_params("vm", Some("h1"), Some("v1"))).unwrap();
    assert_eq!(
        q.target,
        Target::Vm {
            host: "h1".into(),
            vm: "v1".into()
        }
    );
    assert_eq!(q.resolution, Resolution::OneMinute);

    let q = RangeQuery::try_from(range_params("host", Some("h1"), None)).unwrap();
    assert_eq!(q.target.scope(), Scope::Host);

    let q = RangeQuery::try_from(range_params("global", None, None)).unwrap();
    assert_eq!(q.target, Target::Global);
}

#[test]
fn test_range_params_scope_violations_rejected() {
    let cases = [
        range_params("vm", Some("h1"), None),
        range_params("vm", None, Some("v1")),
        range_params("host", None, None),
        range_params("host", Some("h1"), Some("v1")),
        range_params("global", Some("h1"), None),
        range_params("cluster", None, None),
    ];
    for params in cases {
        let err = RangeQuery::try_from(params).unwrap_err();
        assert!(matches!(err, QueryError::InvalidScope(_)), "{err:?}");
        assert!(err.is_validation());
    }
}

#[test]
fn test_range_params_inverted_window_rejected() {
    let mut params = range_params("global", None, None);
    params.from_ts = ts(100);
    params.to_ts = ts(0);
    assert!(matches!(
        RangeQuery::try_from(params),
        Err(QueryError::InvalidWindow(_))
    ));
}

#[test]
fn test_unknown_resolution_rejected() {
    let mut params = range_params("global", None, None);
    params.resolution = Some("30s".into());
    assert!(matches!(
        RangeQuery::try_from(params),
        Err(QueryError::InvalidResolution(_))
    ));
}

fn rank_params(scope: &str, host: Option<&str>, limit: i64) -> RankParams {
    RankParams {
        metric: "cpu_usage".into(),
        scope: scope.into(),
        host: host.map(Into::into),
        vm: None,
        limit,
        resolution: Some("5m".into()),
    }
}

#[test]
fn test_rank_params_limit_must_be_positive() {
    for limit in [0, -1] {
        assert!(matches!(
            RankQuery::try_from(rank_params("host", None, limit)),
            Err(QueryError::InvalidLimit(l)) if l == limit
        ));
    }
    let q = RankQuery::try_from(rank_params("host", None, 5000)).unwrap();
    assert_eq!(q.limit.get(), 5000);
    assert_eq!(q.limit.clamped(1000), 1000);
    assert_eq!(q.resolution, Resolution::FiveMinutes);
}

#[test]
fn test_rank_params_scopes() {
    let q = RankQuery::try_from(rank_params("vm", Some("h1"), 3)).unwrap();
    assert_eq!(
        q.scope,
        RankScope::Vm {
            host: Some("h1".into())
        }
    );
    let q = RankQuery::try_from(rank_params("vm", None, 3)).unwrap();
    assert_eq!(q.scope, RankScope::Vm { host: None });
    assert!(RankQuery::try_from(rank_params("global", None, 3)).is_err());
    assert!(RankQuery::try_from(rank_params("host", Some("h1"), 3)).is_err());
}

#[test]
fn test_compare_params_overlapping_windows_rejected() {
    let params = CompareParams {
        metric: "cpu_usage".into(),
        scope: "global".into(),
        host: None,
        vm: None,
        from_a: ts(0),
        to_a: ts(600),
        from_b: ts(600),
        to_b: ts(1200),
        resolution: None,
    };
    assert!(matches!(
        CompareQuery::try_from(params.clone()),
        Err(QueryError::InvalidWindow(_))
    ));

    let disjoint = CompareParams {
        from_b: ts(601),
        ..params
    };
    let q = CompareQuery::try_from(disjoint).unwrap();
    assert_eq!(q.before.to, ts(600));
    assert_eq!(q.after.from, ts(601));
}

#[test]
fn test_cardinality_params() {
    let q = CardinalityQuery::try_from(CardinalityParams {
        scope: "metric".into(),
        from_ts: None,
        to_ts: None,
        resolution: None,
    })
    .unwrap();
    assert_eq!(q.kind, CardinalityKind::Metric);
    assert!(q.window.is_none());

    assert!(matches!(
        CardinalityQuery::try_from(CardinalityParams {
            scope: "global".into(),
            from_ts: None,
            to_ts: None,
            resolution: None,
        }),
        Err(QueryError::InvalidScope(_))
    ));

    assert!(matches!(
        CardinalityQuery::try_from(CardinalityParams {
            scope: "vm".into(),
            from_ts: Some(ts(0)),
            to_ts: None,
            resolution: None,
        }),
        Err(QueryError::InvalidWindow(_))
    ));
}

#[test]
fn test_trend_params_vm_requires_host_and_vm() {
    let params = TrendParams {
        metric: "cpu_usage".into(),
        scope: "vm".into(),
        host: Some("h1".into()),
        vm: None,
        from_ts: ts(0),
        to_ts: ts(600),
        resolution: None,
    };
    assert!(matches!(
        TrendQuery::try_from(params),
        Err(QueryError::InvalidScope(_))
    ));
}

#[test]
fn test_metric_point_tags_default_to_empty() {
    let json = r#"{"host":"h1","vm":"v1","metric":"cpu_usage","value":0.5}"#;
    let p: MetricPoint = serde_json::from_str(json).unwrap();
    assert!(p.tags.is_empty());
    assert_eq!(p.value, 0.5);
}

#[test]
fn test_raw_row_stamp_truncates_to_seconds() {
    let at = ts(42) + chrono::Duration::milliseconds(750);
    let row = RawSeriesRow::stamp(common::point("h1", "v1", "cpu_usage", 1.0), at);
    assert_eq!(row.ts, ts(42));
    assert_eq!(row.date, ts(42).date_naive());
}

#[test]
fn test_compare_result_no_data_omits_deltas() {
    let r = CompareResult::from_windows(
        Some(Stats {
            avg: 1.0,
            min: 1.0,
            max: 1.0,
        }),
        None,
    );
    assert_eq!(r.status, Status::NoData);
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "no_data" }));
}

#[test]
fn test_compare_result_deltas() {
    let before = Stats {
        avg: 10.0,
        min: 0.0,
        max: 20.0,
    };
    let after = Stats {
        avg: 15.0,
        min: 5.0,
        max: 10.0,
    };
    let r = CompareResult::from_windows(Some(before), Some(after));
    assert_eq!(r.status, Status::Ok);
    let delta = r.delta.unwrap();
    assert_eq!(delta.avg, 5.0);
    assert_eq!(delta.max, -10.0);
    let percent = r.percent.unwrap();
    assert_eq!(percent.avg, 50.0);
    assert_eq!(percent.min, 100.0);
    assert_eq!(percent.max, -50.0);
}

#[test]
fn test_latest_result_shapes() {
    let empty = LatestResult::from_row(None);
    assert_eq!(
        serde_json::to_value(&empty).unwrap(),
        serde_json::json!({ "status": "no_data" })
    );
}
