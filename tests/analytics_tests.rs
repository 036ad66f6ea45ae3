// Derived analytics tests: percent/delta, least-squares trend, direction, extreme ranking

use hostmetrics::analytics::*;
use hostmetrics::models::ExtremeEntry;

fn entry(vm: &str, value: f64) -> ExtremeEntry {
    ExtremeEntry {
        host: "h1".into(),
        vm: vm.into(),
        value,
    }
}

#[test]
fn percent_zero_baseline_is_hundred() {
    assert_eq!(percent(0.0, 5.0), 100.0);
    assert_eq!(percent(0.0, -3.0), 100.0);
}

#[test]
fn percent_keeps_sign() {
    assert_eq!(percent(50.0, 25.0), -50.0);
    assert_eq!(percent(4.0, 4.0), 0.0);
}

#[test]
fn fit_line_two_points() {
    let fit = fit_line(&[(0.0, 1.0), (1.0, 3.0)]);
    assert_eq!(fit.slope, 2.0);
    assert_eq!(fit.intercept, 1.0);
}

#[test]
fn fit_line_single_and_empty() {
    assert_eq!(
        fit_line(&[(5.0, 7.0)]),
        LinearFit {
            slope: 0.0,
            intercept: 7.0
        }
    );
    assert_eq!(
        fit_line(&[]),
        LinearFit {
            slope: 0.0,
            intercept: 0.0
        }
    );
}

#[test]
fn fit_line_identical_x_is_nan() {
    let fit = fit_line(&[(2.0, 1.0), (2.0, 3.0)]);
    assert!(fit.slope.is_nan());
}

#[test]
fn direction_thresholds() {
    assert_eq!(detect_direction(0.0002, DEFAULT_TREND_EPSILON), Direction::Up);
    assert_eq!(detect_direction(-0.0002, DEFAULT_TREND_EPSILON), Direction::Down);
    assert_eq!(detect_direction(0.00001, DEFAULT_TREND_EPSILON), Direction::Flat);
}

#[test]
fn rank_extremes_uses_metric_order() {
    let candidates = vec![entry("vmA", 80.0), entry("vmB", 20.0)];
    let ram = rank_extremes("ram_used_pct", candidates.clone(), 1);
    assert_eq!(ram, vec![entry("vmB", 20.0)]);
    let cpu = rank_extremes("cpu_usage", candidates, 1);
    assert_eq!(cpu, vec![entry("vmA", 80.0)]);
}

#[test]
fn rank_extremes_ties_keep_row_order() {
    let candidates = vec![entry("first", 1.0), entry("second", 1.0), entry("third", 0.5)];
    let ranked = rank_extremes("unknown_metric", candidates, 3);
    let vms: Vec<_> = ranked.iter().map(|e| e.vm.as_str()).collect();
    assert_eq!(vms, ["first", "second", "third"]);
}

#[test]
fn partition_truncates_each_metric() {
    let rows = vec![
        ("cpu_usage".to_string(), entry("a", 10.0)),
        ("cpu_usage".to_string(), entry("b", 90.0)),
        ("disk_used_pct".to_string(), entry("c", 50.0)),
    ];
    let out = partition_extremes(rows, 1);
    assert_eq!(out["cpu_usage"], vec![entry("b", 90.0)]);
    assert_eq!(out["disk_used_pct"], vec![entry("c", 50.0)]);
    assert!(out["ram_used_pct"].is_empty());
}

#[test]
fn unknown_metric_sorts_descending() {
    assert_eq!(sort_order("swap_used_pct"), SortOrder::Desc);
    assert_eq!(sort_order("ram_available_bytes"), SortOrder::Asc);
}

#[test]
fn delta_is_after_minus_before() {
    assert_eq!(delta(10.0, 25.0), 15.0);
    assert_eq!(delta(25.0, 10.0), -15.0);
}

#[test]
fn fit_line_recovers_exact_line() {
    let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64 * 60.0, 5.0 - 0.5 * i as f64)).collect();
    let fit = fit_line(&points);
    assert!((fit.slope - (-0.5 / 60.0)).abs() < 1e-12);
    assert!((fit.intercept - 5.0).abs() < 1e-9);
    assert_eq!(detect_direction(fit.slope, DEFAULT_TREND_EPSILON), Direction::Down);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn percent_of_zero_baseline(x in -1e9f64..1e9f64) {
            prop_assume!(x != 0.0);
            prop_assert_eq!(percent(0.0, x), 100.0);
        }

        #[test]
        fn percent_of_unchanged_value(a in -1e9f64..1e9f64) {
            prop_assume!(a != 0.0);
            prop_assert_eq!(percent(a, a), 0.0);
        }
    }
}
