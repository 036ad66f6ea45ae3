// Deterministic cache keys: operation prefix plus every present component, in fixed order.
// Components are `name=<json string>`, so an absent field and an empty string never collide.

use chrono::{DateTime, Utc};

use crate::models::{
    CardinalityQuery, CompareQuery, ExtremesQuery, LatestQuery, RangeQuery, RankQuery,
    Resolution, TimeWindow, TrendQuery,
};

pub const PREFIX_RANGE: &str = "metrics:range";
pub const PREFIX_LATEST: &str = "metrics:latest";
pub const PREFIX_TOP: &str = "metrics:top";
pub const PREFIX_BOTTOM: &str = "metrics:bottom";
pub const PREFIX_EXTREMES: &str = "metrics:extremes";
pub const PREFIX_CARDINALITY: &str = "metrics:cardinality";
pub const PREFIX_COMPARE: &str = "metrics:compare";
pub const PREFIX_TREND: &str = "metrics:trend";

/// Key components; `None` fields are left out of the key entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyParts<'a> {
    pub metric: Option<&'a str>,
    pub scope: Option<&'a str>,
    pub host: Option<&'a str>,
    pub vm: Option<&'a str>,
    pub from_ts: Option<DateTime<Utc>>,
    pub to_ts: Option<DateTime<Utc>>,
    pub from_a: Option<DateTime<Utc>>,
    pub to_a: Option<DateTime<Utc>>,
    pub from_b: Option<DateTime<Utc>>,
    pub to_b: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
    pub limit: Option<u32>,
}

impl KeyParts<'_> {
    fn window(mut self, window: &TimeWindow) -> Self {
        self.from_ts = Some(window.from);
        self.to_ts = Some(window.to);
        self
    }
}

pub fn make_cache_key(prefix: &str, parts: &KeyParts<'_>) -> String {
    let mut key = String::from(prefix);
    let mut push = |name: &str, value: Option<String>| {
        if let Some(value) = value {
            key.push(':');
            key.push_str(name);
            key.push('=');
            key.push_str(&serde_json::Value::String(value).to_string());
        }
    };
    let ts = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339());
    push("metric", parts.metric.map(str::to_string));
    push("scope", parts.scope.map(str::to_string));
    push("host", parts.host.map(str::to_string));
    push("vm", parts.vm.map(str::to_string));
    push("from_ts", ts(parts.from_ts));
    push("to_ts", ts(parts.to_ts));
    push("from_a", ts(parts.from_a));
    push("to_a", ts(parts.to_a));
    push("from_b", ts(parts.from_b));
    push("to_b", ts(parts.to_b));
    push("resolution", parts.resolution.map(|r| r.as_str().to_string()));
    push("limit", parts.limit.map(|l| l.to_string()));
    key
}

/// Query types that know their own cache-key components.
pub trait CacheKeyParts {
    fn key_parts(&self) -> KeyParts<'_>;

    fn cache_key(&self, prefix: &str) -> String {
        make_cache_key(prefix, &self.key_parts())
    }
}

impl CacheKeyParts for RangeQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        KeyParts {
            metric: Some(&self.metric),
            scope: Some(self.target.scope().as_str()),
            host: self.target.host(),
            vm: self.target.vm(),
            resolution: Some(self.resolution),
            ..Default::default()
        }
        .window(&self.window)
    }
}

impl CacheKeyParts for LatestQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        KeyParts {
            metric: Some(&self.metric),
            scope: Some(self.target.scope().as_str()),
            host: self.target.host(),
            vm: self.target.vm(),
            resolution: Some(self.resolution),
            ..Default::default()
        }
    }
}

impl CacheKeyParts for RankQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        KeyParts {
            metric: Some(&self.metric),
            scope: Some(self.scope.scope().as_str()),
            host: self.scope.host(),
            resolution: Some(self.resolution),
            limit: Some(self.limit.get()),
            ..Default::default()
        }
    }
}

impl CacheKeyParts for ExtremesQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        KeyParts {
            resolution: Some(self.resolution),
            limit: Some(self.limit.get()),
            ..Default::default()
        }
        .window(&self.window)
    }
}

impl CacheKeyParts for CardinalityQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        let parts = KeyParts {
            scope: Some(self.kind.as_str()),
            resolution: Some(self.resolution),
            ..Default::default()
        };
        match &self.window {
            Some(window) => parts.window(window),
            None => parts,
        }
    }
}

impl CacheKeyParts for CompareQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        KeyParts {
            metric: Some(&self.metric),
            scope: Some(self.target.scope().as_str()),
            host: self.target.host(),
            vm: self.target.vm(),
            from_a: Some(self.before.from),
            to_a: Some(self.before.to),
            from_b: Some(self.after.from),
            to_b: Some(self.after.to),
            resolution: Some(self.resolution),
            ..Default::default()
        }
    }
}

impl CacheKeyParts for TrendQuery {
    fn key_parts(&self) -> KeyParts<'_> {
        KeyParts {
            metric: Some(&self.metric),
            scope: Some(self.target.scope().as_str()),
            host: self.target.host(),
            vm: self.target.vm(),
            resolution: Some(self.resolution),
            ..Default::default()
        }
        .window(&self.window)
    }
}

