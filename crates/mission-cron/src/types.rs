use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// When an external job fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleRule {
    /// Fire exactly once at the given instant (epoch ms).
    At {
        #[serde(rename = "atMs")]
        at_ms: i64,
    },

    /// Fire every `every_ms` milliseconds, starting at the job's creation time.
    Every {
        #[serde(rename = "everyMs")]
        every_ms: i64,
    },

    /// Cron expression (5 or 6 fields) evaluated in an IANA timezone, UTC when
    /// absent.
    Cron {
        expr: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tz: Option<String>,
    },
}

/// Normalized mirror of one job in the external scheduler. Never edited
/// locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDescriptor {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    /// Epoch ms. Generation treats a missing value as "now".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_ms: Option<i64>,
    /// `None` when the external record carried no usable rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleRule>,
    /// Next run as reported by the external scheduler; used as a best-effort
    /// occurrence when the rule cannot be expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run_at_ms: Option<i64>,
}

/// One materialized calendar entry for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    /// `cron:{job_id}:{start_ms}`
    pub id: String,
    pub cron_id: String,
    pub title: String,
    /// RFC 3339, UTC, millisecond precision.
    pub start: String,
    pub start_ms: i64,
}

impl Occurrence {
    pub fn new(job: &ScheduleDescriptor, start_ms: i64) -> Self {
        Self {
            id: format!("cron:{}:{}", job.id, start_ms),
            cron_id: job.id.clone(),
            title: job.name.clone(),
            start: iso_millis(start_ms),
            start_ms,
        }
    }
}

/// Everything one successful refresh produced. Replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePayload {
    pub cached_at_ms: i64,
    pub cron: Vec<ScheduleDescriptor>,
    pub cron_events: Vec<Occurrence>,
}

/// Freshness of the data a read returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Fresh,
    Stale,
    /// Regenerated from the persisted descriptor snapshot after a failed
    /// cold-start refresh.
    Fallback,
}

/// Cache metadata as exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub cached_at_ms: i64,
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<bool>,
}

impl CacheMeta {
    pub fn new(state: CacheState, cached_at_ms: i64) -> Self {
        Self {
            cached_at_ms,
            stale: state != CacheState::Fresh,
            fallback: (state == CacheState::Fallback).then_some(true),
        }
    }

    pub fn state(&self) -> CacheState {
        match (self.stale, self.fallback) {
            (_, Some(true)) => CacheState::Fallback,
            (true, _) => CacheState::Stale,
            (false, _) => CacheState::Fresh,
        }
    }
}

/// Result of a coordinator read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronData {
    pub cron: Vec<ScheduleDescriptor>,
    pub cron_events: Vec<Occurrence>,
    pub cache: CacheMeta,
}

/// Format epoch ms as `2026-01-01T00:00:00.000Z`.
pub fn iso_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_is_tagged_by_kind() {
        let rule: ScheduleRule =
            serde_json::from_str(r#"{"kind":"every","everyMs":3600000}"#).unwrap();
        assert_eq!(rule, ScheduleRule::Every { every_ms: 3_600_000 });

        let json = serde_json::to_value(ScheduleRule::Cron {
            expr: "0 9 * * *".into(),
            tz: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"kind": "cron", "expr": "0 9 * * *"}));
    }

    #[test]
    fn cache_meta_omits_fallback_unless_set() {
        let fresh = serde_json::to_value(CacheMeta::new(CacheState::Fresh, 5)).unwrap();
        assert_eq!(fresh, serde_json::json!({"cachedAtMs": 5, "stale": false}));

        let fallback = CacheMeta::new(CacheState::Fallback, 5);
        assert!(fallback.stale);
        assert_eq!(fallback.fallback, Some(true));
        assert_eq!(fallback.state(), CacheState::Fallback);
    }

    #[test]
    fn iso_millis_matches_utc_format() {
        assert_eq!(iso_millis(1000), "1970-01-01T00:00:01.000Z");
        assert_eq!(iso_millis(3_601_000), "1970-01-01T01:00:01.000Z");
    }
}
