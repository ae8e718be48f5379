//! Parsing of `openclaw cron list --json` output into [`ScheduleDescriptor`]s.
//!
//! The external records are loosely typed: the rule may live under
//! `schedule` or at the top level, and fields are present or absent per
//! kind. Everything is folded into a single [`ScheduleRule`] here so the
//! generator only ever matches on the enum.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{CronError, Result};
use crate::types::{ScheduleDescriptor, ScheduleRule};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawJob {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    created_at_ms: Option<i64>,
    #[serde(default)]
    expr: Option<String>,
    #[serde(default)]
    tz: Option<String>,
    #[serde(default)]
    next_run_at_ms: Option<i64>,
    #[serde(default)]
    state: Option<RawState>,
    #[serde(default)]
    schedule: Option<RawSchedule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawState {
    #[serde(default)]
    next_run_at_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSchedule {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    expr: Option<String>,
    #[serde(default)]
    tz: Option<String>,
    #[serde(default)]
    at: Option<String>,
    #[serde(default)]
    every_ms: Option<i64>,
}

impl RawJob {
    fn into_descriptor(self) -> ScheduleDescriptor {
        let schedule = self.schedule.unwrap_or_default();
        let kind = schedule.kind.as_deref();

        let at = match kind {
            Some("at") => schedule.at.as_deref().and_then(parse_instant),
            _ => None,
        };
        let every = match kind {
            Some("every") => schedule.every_ms,
            _ => None,
        };

        let rule = if let Some(at_ms) = at {
            Some(ScheduleRule::At { at_ms })
        } else if let Some(every_ms) = every {
            Some(ScheduleRule::Every { every_ms })
        } else {
            schedule
                .expr
                .or(self.expr)
                .filter(|e| !e.trim().is_empty())
                .map(|expr| ScheduleRule::Cron {
                    expr,
                    tz: schedule.tz.or(self.tz),
                })
        };

        ScheduleDescriptor {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            enabled: self.enabled.unwrap_or(true),
            created_at_ms: self.created_at_ms,
            schedule: rule,
            next_run_at_ms: self.state.and_then(|s| s.next_run_at_ms).or(self.next_run_at_ms),
        }
    }
}

/// RFC 3339 (`2026-01-01T09:00:00Z`) or a bare epoch-ms number as text.
fn parse_instant(s: &str) -> Option<i64> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .ok()
        .or_else(|| s.parse::<i64>().ok())
}

/// Skip any banner/log text the CLI prints before its JSON.
///
/// Returns the input from the first `[` or `{` onwards, or the whole input
/// when neither occurs.
pub fn extract_json(raw: &str) -> &str {
    match raw.find(['[', '{']) {
        Some(start) => &raw[start..],
        None => raw,
    }
}

/// Parse CLI output into descriptors.
///
/// Accepts either a bare array of jobs or `{"jobs": [...]}`. Output that is
/// not JSON, or JSON of another shape, is a [`CronError::Fetch`]. Individual
/// jobs that do not deserialize are skipped.
pub fn parse_snapshot(raw: &str) -> Result<Vec<ScheduleDescriptor>> {
    let text = extract_json(raw.trim());
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CronError::Fetch(format!("cron list output is not JSON: {e}")))?;

    let jobs = match value {
        Value::Array(jobs) => jobs,
        Value::Object(mut obj) => match obj.remove("jobs") {
            Some(Value::Array(jobs)) => jobs,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                return Err(CronError::Fetch(format!(
                    "cron list `jobs` is not an array: {other}"
                )))
            }
        },
        other => {
            return Err(CronError::Fetch(format!(
                "unexpected cron list payload: {other}"
            )))
        }
    };

    let descriptors = jobs
        .into_iter()
        .filter_map(|job| match serde_json::from_value::<RawJob>(job) {
            Ok(raw) => Some(raw.into_descriptor()),
            Err(e) => {
                warn!("skipping malformed cron job: {e}");
                None
            }
        })
        .collect();
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_skips_leading_noise() {
        assert_eq!(extract_json("warn: stale plugin\n[1,2]"), "[1,2]");
        assert_eq!(extract_json("banner {\"jobs\":[]}"), "{\"jobs\":[]}");
        assert_eq!(extract_json("x { [ ]"), "{ [ ]");
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn accepts_bare_array_and_jobs_object() {
        let array = parse_snapshot(r#"[{"id":"a","name":"A","enabled":true}]"#).unwrap();
        assert_eq!(array.len(), 1);

        let wrapped =
            parse_snapshot("Config loaded.\n{\"jobs\":[{\"id\":\"a\"},{\"id\":\"b\"}]}").unwrap();
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[1].name, "b");
        assert!(wrapped[1].enabled);

        assert!(parse_snapshot("{}").unwrap().is_empty());
    }

    #[test]
    fn non_json_or_wrong_shape_is_a_fetch_error() {
        assert!(matches!(parse_snapshot("gateway offline"), Err(CronError::Fetch(_))));
        assert!(matches!(parse_snapshot("[1, 2"), Err(CronError::Fetch(_))));
        assert!(matches!(parse_snapshot(r#"{"jobs": 3}"#), Err(CronError::Fetch(_))));
    }

    #[test]
    fn malformed_jobs_are_skipped() {
        let jobs = parse_snapshot(r#"[{"name":"no id"}, {"id":"ok"}, 7]"#).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "ok");
    }

    #[test]
    fn normalizes_each_rule_kind() {
        let jobs = parse_snapshot(
            r#"[
              {"id":"at","name":"Once","enabled":true,"createdAtMs":1000,
               "schedule":{"kind":"at","at":"2026-01-01T09:00:00Z"}},
              {"id":"every","name":"Poll","enabled":true,
               "schedule":{"kind":"every","everyMs":3600000}},
              {"id":"cron","name":"Daily","enabled":false,
               "schedule":{"kind":"cron","expr":"0 9 * * *","tz":"Europe/Berlin"}},
              {"id":"legacy","name":"Top-level","expr":"*/5 * * * *","tz":"UTC"},
              {"id":"none","name":"Unknown","state":{"nextRunAtMs":42},"nextRunAtMs":7}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            jobs[0].schedule,
            Some(ScheduleRule::At {
                at_ms: 1_767_258_000_000
            })
        );
        assert_eq!(jobs[0].created_at_ms, Some(1000));
        assert_eq!(jobs[1].schedule, Some(ScheduleRule::Every { every_ms: 3_600_000 }));
        assert_eq!(
            jobs[2].schedule,
            Some(ScheduleRule::Cron {
                expr: "0 9 * * *".into(),
                tz: Some("Europe/Berlin".into())
            })
        );
        assert!(!jobs[2].enabled);
        assert_eq!(
            jobs[3].schedule,
            Some(ScheduleRule::Cron {
                expr: "*/5 * * * *".into(),
                tz: Some("UTC".into())
            })
        );
        assert_eq!(jobs[4].schedule, None);
        // state.nextRunAtMs wins over the top-level field.
        assert_eq!(jobs[4].next_run_at_ms, Some(42));
    }

    #[test]
    fn zero_interval_is_kept_for_the_generator_to_skip() {
        let jobs =
            parse_snapshot(r#"[{"id":"z","schedule":{"kind":"every","everyMs":0}}]"#).unwrap();
        assert_eq!(jobs[0].schedule, Some(ScheduleRule::Every { every_ms: 0 }));
    }

    #[test]
    fn unparseable_at_falls_through_to_expression() {
        let jobs = parse_snapshot(
            r#"[{"id":"x","expr":"0 * * * *","schedule":{"kind":"at","at":"tomorrow-ish"}}]"#,
        )
        .unwrap();
        assert!(matches!(jobs[0].schedule, Some(ScheduleRule::Cron { .. })));
    }
}
