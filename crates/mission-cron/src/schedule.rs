use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use mission_core::config::{CronConfig, CRON_HORIZON_DAYS, MAX_EVENTS_PER_JOB};
use tracing::debug;

use crate::error::{CronError, Result};
use crate::types::{Occurrence, ScheduleDescriptor, ScheduleRule};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// How far ahead occurrences are materialized and how many one job may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    pub days: u32,
    pub max_per_job: usize,
}

impl Default for Horizon {
    fn default() -> Self {
        Self {
            days: CRON_HORIZON_DAYS,
            max_per_job: MAX_EVENTS_PER_JOB,
        }
    }
}

impl From<&CronConfig> for Horizon {
    fn from(config: &CronConfig) -> Self {
        Self {
            days: config.horizon_days,
            max_per_job: config.max_events_per_job,
        }
    }
}

/// Inclusive `[start_ms, end_ms]` range a job's occurrences must fall in.
#[derive(Debug, Clone, Copy)]
struct Window {
    start_ms: i64,
    end_ms: i64,
}

impl Window {
    fn contains(&self, t: i64) -> bool {
        self.start_ms <= t && t <= self.end_ms
    }
}

/// Expand `descriptors` into calendar occurrences between each job's
/// creation time and `now_ms + horizon.days`.
///
/// Pure: no I/O, no clock reads. Jobs whose rule cannot be expanded degrade
/// to their reported next run (when it falls inside the window) or to
/// nothing; they never abort the batch.
///
/// The result is sorted by start time, ties broken by job id, with
/// duplicate occurrence ids removed.
pub fn generate(
    descriptors: &[ScheduleDescriptor],
    now_ms: i64,
    horizon: &Horizon,
) -> Vec<Occurrence> {
    let end_ms = now_ms.saturating_add(i64::from(horizon.days).saturating_mul(DAY_MS));
    let mut out = Vec::new();

    for job in descriptors {
        if !job.enabled {
            continue;
        }
        let window = Window {
            start_ms: job.created_at_ms.unwrap_or(now_ms),
            end_ms,
        };

        let times = match expand(job, window, horizon.max_per_job) {
            Ok(times) if !times.is_empty() || !is_cron(job) => times,
            Ok(_) => {
                debug!(job_id = %job.id, "cron window exhausted, using reported next run");
                fallback(job, window)
            }
            Err(e) => {
                debug!(job_id = %job.id, "schedule not expandable ({e}), using reported next run");
                fallback(job, window)
            }
        };
        out.extend(times.into_iter().map(|t| Occurrence::new(job, t)));
    }

    out.sort_by(|a, b| {
        a.start_ms
            .cmp(&b.start_ms)
            .then_with(|| a.cron_id.cmp(&b.cron_id))
    });
    let mut seen = HashSet::new();
    out.retain(|o| seen.insert(o.id.clone()));
    out
}

fn is_cron(job: &ScheduleDescriptor) -> bool {
    matches!(job.schedule, Some(ScheduleRule::Cron { .. }))
}

/// Occurrence instants (epoch ms) for a single job, ascending.
fn expand(job: &ScheduleDescriptor, window: Window, cap: usize) -> Result<Vec<i64>> {
    match &job.schedule {
        Some(ScheduleRule::At { at_ms }) => {
            Ok(window.contains(*at_ms).then_some(*at_ms).into_iter().collect())
        }

        Some(ScheduleRule::Every { every_ms }) => Ok(expand_every(*every_ms, window, cap)),

        Some(ScheduleRule::Cron { expr, tz }) => expand_cron(expr, tz.as_deref(), window, cap),

        None => Err(CronError::NoRule { id: job.id.clone() }),
    }
}

fn expand_every(every_ms: i64, window: Window, cap: usize) -> Vec<i64> {
    // Non-positive steps would never advance.
    if every_ms <= 0 {
        return Vec::new();
    }
    let mut times = Vec::new();
    let mut t = window.start_ms;
    while t <= window.end_ms && times.len() < cap {
        times.push(t);
        t = match t.checked_add(every_ms) {
            Some(next) => next,
            None => break,
        };
    }
    times
}

fn expand_cron(expr: &str, tz: Option<&str>, window: Window, cap: usize) -> Result<Vec<i64>> {
    let schedule = parse_cron(expr)?;
    let tz = parse_tz(tz)?;
    let start = DateTime::<Utc>::from_timestamp_millis(window.start_ms)
        .ok_or_else(|| CronError::Parse(format!("start {} out of range", window.start_ms)))?
        .with_timezone(&tz);

    Ok(schedule
        .after(&start)
        .map(|dt| dt.timestamp_millis())
        .take_while(|t| *t <= window.end_ms)
        .take(cap)
        .collect())
}

fn fallback(job: &ScheduleDescriptor, window: Window) -> Vec<i64> {
    job.next_run_at_ms
        .filter(|t| window.contains(*t))
        .into_iter()
        .collect()
}

const WEEKDAYS: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Bring a standard cron expression into the form the `cron` crate expects:
/// `sec min hour day-of-month month day-of-week [year]`.
///
/// 5-field expressions get a `0` seconds field. The day-of-week field is
/// rewritten into names, since standard cron counts 0 (or 7) = Sunday while
/// the crate counts 1 = Sunday.
pub(crate) fn normalize_cron(expr: &str) -> String {
    let mut fields: Vec<String> = expr.split_whitespace().map(String::from).collect();
    if fields.len() == 5 {
        fields.insert(0, "0".to_string());
    }
    if let Some(dow) = fields.get_mut(5) {
        if let Some(names) = weekday_names(dow) {
            *dow = names;
        }
    }
    fields.join(" ")
}

/// Expand a standard day-of-week field (lists, ranges, steps, numbers or
/// names) into a comma-separated list of names. `None` when the field is
/// not understood; the crate then reports the parse error itself.
fn weekday_names(field: &str) -> Option<String> {
    if field == "*" || field == "?" {
        return Some(field.to_string());
    }
    let mut days = [false; 7];
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, step.parse::<u32>().ok().filter(|s| *s > 0)?),
            None => (item, 1),
        };
        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((a, b)) = range.split_once('-') {
            let start = weekday_number(a)?;
            let mut end = weekday_number(b)?;
            // `FRI-SUN`: Sunday closes the week
            if end == 0 && start > 0 {
                end = 7;
            }
            if end < start {
                return None;
            }
            (start, end)
        } else {
            let start = weekday_number(range)?;
            (start, if item.contains('/') { 6 } else { start })
        };
        let mut day = start;
        while day <= end {
            days[(day % 7) as usize] = true;
            day += step;
        }
    }
    let names: Vec<&str> = WEEKDAYS
        .iter()
        .zip(days)
        .filter_map(|(name, on)| on.then_some(*name))
        .collect();
    (!names.is_empty()).then(|| names.join(","))
}

/// 0-7 (both ends Sunday) or a three-letter name.
fn weekday_number(token: &str) -> Option<u32> {
    match token.parse::<u32>() {
        Ok(n) => (n <= 7).then_some(n),
        Err(_) => WEEKDAYS
            .iter()
            .position(|d| d.eq_ignore_ascii_case(token))
            .map(|i| i as u32),
    }
}

pub(crate) fn parse_cron(expr: &str) -> Result<Schedule> {
    Schedule::from_str(&normalize_cron(expr))
        .map_err(|e| CronError::Parse(format!("invalid cron expression '{expr}': {e}")))
}

fn parse_tz(tz: Option<&str>) -> Result<Tz> {
    match tz.map(str::trim).filter(|name| !name.is_empty()) {
        None => Ok(Tz::UTC),
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| CronError::Parse(format!("unknown timezone '{name}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn ms(rfc3339: &str) -> i64 {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .timestamp_millis()
    }

    fn job(id: &str, created_at_ms: i64, rule: Option<ScheduleRule>) -> ScheduleDescriptor {
        ScheduleDescriptor {
            id: id.to_string(),
            name: format!("job {id}"),
            enabled: true,
            created_at_ms: Some(created_at_ms),
            schedule: rule,
            next_run_at_ms: None,
        }
    }

    fn every(every_ms: i64) -> Option<ScheduleRule> {
        Some(ScheduleRule::Every { every_ms })
    }

    fn cron(expr: &str, tz: Option<&str>) -> Option<ScheduleRule> {
        Some(ScheduleRule::Cron {
            expr: expr.to_string(),
            tz: tz.map(String::from),
        })
    }

    fn one_day() -> Horizon {
        Horizon {
            days: 1,
            ..Horizon::default()
        }
    }

    fn starts(events: &[Occurrence]) -> Vec<i64> {
        events.iter().map(|e| e.start_ms).collect()
    }

    fn assert_sorted_unique(events: &[Occurrence]) {
        for pair in events.windows(2) {
            assert!(pair[0].start_ms <= pair[1].start_ms, "not sorted: {pair:?}");
        }
        let ids: HashSet<_> = events.iter().map(|e| &e.id).collect();
        assert_eq!(ids.len(), events.len(), "duplicate occurrence ids");
    }

    #[test]
    fn every_steps_from_creation_through_horizon_end() {
        let jobs = [job("j1", 1000, every(HOUR_MS))];
        let events = generate(&jobs, 1000, &one_day());

        // {T, T+I, ...} ∩ [T, T + 1 day]; the horizon end itself is included.
        let expected: Vec<i64> = (0..=24).map(|k| 1000 + k * HOUR_MS).collect();
        assert_eq!(starts(&events), expected);
        assert_eq!(events[0].id, "cron:j1:1000");
        assert_eq!(events[0].start, "1970-01-01T00:00:01.000Z");
        assert_eq!(events[1].start_ms, 3_601_000);
        assert_eq!(events[2].start_ms, 7_201_000);
        assert!(events.iter().all(|e| e.cron_id == "j1" && e.title == "job j1"));
    }

    #[test]
    fn every_is_truncated_at_the_per_job_cap() {
        let jobs = [job("tiny", 0, every(1))];
        let events = generate(&jobs, 0, &one_day());
        assert_eq!(events.len(), 600);
        assert_eq!(events.last().unwrap().start_ms, 599);

        let capped = Horizon {
            days: 1,
            max_per_job: 10,
        };
        assert_eq!(generate(&jobs, 0, &capped).len(), 10);
    }

    #[test]
    fn non_positive_interval_yields_nothing() {
        let jobs = [job("zero", 0, every(0)), job("neg", 0, every(-5))];
        assert!(generate(&jobs, 0, &Horizon::default()).is_empty());
    }

    #[test]
    fn disabled_jobs_yield_nothing_regardless_of_rule() {
        let now = ms("2026-01-01T00:00:00Z");
        let mut jobs = vec![
            job("a", now, Some(ScheduleRule::At { at_ms: now + HOUR_MS })),
            job("b", now, every(HOUR_MS)),
            job("c", now, cron("0 * * * *", None)),
            job("d", now, None),
        ];
        for j in &mut jobs {
            j.enabled = false;
            j.next_run_at_ms = Some(now + HOUR_MS);
        }
        assert!(generate(&jobs, now, &Horizon::default()).is_empty());
    }

    #[test]
    fn at_emits_only_inside_window() {
        let now = ms("2026-01-01T00:00:00Z");
        let inside = job("in", now, Some(ScheduleRule::At { at_ms: now + HOUR_MS }));
        let before_creation = job("early", now, Some(ScheduleRule::At { at_ms: now - 1 }));
        let mut past_horizon = job(
            "late",
            now,
            Some(ScheduleRule::At {
                at_ms: now + 2 * DAY_MS,
            }),
        );
        // An out-of-window one-shot is not a failure; no fallback applies.
        past_horizon.next_run_at_ms = Some(now + HOUR_MS);

        let events = generate(&[inside, before_creation, past_horizon], now, &one_day());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, format!("cron:in:{}", now + HOUR_MS));
    }

    #[test]
    fn cron_hourly_fills_the_window() {
        let now = ms("2026-01-01T00:00:00Z");
        let events = generate(&[job("h", now, cron("0 * * * *", None))], now, &one_day());

        // Strictly after the start, up to and including the horizon end.
        assert_eq!(events.len(), 24);
        assert_eq!(events[0].start, "2026-01-01T01:00:00.000Z");
        assert_eq!(events[23].start, "2026-01-02T00:00:00.000Z");
    }

    #[test]
    fn cron_honors_timezone() {
        let now = ms("2026-01-01T00:00:00Z");
        let jobs = [job("ny", now, cron("0 9 * * *", Some("America/New_York")))];
        let events = generate(&jobs, now, &Horizon { days: 2, max_per_job: 600 });

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, "2026-01-01T14:00:00.000Z");
        assert_eq!(events[1].start, "2026-01-02T14:00:00.000Z");
    }

    #[test]
    fn six_field_cron_is_accepted() {
        let now = ms("2026-01-01T00:00:00Z");
        let events = generate(&[job("s", now, cron("30 0 12 * * *", None))], now, &one_day());
        assert_eq!(starts(&events), vec![ms("2026-01-01T12:00:30Z")]);
    }

    #[test]
    fn unparseable_cron_falls_back_to_reported_next_run() {
        let now = ms("2026-01-01T00:00:00Z");
        let mut bad = job("bad", now, cron("definitely not cron", None));
        bad.next_run_at_ms = Some(now + 3 * HOUR_MS);
        let silent = job("silent", now, cron("also bad", None));
        let mut bad_tz = job("tz", now, cron("0 * * * *", Some("Mars/Olympus_Mons")));
        bad_tz.next_run_at_ms = Some(now + HOUR_MS);

        let events = generate(&[bad, silent, bad_tz], now, &one_day());
        assert_eq!(
            events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec![
                format!("cron:tz:{}", now + HOUR_MS),
                format!("cron:bad:{}", now + 3 * HOUR_MS),
            ]
        );
    }

    #[test]
    fn exhausted_cron_window_falls_back() {
        let now = ms("2026-03-01T00:00:00Z");
        // New Year only; nothing inside a 14-day March window.
        let mut yearly = job("ny", now, cron("0 0 1 1 *", None));
        yearly.next_run_at_ms = Some(now + DAY_MS);
        let events = generate(&[yearly], now, &Horizon::default());
        assert_eq!(starts(&events), vec![now + DAY_MS]);
    }

    #[test]
    fn missing_rule_uses_next_run_only_when_inside_window() {
        let now = ms("2026-01-01T00:00:00Z");
        let mut hinted = job("hinted", now, None);
        hinted.next_run_at_ms = Some(now + HOUR_MS);
        let bare = job("bare", now, None);
        let mut far = job("far", now, None);
        far.next_run_at_ms = Some(now + 30 * DAY_MS);

        let events = generate(&[hinted, bare, far], now, &Horizon::default());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].cron_id, "hinted");
    }

    #[test]
    fn missing_creation_time_starts_at_now() {
        let now = ms("2026-01-01T00:00:00Z");
        let mut j = job("fresh", 0, every(6 * HOUR_MS));
        j.created_at_ms = None;
        let events = generate(&[j], now, &one_day());
        assert_eq!(events[0].start_ms, now);
        assert_eq!(events.len(), 5);
    }

    #[test]
    fn ties_break_by_job_id_and_duplicates_collapse() {
        let now = ms("2026-01-01T00:00:00Z");
        let at = Some(ScheduleRule::At { at_ms: now + HOUR_MS });
        let jobs = [
            job("b", now, at.clone()),
            job("a", now, at.clone()),
            job("a", now, at),
        ];
        let events = generate(&jobs, now, &one_day());
        let ids: Vec<_> = events.iter().map(|e| e.cron_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn mixed_batch_is_sorted_and_unique() {
        let now = ms("2026-01-01T00:00:00Z");
        let mut hinted = job("hint", now, cron("nope", None));
        hinted.next_run_at_ms = Some(now + 90 * 60 * 1000);
        let jobs = [
            job("every", now - DAY_MS, every(5 * HOUR_MS)),
            job("hourly", now, cron("0 * * * *", Some("Europe/Berlin"))),
            job("once", now, Some(ScheduleRule::At { at_ms: now + 2 * HOUR_MS })),
            hinted,
            job("broken", now, every(-1)),
        ];
        let events = generate(&jobs, now, &Horizon::default());
        assert!(!events.is_empty());
        assert_sorted_unique(&events);
        let horizon_end = now + 14 * DAY_MS;
        assert!(events.iter().all(|e| e.start_ms <= horizon_end));
        assert!(events
            .iter()
            .filter(|e| e.cron_id == "every")
            .all(|e| e.start_ms >= now - DAY_MS));
    }

    #[test]
    fn normalize_prepends_seconds_for_five_fields() {
        assert_eq!(normalize_cron("* * * * *"), "0 * * * * *");
        assert_eq!(normalize_cron(" 0 9 * * 1 "), "0 0 9 * * MON");
        assert_eq!(normalize_cron("0 0 9 * * *"), "0 0 9 * * *");
        assert!(parse_cron("0 9 * * *").is_ok());
        assert!(parse_cron("not a cron").is_err());
    }

    #[test]
    fn weekday_field_uses_standard_numbering() {
        assert_eq!(normalize_cron("0 9 * * 0"), "0 0 9 * * SUN");
        assert_eq!(normalize_cron("0 9 * * 7"), "0 0 9 * * SUN");
        assert_eq!(normalize_cron("0 9 * * 1-5"), "0 0 9 * * MON,TUE,WED,THU,FRI");
        assert_eq!(normalize_cron("0 9 * * 1,3"), "0 0 9 * * MON,WED");
        assert_eq!(normalize_cron("0 9 * * */2"), "0 0 9 * * SUN,TUE,THU,SAT");
        assert_eq!(normalize_cron("0 9 * * 5-7"), "0 0 9 * * SUN,FRI,SAT");
        assert_eq!(normalize_cron("0 9 * * fri-sun"), "0 0 9 * * SUN,FRI,SAT");
        assert_eq!(normalize_cron("0 0 9 * * 1"), "0 0 9 * * MON");
        assert!(parse_cron("0 9 * * 8").is_err());
    }

    fn first_week(expr: &str) -> Vec<String> {
        // 2026-01-01 is a Thursday.
        let now = ms("2026-01-01T00:00:00Z");
        let week = Horizon { days: 7, max_per_job: 600 };
        generate(&[job("w", now, cron(expr, None))], now, &week)
            .into_iter()
            .map(|e| e.start)
            .collect()
    }

    #[test]
    fn weekday_schedules_land_on_the_right_days() {
        assert_eq!(first_week("0 9 * * 1"), vec!["2026-01-05T09:00:00.000Z"]);
        assert_eq!(first_week("0 9 * * 0"), vec!["2026-01-04T09:00:00.000Z"]);
        assert_eq!(first_week("0 9 * * 7"), vec!["2026-01-04T09:00:00.000Z"]);
        assert_eq!(
            first_week("0 9 * * 1-5"),
            vec![
                "2026-01-01T09:00:00.000Z",
                "2026-01-02T09:00:00.000Z",
                "2026-01-05T09:00:00.000Z",
                "2026-01-06T09:00:00.000Z",
                "2026-01-07T09:00:00.000Z",
            ]
        );
    }
}
