//! # Metrics Service
//!
//! A per-process service that tracks requests end-to-end and rolls up
//! per-agent, per-tool, and per-model usage counters. Every mutation
//! serializes on one lock; when a persistence path is configured, the
//! whole snapshot is rewritten to disk inside that same lock (a full-file
//! rewrite, not an append log, so a reader never observes a half-written
//! record).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// One request's lifecycle, from `start_request_tracking` to
/// `end_request_tracking`. Never mutated after `end_ts` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestRecord {
    /// unique id for this request
    pub request_id: String,
    /// when tracking started
    pub start_ts: DateTime<Utc>,
    /// when tracking ended, if it has
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<DateTime<Utc>>,
    /// `end_ts - start_ts` in milliseconds, once ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// the prompt this request carried, if supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// agent ids invoked for this request
    #[serde(default)]
    pub agents_used: Vec<String>,
    /// tool ids invoked for this request
    #[serde(default)]
    pub tools_used: Vec<String>,
    /// model ids invoked for this request
    #[serde(default)]
    pub models_used: Vec<String>,
    /// whether the request ultimately succeeded, once ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// failure reason, if `success == Some(false)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// caller-supplied metadata, merged at start
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

/// Rolling counters for one id (agent, tool, or model).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageCounters {
    /// number of invocations recorded
    pub total: u64,
    /// number of those that succeeded
    pub successes: u64,
    /// running average duration in milliseconds
    pub avg_duration_ms: f64,
    /// most recent invocation timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    /// total input tokens recorded (models only)
    #[serde(default)]
    pub tokens_in: u64,
    /// total output tokens recorded (models only)
    #[serde(default)]
    pub tokens_out: u64,
}

impl UsageCounters {
    fn record(&mut self, duration_ms: Option<u64>, success: bool, at: DateTime<Utc>) {
        if let Some(ms) = duration_ms {
            let n = self.total as f64;
            self.avg_duration_ms = (self.avg_duration_ms * n + ms as f64) / (n + 1.0);
        }
        self.total += 1;
        if success {
            self.successes += 1;
        }
        self.last_used = Some(at);
    }
}

/// Window-scoped usage: the all-time rolling counters plus a count derived
/// by filtering `RequestRecord`s whose `start_ts` falls inside the
/// requested window (or all requests, if no window was given).
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    /// all-time rolling counters
    #[serde(flatten)]
    pub counters: UsageCounters,
    /// count of requests in the queried window that used this id
    pub period_total: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MetricsSnapshot {
    requests: HashMap<String, RequestRecord>,
    agent_usage: HashMap<String, UsageCounters>,
    tool_usage: HashMap<String, UsageCounters>,
    model_usage: HashMap<String, UsageCounters>,
}

/// Tracks requests and the agent/tool/model usage inside them.
///
/// Safe to share behind an `Arc`; every public method takes `&self`. With
/// `persistence_path` set, the complete snapshot is rewritten to that path
/// (via a sibling temp file + rename, so readers never see a torn file)
/// after every mutating call.
pub struct MetricsService {
    state: Mutex<MetricsSnapshot>,
    persistence_path: Option<PathBuf>,
}

impl MetricsService {
    /// An in-memory-only service; nothing is written to disk.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MetricsSnapshot::default()),
            persistence_path: None,
        }
    }

    /// A service that persists its snapshot to `path` after every mutation,
    /// loading any existing snapshot there first.
    pub fn with_persistence(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::other(format!("failed to read metrics file: {e}")))?;
            serde_json::from_str(&contents)
                .map_err(|e| Error::other(format!("corrupt metrics file: {e}")))?
        } else {
            MetricsSnapshot::default()
        };
        Ok(Self {
            state: Mutex::new(state),
            persistence_path: Some(path),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsSnapshot> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, snapshot: &MetricsSnapshot) {
        let Some(path) = &self.persistence_path else {
            return;
        };
        if let Err(e) = write_atomic(path, snapshot) {
            log::warn!("failed to persist metrics to {}: {e}", path.display());
        }
    }

    /// Begin tracking a request, generating a request id if none was given.
    /// Returns the id used, since it may have been generated here.
    pub fn start_request_tracking(
        &self,
        request_id: Option<String>,
        prompt: Option<String>,
        metadata: Option<HashMap<String, Value>>,
    ) -> String {
        let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut state = self.lock();
        state.requests.insert(
            request_id.clone(),
            RequestRecord {
                request_id: request_id.clone(),
                start_ts: Utc::now(),
                end_ts: None,
                duration_ms: None,
                prompt,
                agents_used: Vec::new(),
                tools_used: Vec::new(),
                models_used: Vec::new(),
                success: None,
                error: None,
                metadata: metadata.unwrap_or_default(),
            },
        );
        self.persist(&state);
        request_id
    }

    /// End tracking for `request_id`. A no-op (logged) if the id is unknown
    /// — the request record is the source of truth, and metrics failures
    /// must never propagate into the orchestrator's control flow.
    pub fn end_request_tracking(&self, request_id: &str, success: bool, error: Option<String>) {
        let mut state = self.lock();
        let Some(record) = state.requests.get_mut(request_id) else {
            log::warn!("end_request_tracking: unknown request id '{request_id}'");
            return;
        };
        let now = Utc::now();
        record.end_ts = Some(now);
        record.duration_ms = Some((now - record.start_ts).num_milliseconds().max(0));
        record.success = Some(success);
        record.error = error;
        self.persist(&state);
    }

    /// Record that `agent_id` was invoked for `request_id`.
    pub fn track_agent_usage(
        &self,
        request_id: &str,
        agent_id: &str,
        duration_ms: Option<u64>,
        success: bool,
    ) {
        let mut state = self.lock();
        let now = Utc::now();
        if let Some(record) = state.requests.get_mut(request_id) {
            if !record.agents_used.iter().any(|a| a == agent_id) {
                record.agents_used.push(agent_id.to_string());
            }
        }
        state
            .agent_usage
            .entry(agent_id.to_string())
            .or_default()
            .record(duration_ms, success, now);
        self.persist(&state);
    }

    /// Record that `tool_id` was invoked for `request_id`.
    pub fn track_tool_usage(&self, request_id: &str, tool_id: &str, duration_ms: Option<u64>, success: bool) {
        let mut state = self.lock();
        let now = Utc::now();
        if let Some(record) = state.requests.get_mut(request_id) {
            if !record.tools_used.iter().any(|t| t == tool_id) {
                record.tools_used.push(tool_id.to_string());
            }
        }
        state
            .tool_usage
            .entry(tool_id.to_string())
            .or_default()
            .record(duration_ms, success, now);
        self.persist(&state);
    }

    /// Record that `model_id` was invoked for `request_id`, optionally with
    /// token counts.
    pub fn track_model_usage(
        &self,
        request_id: &str,
        model_id: &str,
        tokens_in: Option<u64>,
        tokens_out: Option<u64>,
        duration_ms: Option<u64>,
        success: bool,
    ) {
        let mut state = self.lock();
        let now = Utc::now();
        if let Some(record) = state.requests.get_mut(request_id) {
            if !record.models_used.iter().any(|m| m == model_id) {
                record.models_used.push(model_id.to_string());
            }
        }
        let usage = state.model_usage.entry(model_id.to_string()).or_default();
        usage.record(duration_ms, success, now);
        usage.tokens_in += tokens_in.unwrap_or(0);
        usage.tokens_out += tokens_out.unwrap_or(0);
        self.persist(&state);
    }

    /// A copy of one request's record, if it exists.
    pub fn request(&self, request_id: &str) -> Option<RequestRecord> {
        self.lock().requests.get(request_id).cloned()
    }

    /// Per-agent usage summaries. `agent_id` narrows to one id; `window`
    /// narrows `period_total` to requests whose `start_ts` falls in
    /// `[start, end]` inclusive.
    pub fn get_agent_metrics(
        &self,
        agent_id: Option<&str>,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> HashMap<String, UsageSummary> {
        let state = self.lock();
        summarize(&state.agent_usage, &state.requests, agent_id, window, |r, id| {
            r.agents_used.iter().any(|a| a == id)
        })
    }

    /// Per-tool usage summaries; see [`MetricsService::get_agent_metrics`].
    pub fn get_tool_metrics(
        &self,
        tool_id: Option<&str>,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> HashMap<String, UsageSummary> {
        let state = self.lock();
        summarize(&state.tool_usage, &state.requests, tool_id, window, |r, id| {
            r.tools_used.iter().any(|t| t == id)
        })
    }

    /// Per-model usage summaries; see [`MetricsService::get_agent_metrics`].
    pub fn get_model_metrics(
        &self,
        model_id: Option<&str>,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> HashMap<String, UsageSummary> {
        let state = self.lock();
        summarize(&state.model_usage, &state.requests, model_id, window, |r, id| {
            r.models_used.iter().any(|m| m == id)
        })
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(
    usage: &HashMap<String, UsageCounters>,
    requests: &HashMap<String, RequestRecord>,
    only_id: Option<&str>,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    uses_id: impl Fn(&RequestRecord, &str) -> bool,
) -> HashMap<String, UsageSummary> {
    usage
        .iter()
        .filter(|(id, _)| only_id.is_none_or(|want| want == id.as_str()))
        .map(|(id, counters)| {
            let period_total = requests
                .values()
                .filter(|r| match window {
                    Some((start, end)) => r.start_ts >= start && r.start_ts <= end,
                    None => true,
                })
                .filter(|r| uses_id(r, id))
                .count() as u64;
            (
                id.clone(),
                UsageSummary {
                    counters: counters.clone(),
                    period_total,
                },
            )
        })
        .collect()
}

fn write_atomic(path: &Path, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_ts_is_never_before_start_ts() {
        let metrics = MetricsService::new();
        let id = metrics.start_request_tracking(None, Some("hi".to_string()), None);
        metrics.end_request_tracking(&id, true, None);
        let record = metrics.request(&id).unwrap();
        assert!(record.end_ts.unwrap() >= record.start_ts);
        assert_eq!(
            record.duration_ms.unwrap(),
            (record.end_ts.unwrap() - record.start_ts).num_milliseconds()
        );
    }

    #[test]
    fn tracking_agent_usage_adds_it_to_the_request_record() {
        let metrics = MetricsService::new();
        let id = metrics.start_request_tracking(None, None, None);
        metrics.track_agent_usage(&id, "coding_assistant", Some(120), true);
        let record = metrics.request(&id).unwrap();
        assert_eq!(record.agents_used, vec!["coding_assistant".to_string()]);
    }

    #[test]
    fn agent_usage_counters_accumulate_across_requests() {
        let metrics = MetricsService::new();
        let a = metrics.start_request_tracking(None, None, None);
        let b = metrics.start_request_tracking(None, None, None);
        metrics.track_agent_usage(&a, "coding_assistant", Some(100), true);
        metrics.track_agent_usage(&b, "coding_assistant", Some(200), false);
        let summary = metrics.get_agent_metrics(Some("coding_assistant"), None);
        let usage = summary.get("coding_assistant").unwrap();
        assert_eq!(usage.counters.total, 2);
        assert_eq!(usage.counters.successes, 1);
        assert_eq!(usage.counters.avg_duration_ms, 150.0);
        assert_eq!(usage.period_total, 2);
    }

    #[test]
    fn period_total_respects_the_requested_window() {
        let metrics = MetricsService::new();
        let id = metrics.start_request_tracking(None, None, None);
        metrics.track_tool_usage(&id, "add_numbers", Some(5), true);

        let far_future = Utc::now() + chrono::Duration::days(365);
        let narrow_window = (far_future, far_future + chrono::Duration::days(1));
        let summary = metrics.get_tool_metrics(Some("add_numbers"), Some(narrow_window));
        assert_eq!(summary.get("add_numbers").unwrap().period_total, 0);

        let wide_window = (Utc::now() - chrono::Duration::days(1), Utc::now() + chrono::Duration::days(1));
        let summary = metrics.get_tool_metrics(Some("add_numbers"), Some(wide_window));
        assert_eq!(summary.get("add_numbers").unwrap().period_total, 1);
    }

    #[test]
    fn model_usage_accumulates_token_totals() {
        let metrics = MetricsService::new();
        let id = metrics.start_request_tracking(None, None, None);
        metrics.track_model_usage(&id, "local-standard", Some(100), Some(50), Some(300), true);
        metrics.track_model_usage(&id, "local-standard", Some(10), Some(5), Some(100), true);
        let summary = metrics.get_model_metrics(Some("local-standard"), None);
        let usage = summary.get("local-standard").unwrap();
        assert_eq!(usage.counters.tokens_in, 110);
        assert_eq!(usage.counters.tokens_out, 55);
    }

    #[test]
    fn ending_an_unknown_request_does_not_panic() {
        let metrics = MetricsService::new();
        metrics.end_request_tracking("never-started", false, Some("x".to_string()));
    }

    #[test]
    fn persistence_round_trips_through_a_file() {
        let dir = std::env::temp_dir().join(format!("metrics-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("metrics.json");

        let metrics = MetricsService::with_persistence(&path).unwrap();
        let id = metrics.start_request_tracking(None, Some("hello".to_string()), None);
        metrics.end_request_tracking(&id, true, None);

        let reloaded = MetricsService::with_persistence(&path).unwrap();
        let record = reloaded.request(&id).unwrap();
        assert_eq!(record.prompt.as_deref(), Some("hello"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
