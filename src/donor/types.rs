//! Domain types for the donor task integration.

use serde::{Deserialize, Serialize};

/// Provenance tag stamped on every record mirrored from the donor DB.
pub const DONOR_SOURCE: &str = "donor_db";

/// GTD-side status vocabulary for donor tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GtdStatus {
  NextAction,
  Completed,
  Deleted,
}

impl GtdStatus {
  /// Translate a donor DB status code ("pending", "completed", "cancelled").
  ///
  /// Total: an unrecognized code maps to `NextAction` so an unknown donor
  /// state surfaces for the user to look at instead of being hidden.
  pub fn from_donor(status: &str) -> Self {
    match status {
      "completed" => Self::Completed,
      "cancelled" => Self::Deleted,
      _ => Self::NextAction,
    }
  }

  /// Translate back to the donor DB vocabulary.
  ///
  /// Only the two terminal user actions have a donor equivalent; everything
  /// else is unsupported and never guessed at.
  pub fn to_donor(self) -> Option<&'static str> {
    match self {
      Self::Completed => Some("completed"),
      Self::Deleted => Some("cancelled"),
      Self::NextAction => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::NextAction => "next_action",
      Self::Completed => "completed",
      Self::Deleted => "deleted",
    }
  }
}

/// GTD-shaped view of a donor task.
///
/// The donor DB id stays the join key; no local id is minted for mirrored
/// records. Never mutated in place: any change requires re-mapping a fresh
/// donor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedTask {
  pub donor_task_id: u64,
  pub title: String,
  pub status: GtdStatus,
  /// Original donor status string, preserved for round-tripping and audit.
  pub donor_status: Option<String>,
  pub task_date: Option<String>,
  pub notes: Option<String>,
  pub is_thank: bool,
  pub source: String,
}

impl MappedTask {
  /// Skeletal record built from request inputs, used when the donor DB is
  /// momentarily unavailable right after a successful status update.
  pub fn synthesized(donor_task_id: u64, status: GtdStatus) -> Self {
    Self {
      donor_task_id,
      title: String::new(),
      status,
      donor_status: status.to_donor().map(String::from),
      task_date: None,
      notes: None,
      is_thank: false,
      source: DONOR_SOURCE.to_string(),
    }
  }
}

/// Live-side status in a drift entry: the GTD translation of what the donor
/// DB reports now, or the sentinel for a cached id absent from the live
/// fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
  NextAction,
  Completed,
  Deleted,
  MissingFromLive,
}

impl From<GtdStatus> for LiveStatus {
  fn from(status: GtdStatus) -> Self {
    match status {
      GtdStatus::NextAction => Self::NextAction,
      GtdStatus::Completed => Self::Completed,
      GtdStatus::Deleted => Self::Deleted,
    }
  }
}

/// One cached-vs-live mismatch found by the consistency audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEntry {
  pub donor_task_id: u64,
  pub cached_status: GtdStatus,
  pub live_status: LiveStatus,
}

/// Outcome of a consistency audit. Computed fresh on every call, never
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
  pub cache_populated: bool,
  pub checked_count: usize,
  pub inconsistencies: Vec<DriftEntry>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cache_age_seconds: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl ConsistencyReport {
  /// Report shape when the cache has never been successfully populated.
  pub fn unpopulated() -> Self {
    Self {
      cache_populated: false,
      checked_count: 0,
      inconsistencies: Vec::new(),
      cache_age_seconds: None,
      message: Some("Cache not yet populated; no baseline to compare.".to_string()),
      error: None,
    }
  }

  /// Report shape when the live fetch failed. A failed audit attempt is
  /// diagnostic information, not a drift finding.
  pub fn fetch_failed(error: String) -> Self {
    Self {
      cache_populated: true,
      checked_count: 0,
      inconsistencies: Vec::new(),
      cache_age_seconds: None,
      message: None,
      error: Some(error),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pending_maps_to_next_action() {
    assert_eq!(GtdStatus::from_donor("pending"), GtdStatus::NextAction);
  }

  #[test]
  fn test_completed_maps_to_completed() {
    assert_eq!(GtdStatus::from_donor("completed"), GtdStatus::Completed);
  }

  #[test]
  fn test_cancelled_maps_to_deleted() {
    assert_eq!(GtdStatus::from_donor("cancelled"), GtdStatus::Deleted);
  }

  #[test]
  fn test_unknown_status_defaults_to_next_action() {
    assert_eq!(
      GtdStatus::from_donor("some_future_status"),
      GtdStatus::NextAction
    );
    assert_eq!(GtdStatus::from_donor(""), GtdStatus::NextAction);
  }

  #[test]
  fn test_only_terminal_statuses_map_back_to_donor() {
    assert_eq!(GtdStatus::Completed.to_donor(), Some("completed"));
    assert_eq!(GtdStatus::Deleted.to_donor(), Some("cancelled"));
    assert_eq!(GtdStatus::NextAction.to_donor(), None);
  }

  #[test]
  fn test_status_serializes_snake_case() {
    let json = serde_json::to_string(&GtdStatus::NextAction).unwrap();
    assert_eq!(json, "\"next_action\"");
  }

  #[test]
  fn test_synthesized_record_derives_from_request() {
    let task = MappedTask::synthesized(7, GtdStatus::Deleted);
    assert_eq!(task.donor_task_id, 7);
    assert_eq!(task.title, "");
    assert_eq!(task.status, GtdStatus::Deleted);
    assert_eq!(task.donor_status.as_deref(), Some("cancelled"));
    assert_eq!(task.source, DONOR_SOURCE);
  }

  #[test]
  fn test_missing_sentinel_serializes() {
    let json = serde_json::to_string(&LiveStatus::MissingFromLive).unwrap();
    assert_eq!(json, "\"missing_from_live\"");
  }
}
