//! Serde-deserializable types matching the Donor Management DB API.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;

use super::types::{GtdStatus, MappedTask, DONOR_SOURCE};

/// A contact associated with a donor task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiContact {
  pub id: u64,
  /// Display name ("file as" in donor DB terms); may be null or absent.
  #[serde(default)]
  pub file_as: Option<String>,
}

/// A donor task as returned by the donor DB.
///
/// The list endpoint omits `contacts`; the detail endpoint includes them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiTask {
  pub id: u64,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub status: Option<String>,
  #[serde(default)]
  pub task_date: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub is_thank: bool,
  #[serde(default)]
  pub contacts: Vec<ApiContact>,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

/// Assemble the GTD display title from a donor task's fields.
///
/// Contact names are appended in donor DB order, joined with " & "; a
/// contact without a display name falls back to its numeric id.
pub fn build_title(description: &str, contacts: &[ApiContact]) -> String {
  if contacts.is_empty() {
    return description.to_string();
  }
  let names: Vec<String> = contacts
    .iter()
    .map(|c| {
      c.file_as
        .as_deref()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| c.id.to_string())
    })
    .collect();
  format!("{} - {}", description, names.join(" & "))
}

impl ApiTask {
  /// Map to the GTD-shaped representation. Never fails: missing optional
  /// fields become absent values in the mapped record.
  pub fn into_mapped(self) -> MappedTask {
    let title = build_title(&self.description, &self.contacts);
    let status = GtdStatus::from_donor(self.status.as_deref().unwrap_or(""));
    MappedTask {
      donor_task_id: self.id,
      title,
      status,
      donor_status: self.status,
      task_date: self.task_date,
      notes: self.notes,
      is_thank: self.is_thank,
      source: DONOR_SOURCE.to_string(),
    }
  }
}
