//! Scriptable donor DB double shared by the cache and server tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::api_types::{ApiContact, ApiTask};
use super::client::{DonorApi, TransportError};

/// In-memory donor DB with call counters and failure switches.
///
/// `get_task` serves a seeded detail record when present, otherwise falls
/// back to the list entry (as the real detail endpoint would), and reports
/// not-found for unknown ids.
#[derive(Default)]
pub struct FakeDonor {
  pub tasks: Mutex<Vec<ApiTask>>,
  pub details: Mutex<HashMap<u64, ApiTask>>,
  pub fail_list: AtomicBool,
  pub fail_get: AtomicBool,
  pub fail_update: AtomicBool,
  /// Ids whose detail fetch fails while siblings keep working.
  pub fail_detail_for: Mutex<HashSet<u64>>,
  pub list_calls: AtomicUsize,
  pub detail_calls: AtomicUsize,
  pub update_calls: AtomicUsize,
}

impl FakeDonor {
  pub fn with_tasks(tasks: Vec<ApiTask>) -> Arc<Self> {
    let fake = Self::default();
    *fake.tasks.lock().unwrap() = tasks;
    Arc::new(fake)
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }

  pub fn detail_calls(&self) -> usize {
    self.detail_calls.load(Ordering::SeqCst)
  }

  pub fn update_calls(&self) -> usize {
    self.update_calls.load(Ordering::SeqCst)
  }

  pub fn seed_detail(&self, task: ApiTask) {
    self.details.lock().unwrap().insert(task.id, task);
  }

  pub fn set_tasks(&self, tasks: Vec<ApiTask>) {
    *self.tasks.lock().unwrap() = tasks;
  }
}

impl DonorApi for Arc<FakeDonor> {
  async fn list_tasks(&self, _limit: u32) -> Result<Vec<ApiTask>, TransportError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_list.load(Ordering::SeqCst) {
      return Err(TransportError::new("connection refused"));
    }
    Ok(self.tasks.lock().unwrap().clone())
  }

  async fn get_task(&self, id: u64) -> Result<Option<ApiTask>, TransportError> {
    self.detail_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_get.load(Ordering::SeqCst) {
      return Err(TransportError::new("connection refused"));
    }
    if self.fail_detail_for.lock().unwrap().contains(&id) {
      return Err(TransportError::new("timed out"));
    }
    if let Some(detail) = self.details.lock().unwrap().get(&id) {
      return Ok(Some(detail.clone()));
    }
    Ok(
      self
        .tasks
        .lock()
        .unwrap()
        .iter()
        .find(|t| t.id == id)
        .cloned(),
    )
  }

  async fn update_status(&self, id: u64, donor_status: &str) -> Result<(), TransportError> {
    self.update_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_update.load(Ordering::SeqCst) {
      return Err(TransportError::new("bad gateway"));
    }
    for task in self.tasks.lock().unwrap().iter_mut() {
      if task.id == id {
        task.status = Some(donor_status.to_string());
      }
    }
    if let Some(detail) = self.details.lock().unwrap().get_mut(&id) {
      detail.status = Some(donor_status.to_string());
    }
    Ok(())
  }
}

/// List-shaped donor task (no contacts).
pub fn raw_task(id: u64, status: &str) -> ApiTask {
  ApiTask {
    id,
    description: format!("Task {}", id),
    status: Some(status.to_string()),
    task_date: Some("2024-06-01".to_string()),
    notes: None,
    is_thank: false,
    contacts: Vec::new(),
  }
}

/// Detail-shaped donor task with one named contact.
pub fn raw_task_with_contact(id: u64, status: &str, contact_name: &str) -> ApiTask {
  let mut task = raw_task(id, status);
  task.contacts = vec![ApiContact {
    id: id * 100,
    file_as: Some(contact_name.to_string()),
  }];
  task
}
