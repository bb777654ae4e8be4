//! Read-through cache over the donor DB.
//!
//! Holds the last-known-good snapshot of the complete donor task collection,
//! refreshes it on TTL expiry or explicit invalidation, and degrades to
//! serving the stale snapshot when the donor DB is unreachable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::api_types::ApiTask;
use super::client::{DonorApi, TransportError, PAGE_LIMIT};
use super::types::{ConsistencyReport, DriftEntry, GtdStatus, LiveStatus, MappedTask};

/// How long a refreshed snapshot stays fresh.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Upper bound on in-flight detail fetches during a refresh.
const DETAIL_CONCURRENCY: usize = 20;

struct CacheState {
  tasks: Vec<MappedTask>,
  fetched_at: Option<Instant>,
  /// True before the first successful refresh and after any successful
  /// status push; cleared only by a successful full refresh.
  stale: bool,
}

impl CacheState {
  fn new() -> Self {
    Self {
      tasks: Vec::new(),
      fetched_at: None,
      stale: true,
    }
  }
}

/// Outcome of pushing a status change to the donor DB.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
  /// Pushed upstream; the record is the live refetch, or a synthesized
  /// fallback when the refetch itself failed.
  Updated(MappedTask),
  /// The GTD status has no donor equivalent; nothing was sent upstream.
  Unsupported,
  /// The donor DB rejected or never received the update.
  Failed,
}

/// Process-wide snapshot of the donor task collection, shared by every
/// request handler. Constructed once at startup and passed by handle.
pub struct DonorCache<C> {
  client: C,
  state: Arc<Mutex<CacheState>>,
  ttl: Duration,
}

impl<C: Clone> Clone for DonorCache<C> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      state: Arc::clone(&self.state),
      ttl: self.ttl,
    }
  }
}

impl<C: DonorApi> DonorCache<C> {
  pub fn new(client: C) -> Self {
    Self {
      client,
      state: Arc::new(Mutex::new(CacheState::new())),
      ttl: CACHE_TTL,
    }
  }

  /// Override the snapshot TTL.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  /// Return the cached donor tasks, refreshing first when the snapshot is
  /// stale or expired. Never fails: a failed refresh degrades to the
  /// previous snapshot (possibly empty).
  ///
  /// The filter matches the *donor* status string and only narrows what is
  /// returned. The underlying fetch is always unfiltered so a filtered read
  /// cannot poison the snapshot with a partial view.
  pub async fn fetch_tasks(&self, status_filter: Option<&str>) -> Vec<MappedTask> {
    // Read-and-possibly-refresh is one critical section: no reader can
    // observe a half-built snapshot and refreshes cannot interleave.
    let mut state = self.state.lock().await;

    if self.needs_refresh(&state) {
      match self.refresh().await {
        Ok(tasks) => {
          info!("donor cache: refreshed {} tasks", tasks.len());
          state.tasks = tasks;
          state.fetched_at = Some(Instant::now());
          state.stale = false;
        }
        Err(err) => {
          warn!("donor cache: refresh failed ({}), serving cached tasks", err);
        }
      }
    }

    match status_filter {
      Some(status) => state
        .tasks
        .iter()
        .filter(|t| t.donor_status.as_deref() == Some(status))
        .cloned()
        .collect(),
      None => state.tasks.clone(),
    }
  }

  fn needs_refresh(&self, state: &CacheState) -> bool {
    state.stale
      || state
        .fetched_at
        .map_or(true, |at| at.elapsed() >= self.ttl)
  }

  /// Fetch and map the complete donor task collection. Does not touch the
  /// snapshot; the caller replaces it wholesale on success.
  async fn refresh(&self) -> Result<Vec<MappedTask>, TransportError> {
    let list = self.client.list_tasks(PAGE_LIMIT).await?;
    let enriched = self.enrich_contacts(list).await;
    Ok(enriched.into_iter().map(ApiTask::into_mapped).collect())
  }

  /// Fetch the detail record (with contacts) for every listed task, at most
  /// [`DETAIL_CONCURRENCY`] in flight. A task whose detail fetch fails keeps
  /// its list-level record; siblings are unaffected.
  async fn enrich_contacts(&self, tasks: Vec<ApiTask>) -> Vec<ApiTask> {
    stream::iter(tasks)
      .map(|task| async move {
        match self.client.get_task(task.id).await {
          Ok(Some(detail)) => detail,
          Ok(None) | Err(_) => task,
        }
      })
      .buffered(DETAIL_CONCURRENCY)
      .collect()
      .await
  }

  /// Live fetch-through for a single task, bypassing the snapshot. Detail
  /// views favor correctness over cache-hit rate.
  pub async fn get_task(&self, id: u64) -> Result<Option<MappedTask>, TransportError> {
    Ok(self.client.get_task(id).await?.map(ApiTask::into_mapped))
  }

  /// Push a status change to the donor DB. On success the snapshot is
  /// marked stale so the next read refreshes regardless of remaining TTL.
  pub async fn update_status(&self, id: u64, status: GtdStatus) -> UpdateOutcome {
    let Some(donor_status) = status.to_donor() else {
      error!(
        "donor cache: GTD status '{}' has no donor equivalent",
        status.as_str()
      );
      return UpdateOutcome::Unsupported;
    };

    if let Err(err) = self.client.update_status(id, donor_status).await {
      error!("donor cache: status push for task {} failed: {}", id, err);
      return UpdateOutcome::Failed;
    }

    self.state.lock().await.stale = true;
    info!("donor cache: pushed status '{}' for task {}", donor_status, id);

    // Re-fetch the updated record; fall back to a request-derived skeleton
    // if the donor DB is momentarily unavailable right after the write.
    match self.client.get_task(id).await {
      Ok(Some(raw)) => UpdateOutcome::Updated(raw.into_mapped()),
      Ok(None) | Err(_) => UpdateOutcome::Updated(MappedTask::synthesized(id, status)),
    }
  }

  /// Compare the snapshot against a fresh live fetch. Read-only with
  /// respect to both sides: never refreshes the snapshot, never writes
  /// upstream.
  pub async fn check_consistency(&self) -> ConsistencyReport {
    let (cached, age) = {
      let state = self.state.lock().await;
      if state.stale || state.tasks.is_empty() {
        return ConsistencyReport::unpopulated();
      }
      (state.tasks.clone(), state.fetched_at.map(|at| at.elapsed()))
    };

    // The live fetch happens outside the lock so a slow donor DB cannot
    // stall concurrent readers behind the audit.
    let live = match self.client.list_tasks(PAGE_LIMIT).await {
      Ok(live) => live,
      Err(err) => {
        warn!("donor cache: consistency check fetch failed: {}", err);
        return ConsistencyReport::fetch_failed(err.to_string());
      }
    };

    let cached_by_id: HashMap<u64, &MappedTask> =
      cached.iter().map(|t| (t.donor_task_id, t)).collect();

    let mut inconsistencies = Vec::new();

    for task in &live {
      let live_status = GtdStatus::from_donor(task.status.as_deref().unwrap_or(""));
      if let Some(cached_task) = cached_by_id.get(&task.id) {
        if cached_task.status != live_status {
          let entry = DriftEntry {
            donor_task_id: task.id,
            cached_status: cached_task.status,
            live_status: live_status.into(),
          };
          warn!("donor cache: consistency drift {:?}", entry);
          inconsistencies.push(entry);
        }
      }
    }

    let live_ids: HashSet<u64> = live.iter().map(|t| t.id).collect();
    for task in &cached {
      if !live_ids.contains(&task.donor_task_id) {
        warn!(
          "donor cache: cached task {} missing from live",
          task.donor_task_id
        );
        inconsistencies.push(DriftEntry {
          donor_task_id: task.donor_task_id,
          cached_status: task.status,
          live_status: LiveStatus::MissingFromLive,
        });
      }
    }

    ConsistencyReport {
      cache_populated: true,
      checked_count: live.len(),
      inconsistencies,
      cache_age_seconds: age.map(|a| (a.as_secs_f64() * 10.0).round() / 10.0),
      message: None,
      error: None,
    }
  }
}
