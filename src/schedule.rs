//! Schedule assembly and the load guard that keeps stale loads from
//! overwriting newer ones.

pub mod model;

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

use tokio::sync::watch;
use tracing::{debug, info, instrument};

use self::model::ScheduleSnapshot;
use crate::{
  config::ScheduleConfig,
  state::AssemblyState,
  wp::{ContentSource, FetchError},
};

/// Fetches events, resolves their presenters and sponsors, then sorts and
/// partitions them. Only a failure to fetch the events themselves is
/// surfaced; relationship failures degrade to missing entities.
#[instrument(skip_all)]
pub async fn assemble_schedule<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
) -> Result<ScheduleSnapshot, FetchError> {
  let mut state = AssemblyState::Start;
  loop {
    match state {
      AssemblyState::Assembled { snapshot } => return Ok(snapshot),
      s => state = s.step(source, config).await?,
    }
  }
}

/// A snapshot together with the load that produced it.
#[derive(Clone, Debug)]
pub struct Published {
  pub generation: u64,
  pub snapshot:   Arc<ScheduleSnapshot>,
}

#[derive(Clone, Debug)]
pub enum LoadOutcome {
  /// This load was the most recent one and its snapshot is now published.
  Applied(Arc<ScheduleSnapshot>),
  /// A newer load started while this one was in flight; its result was
  /// discarded.
  Superseded { generation: u64 },
}

/// Runs schedule loads and publishes only the result of the most recently
/// started one.
pub struct ScheduleLoader<S> {
  source:    S,
  config:    ScheduleConfig,
  requested: AtomicU64,
  published: watch::Sender<Option<Published>>,
}

impl<S: ContentSource> ScheduleLoader<S> {
  pub fn new(source: S, config: ScheduleConfig) -> Self {
    let (published, _) = watch::channel(None);
    Self {
      source,
      config,
      requested: AtomicU64::new(0),
      published,
    }
  }

  pub fn config(&self) -> &ScheduleConfig {
    &self.config
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<Published>> {
    self.published.subscribe()
  }

  /// The most recently published snapshot, if any load has completed.
  pub fn latest(&self) -> Option<Arc<ScheduleSnapshot>> {
    self
      .published
      .borrow()
      .as_ref()
      .map(|p| Arc::clone(&p.snapshot))
  }

  /// Starts a new load. If another load is started before this one
  /// finishes, this one resolves to [`LoadOutcome::Superseded`] whether it
  /// succeeded or failed.
  pub async fn load(&self) -> Result<LoadOutcome, FetchError> {
    let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(generation, "starting schedule load");

    let result = assemble_schedule(&self.source, &self.config).await;
    if self.is_stale(generation) {
      debug!(generation, "discarding superseded schedule load");
      return Ok(LoadOutcome::Superseded { generation });
    }

    let snapshot = Arc::new(result?);
    let applied = self.published.send_if_modified(|current| {
      let newer_published =
        current.as_ref().is_some_and(|p| p.generation > generation);
      if newer_published || self.is_stale(generation) {
        return false;
      }
      *current = Some(Published {
        generation,
        snapshot: Arc::clone(&snapshot),
      });
      true
    });

    if applied {
      info!(generation, "published schedule");
      Ok(LoadOutcome::Applied(snapshot))
    } else {
      debug!(generation, "discarding superseded schedule load");
      Ok(LoadOutcome::Superseded { generation })
    }
  }

  fn is_stale(&self, generation: u64) -> bool {
    self.requested.load(Ordering::SeqCst) != generation
  }
}
