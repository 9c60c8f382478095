use std::collections::{BTreeSet, HashMap, HashSet};

use kinded::Kinded;
use tracing::{debug, info, warn};

use crate::{
  config::ScheduleConfig,
  events::fetch_events,
  presenters::fetch_presenters_by_ids,
  relationship::normalize_rel_item,
  schedule::model::{Event, Presenter, ScheduleSnapshot, Sponsor, SponsorKey},
  sponsors::fetch_sponsors_by_rel_items,
  wp::{ContentSource, FetchError},
};

/// The steps of one schedule load.
#[derive(Kinded)]
#[kinded(kind = AssemblyStep)]
pub enum AssemblyState {
  Start,
  FetchedEvents {
    events: Vec<Event>,
  },
  ResolvedRelations {
    events:     Vec<Event>,
    presenters: HashMap<u32, Presenter>,
    sponsors:   HashMap<SponsorKey, Sponsor>,
  },
  AttachedRelations {
    events: Vec<Event>,
  },
  Assembled {
    snapshot: ScheduleSnapshot,
  },
}

impl AssemblyState {
  pub async fn step<S: ContentSource>(
    self,
    source: &S,
    config: &ScheduleConfig,
  ) -> Result<Self, FetchError> {
    let old_step = self.kind();
    let new_state = match self {
      AssemblyState::Start => AssemblyState::FetchedEvents {
        events: fetch_events(source, config).await?,
      },
      AssemblyState::FetchedEvents { events } => {
        let presenter_ids = collect_presenter_ids(&events);
        let sponsor_keys = collect_sponsor_keys(&events);

        let (presenters, sponsors) = tokio::join!(
          fetch_presenters_by_ids(source, config, &presenter_ids),
          fetch_sponsors_by_rel_items(source, config, &sponsor_keys),
        );
        let presenters = presenters.unwrap_or_else(|error| {
          warn!(%error, "failed to fetch presenters, continuing without");
          HashMap::new()
        });

        AssemblyState::ResolvedRelations {
          events,
          presenters,
          sponsors,
        }
      }
      AssemblyState::ResolvedRelations {
        events,
        presenters,
        sponsors,
      } => AssemblyState::AttachedRelations {
        events: attach_relations(events, &presenters, &sponsors),
      },
      AssemblyState::AttachedRelations { mut events } => {
        sort_events(&mut events);
        AssemblyState::Assembled {
          snapshot: partition_events(events, config),
        }
      }
      AssemblyState::Assembled { snapshot } => {
        AssemblyState::Assembled { snapshot }
      }
    };

    debug!(
      old_state = ?old_step,
      new_state = ?(new_state.kind()),
      "successfully transitioned state"
    );
    if let AssemblyState::Assembled { snapshot } = &new_state {
      info!(
        events = snapshot.all_events.len(),
        sessions = snapshot.sessions.len(),
        socials = snapshot.socials.len(),
        "assembled schedule"
      );
    }
    Ok(new_state)
  }
}

/// Every speaker and moderator id across all events, de-duplicated.
pub fn collect_presenter_ids(events: &[Event]) -> Vec<u32> {
  events
    .iter()
    .flat_map(Event::presenter_ids)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

/// Every typed sponsor relationship across all events, de-duplicated.
pub fn collect_sponsor_keys(events: &[Event]) -> Vec<SponsorKey> {
  events
    .iter()
    .flat_map(sponsor_keys)
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

fn sponsor_keys(event: &Event) -> impl Iterator<Item = SponsorKey> + '_ {
  event
    .sponsor_rel
    .iter()
    .filter_map(normalize_rel_item)
    .filter_map(|r| r.key())
}

/// Replaces relationship ids with the fetched entities. Anything that didn't
/// resolve is dropped; order follows the event's own fields.
pub fn attach_relations(
  events: Vec<Event>,
  presenters: &HashMap<u32, Presenter>,
  sponsors: &HashMap<SponsorKey, Sponsor>,
) -> Vec<Event> {
  events
    .into_iter()
    .map(|mut event| {
      let mut seen = HashSet::new();
      event.speakers = event
        .speaker_ids
        .iter()
        .filter(|id| seen.insert(**id))
        .filter_map(|id| presenters.get(id).cloned())
        .collect();
      event.moderator =
        event.moderator_id.and_then(|id| presenters.get(&id).cloned());

      let mut seen = HashSet::new();
      event.sponsors = sponsor_keys(&event)
        .filter(|key| seen.insert(*key))
        .filter_map(|key| sponsors.get(&key).cloned())
        .collect();

      let dropped = event.speaker_ids.len() - event.speakers.len();
      if dropped > 0 {
        debug!(id = event.id, dropped, "event has unresolved speakers");
      }
      event
    })
    .collect()
}

/// Ascending by sort key. Undated events follow all dated ones and keep
/// their relative order.
pub fn sort_events(events: &mut [Event]) {
  events.sort_by_key(|e| (e.sort_key().is_none(), e.sort_key()));
}

pub fn partition_events(
  all_events: Vec<Event>,
  config: &ScheduleConfig,
) -> ScheduleSnapshot {
  let of_kind = |kind: &str| {
    all_events
      .iter()
      .filter(|e| e.has_kind(kind))
      .cloned()
      .collect::<Vec<_>>()
  };
  ScheduleSnapshot {
    sessions: of_kind(&config.session_kind),
    socials:  of_kind(&config.social_kind),
    all_events,
  }
}
