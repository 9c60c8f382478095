//! Filtering, day sections and the per-view event lists shown by the
//! schedule screens.

use std::{
  collections::{BTreeMap, BTreeSet, HashSet},
  fmt,
  str::FromStr,
};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
  events::event_ends_at,
  schedule::model::{Event, ScheduleSnapshot},
};

/// Synthetic first entry of the track picker; selecting it disables the track
/// filter.
pub const ALL_TRACKS_LABEL: &str = "All tracks";

/// Title of sections built from events without a date label.
pub const UNDATED_SECTION_TITLE: &str = "Schedule";

#[derive(Clone, Debug)]
pub struct EventFilter {
  pub search:    String,
  /// Exact track to keep. `None` or [`ALL_TRACKS_LABEL`] keeps every track.
  pub track:     Option<String>,
  pub show_past: bool,
  pub now:       DateTime<Utc>,
  pub timezone:  Tz,
}

impl EventFilter {
  /// Upcoming events only, no search, no track.
  pub fn upcoming(now: DateTime<Utc>, timezone: Tz) -> Self {
    Self {
      search:    String::new(),
      track:     None,
      show_past: false,
      now,
      timezone,
    }
  }

  fn active_track(&self) -> Option<&str> {
    self
      .track
      .as_deref()
      .filter(|t| !t.is_empty() && *t != ALL_TRACKS_LABEL)
  }

  fn is_past(&self, event: &Event) -> bool {
    event_ends_at(event, self.timezone).is_some_and(|end| end <= self.now)
  }
}

fn search_haystack(event: &Event) -> String {
  let mut parts = vec![
    event.title.clone(),
    event.track.clone().unwrap_or_default(),
    event.room.clone().unwrap_or_default(),
    event.date.clone().unwrap_or_default(),
  ];
  parts.extend(event.speakers.iter().map(|s| s.name.clone()));
  parts.extend(event.moderator.iter().map(|m| m.name.clone()));
  parts.push(event.plain_description());
  parts.join(" ").to_lowercase()
}

/// Applies the past, track and search filters together. Events without a
/// parseable start are never considered past.
pub fn filter_events<'a>(
  events: impl IntoIterator<Item = &'a Event>,
  filter: &EventFilter,
) -> Vec<&'a Event> {
  let query = filter.search.trim().to_lowercase();
  let track = filter.active_track();

  events
    .into_iter()
    .filter(|e| filter.show_past || !filter.is_past(e))
    .filter(|e| match track {
      Some(track) => e.track.as_deref().map(str::trim) == Some(track),
      None => true,
    })
    .filter(|e| query.is_empty() || search_haystack(e).contains(&query))
    .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct DaySection<'a> {
  pub title:   String,
  /// Local midnight of the section's day; `None` for an undated event.
  pub day_key: Option<i64>,
  pub data:    Vec<&'a Event>,
}

/// Groups events into day sections, dated days first in day order and then
/// one section per undated event ordered by title. Input order is kept
/// within a section.
pub fn section_by_day<'a>(
  events: impl IntoIterator<Item = &'a Event>,
) -> Vec<DaySection<'a>> {
  let mut dated = BTreeMap::<i64, DaySection<'a>>::new();
  let mut undated = Vec::new();

  for event in events {
    let label = event
      .date
      .as_deref()
      .map(str::trim)
      .filter(|d| !d.is_empty());
    match event.keys {
      Some(keys) => dated
        .entry(keys.day_key)
        .or_insert_with(|| DaySection {
          title:   label.map(ToOwned::to_owned).unwrap_or_else(|| {
            keys.day.format("%A, %B %-d").to_string()
          }),
          day_key: Some(keys.day_key),
          data:    Vec::new(),
        })
        .data
        .push(event),
      None => undated.push(DaySection {
        title:   label.unwrap_or(UNDATED_SECTION_TITLE).to_owned(),
        day_key: None,
        data:    vec![event],
      }),
    }
  }

  undated.sort_by(|a, b| a.title.cmp(&b.title));
  dated.into_values().chain(undated).collect()
}

/// Track picker options for the session list.
pub fn distinct_tracks(sessions: &[Event]) -> Vec<String> {
  let tracks = sessions
    .iter()
    .filter_map(|e| e.track.as_deref().map(str::trim))
    .filter(|t| !t.is_empty() && *t != "-" && !t.eq_ignore_ascii_case("all"))
    .collect::<BTreeSet<_>>();

  std::iter::once(ALL_TRACKS_LABEL.to_owned())
    .chain(tracks.into_iter().map(ToOwned::to_owned))
    .collect()
}

#[derive(
  Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleView {
  #[default]
  All,
  Mine,
  Sessions,
  Socials,
}

impl ScheduleView {
  pub const ALL: [ScheduleView; 4] = [
    ScheduleView::All,
    ScheduleView::Mine,
    ScheduleView::Sessions,
    ScheduleView::Socials,
  ];

  pub fn supports_track_filter(&self) -> bool {
    matches!(self, ScheduleView::Sessions | ScheduleView::Mine)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      ScheduleView::All => "all",
      ScheduleView::Mine => "mine",
      ScheduleView::Sessions => "sessions",
      ScheduleView::Socials => "socials",
    }
  }
}

impl fmt::Display for ScheduleView {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown schedule view `{0}`")]
pub struct UnknownScheduleView(pub String);

impl FromStr for ScheduleView {
  type Err = UnknownScheduleView;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ScheduleView::ALL
      .into_iter()
      .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| UnknownScheduleView(s.to_owned()))
  }
}

/// The base list for a view. `favorites` holds event ids as the attendee
/// storage layer keys them.
pub fn select_view<'a>(
  snapshot: &'a ScheduleSnapshot,
  view: ScheduleView,
  favorites: &HashSet<String>,
) -> Vec<&'a Event> {
  match view {
    ScheduleView::All => snapshot.all_events.iter().collect(),
    ScheduleView::Sessions => snapshot.sessions.iter().collect(),
    ScheduleView::Socials => snapshot.socials.iter().collect(),
    ScheduleView::Mine => snapshot
      .all_events
      .iter()
      .filter(|e| favorites.contains(&e.favorite_id()))
      .collect(),
  }
}

/// How many assembled events the attendee has favorited. Favorites that
/// point at events no longer in the schedule are not counted.
pub fn my_schedule_count(
  all_events: &[Event],
  favorites: &HashSet<String>,
) -> usize {
  all_events
    .iter()
    .filter(|e| favorites.contains(&e.favorite_id()))
    .count()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use pretty_assertions::assert_eq;
  use serde_json::{Value, json};

  use super::*;
  use crate::{
    config::ScheduleConfig, events::event_from_post,
    schedule::model::Presenter, wp::model::WpPost,
  };

  fn event(id: u32, date: Value, start: Value, end: Value) -> Event {
    let config = ScheduleConfig {
      conference_year: 2026,
      ..ScheduleConfig::default()
    };
    let post: WpPost = serde_json::from_value(json!({
      "id": id,
      "title": { "rendered": format!("Event {id}") },
      "acf": {
        "event-date": date,
        "event-time-start": start,
        "event-time-end": end,
      }
    }))
    .unwrap();
    event_from_post(&post, &config)
  }

  fn june(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, day, hour, minute, 0).unwrap()
  }

  fn ids(events: &[&Event]) -> Vec<u32> {
    events.iter().map(|e| e.id).collect()
  }

  #[test]
  fn past_events_are_hidden_unless_requested() {
    let e = event(
      1,
      json!("Monday, June 1"),
      json!("9:00 AM"),
      json!("10:00 AM"),
    );
    assert_eq!(e.sort_key(), Some(june(1, 9, 0).timestamp_millis()));
    assert_eq!(e.day_key(), Some(june(1, 0, 0).timestamp_millis()));

    let events = vec![e];
    let mut filter = EventFilter::upcoming(june(1, 10, 30), Tz::UTC);
    assert!(filter_events(&events, &filter).is_empty());

    filter.show_past = true;
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1]);

    // ending exactly now counts as past
    let filter = EventFilter::upcoming(june(1, 10, 0), Tz::UTC);
    assert!(filter_events(&events, &filter).is_empty());
    let filter = EventFilter::upcoming(june(1, 9, 59), Tz::UTC);
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1]);
  }

  #[test]
  fn undated_events_are_always_upcoming() {
    let events = vec![event(1, json!("TBD"), json!("9:00 AM"), Value::Null)];
    let filter = EventFilter::upcoming(june(30, 0, 0), Tz::UTC);
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1]);
  }

  #[test]
  fn filters_are_conjunctive() {
    let mut legal = event(1, json!("June 2"), json!("9:00 AM"), Value::Null);
    legal.track = Some("Legal".to_owned());
    legal.speakers = vec![Presenter {
      id:         12,
      name:       "Ada Lovelace".to_owned(),
      first_name: "Ada".to_owned(),
      last_name:  "Lovelace".to_owned(),
      title:      String::new(),
      org:        String::new(),
      bio_html:   String::new(),
      photo:      None,
    }];
    let mut legal_2 = event(2, json!("June 2"), json!("1:00 PM"), Value::Null);
    legal_2.track = Some("Legal".to_owned());
    let mut gaming = event(3, json!("June 2"), json!("9:00 AM"), Value::Null);
    gaming.track = Some("Gaming".to_owned());
    gaming.description = "<p>Talk about <b>lovelace</b> numbers</p>".to_owned();
    let events = vec![legal, legal_2, gaming];

    let mut filter = EventFilter::upcoming(june(1, 0, 0), Tz::UTC);
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1, 2, 3]);

    filter.search = "  LOVELACE ".to_owned();
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1, 3]);

    filter.track = Some("Legal".to_owned());
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1]);

    // exact, case-sensitive track match
    filter.search.clear();
    filter.track = Some("legal".to_owned());
    assert!(filter_events(&events, &filter).is_empty());

    filter.track = Some(ALL_TRACKS_LABEL.to_owned());
    assert_eq!(ids(&filter_events(&events, &filter)), vec![1, 2, 3]);
  }

  #[test]
  fn sections_group_by_day_then_undated_by_title() {
    let events = vec![
      event(1, json!("June 2"), json!("9:00 AM"), Value::Null),
      event(2, json!("Monday, June 1"), json!("9:00 AM"), Value::Null),
      event(3, json!("Zoo day"), Value::Null, Value::Null),
      event(4, json!("June 2"), json!("8:00 AM"), Value::Null),
      event(5, Value::Null, Value::Null, Value::Null),
      event(6, json!("Zoo day"), Value::Null, Value::Null),
      event(7, json!("Monday, June 1"), json!("7:00 AM"), Value::Null),
    ];

    let sections = section_by_day(&events);
    let shape = sections
      .iter()
      .map(|s| (s.title.as_str(), ids(&s.data)))
      .collect::<Vec<_>>();
    assert_eq!(
      shape,
      vec![
        ("Monday, June 1", vec![2, 7]),
        ("June 2", vec![1, 4]),
        ("Schedule", vec![5]),
        ("Zoo day", vec![3]),
        ("Zoo day", vec![6]),
      ]
    );
    assert_eq!(sections[0].day_key, Some(june(1, 0, 0).timestamp_millis()));
    assert_eq!(sections[2].day_key, None);
  }

  #[test]
  fn distinct_tracks_skip_placeholders() {
    let mut events = Vec::new();
    for (id, track) in [
      (1, Some("Legal")),
      (2, Some(" Gaming ")),
      (3, Some("-")),
      (4, Some("ALL")),
      (5, None),
      (6, Some("Legal")),
      (7, Some("")),
    ] {
      let mut e = event(id, json!("June 1"), json!("9:00 AM"), Value::Null);
      e.track = track.map(ToOwned::to_owned);
      events.push(e);
    }
    assert_eq!(distinct_tracks(&events), vec!["All tracks", "Gaming", "Legal"]);
    assert_eq!(distinct_tracks(&[]), vec!["All tracks"]);
  }

  #[test]
  fn views_select_their_base_list() {
    let mut session = event(1, json!("June 1"), json!("9:00 AM"), Value::Null);
    session.kinds = vec!["sessions".to_owned()];
    let mut social = event(2, json!("June 1"), json!("7:00 PM"), Value::Null);
    social.kinds = vec!["socials".to_owned()];
    let other = event(3, json!("June 1"), json!("noon"), Value::Null);
    let snapshot = ScheduleSnapshot {
      sessions:   vec![session.clone()],
      socials:    vec![social.clone()],
      all_events: vec![session, social, other],
    };
    let favorites = ["2", "3", "99"]
      .into_iter()
      .map(ToOwned::to_owned)
      .collect::<HashSet<_>>();

    let view = |v| ids(&select_view(&snapshot, v, &favorites));
    assert_eq!(view(ScheduleView::All), vec![1, 2, 3]);
    assert_eq!(view(ScheduleView::Sessions), vec![1]);
    assert_eq!(view(ScheduleView::Socials), vec![2]);
    assert_eq!(view(ScheduleView::Mine), vec![2, 3]);
    assert_eq!(my_schedule_count(&snapshot.all_events, &favorites), 2);

    assert!(ScheduleView::Sessions.supports_track_filter());
    assert!(ScheduleView::Mine.supports_track_filter());
    assert!(!ScheduleView::All.supports_track_filter());
    assert!(!ScheduleView::Socials.supports_track_filter());
  }

  #[test]
  fn social_events_hide_their_track() {
    let tracked = |kinds: &[&str]| {
      let mut e = event(1, json!("June 1"), json!("9:00 AM"), Value::Null);
      e.track = Some(" Legal ".to_owned());
      e.kinds = kinds.iter().map(|k| (*k).to_owned()).collect();
      e
    };

    assert_eq!(tracked(&["sessions"]).display_track("mixers"), "Legal");
    assert_eq!(tracked(&["mixers"]).display_track("mixers"), "");
    assert_eq!(tracked(&["social"]).display_track("mixers"), "");
    assert_eq!(tracked(&["socials"]).display_track("mixers"), "");
    assert!(tracked(&["social"]).is_social("socials"));
    assert!(!tracked(&["sessions"]).is_social("socials"));

    let mut dash = tracked(&["sessions"]);
    dash.track = Some("-".to_owned());
    assert_eq!(dash.display_track("socials"), "");
  }

  #[test]
  fn parses_view_names() {
    assert_eq!("Mine".parse::<ScheduleView>().unwrap(), ScheduleView::Mine);
    assert_eq!(ScheduleView::Socials.to_string(), "socials");
    assert!("favorites".parse::<ScheduleView>().is_err());
  }
}
