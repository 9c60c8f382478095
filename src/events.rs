//! Fetching events and deriving their schedule keys.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, instrument, trace};

use crate::{
  config::ScheduleConfig,
  fallback::{EVENT_COVER_CHAIN, EVENT_DESCRIPTION_CHAIN, first_of},
  relationship::{entries, first_id, id_list},
  schedule::model::{Event, ScheduleKeys},
  text::{decode_entities, renderable_text},
  wp::{ContentSource, FetchError, fetch_posts, model::WpPost},
};

/// Assumed length of an event without a usable end time.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

const DATE_FORMATS_WITH_YEAR: [&str; 4] =
  ["%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y"];
const DATE_FORMATS: [&str; 2] = ["%B %d %Y", "%b %d %Y"];
const TIME_FORMATS: [&str; 2] = ["%I:%M %p", "%H:%M"];

/// Drops a leading `"Monday, "`.
fn strip_weekday(label: &str) -> &str {
  match label.split_once(',') {
    Some((head, rest))
      if !head.trim().is_empty()
        && head.trim().chars().all(|c| c.is_ascii_alphabetic()) =>
    {
      rest.trim_start()
    }
    _ => label,
  }
}

/// Parses `"[<Weekday>, ]<Month> <Day>[[,] <Year>]"`. Labels without a year
/// are placed in `default_year`.
pub fn parse_date_label(label: &str, default_year: i32) -> Option<NaiveDate> {
  let cleaned = strip_weekday(label.trim()).trim();
  if cleaned.is_empty() {
    return None;
  }

  DATE_FORMATS_WITH_YEAR
    .iter()
    .find_map(|f| NaiveDate::parse_from_str(cleaned, f).ok())
    .or_else(|| {
      let with_year = format!("{cleaned} {default_year}");
      DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(&with_year, f).ok())
    })
}

/// Parses `"9:00 AM"`, `"9am"`, `"9:00 a.m."` or `"14:30"`.
pub fn parse_time_label(label: &str) -> Option<NaiveTime> {
  let upper = label.trim().to_ascii_uppercase().replace('.', "");
  let (clock, meridiem) = match ["AM", "PM"]
    .into_iter()
    .find_map(|m| upper.strip_suffix(m).map(|clock| (clock.trim_end(), m)))
  {
    Some((clock, m)) => (clock, Some(m)),
    None => (upper.as_str(), None),
  };
  if clock.is_empty() {
    return None;
  }
  let clock = if clock.contains(':') {
    clock.to_owned()
  } else {
    format!("{clock}:00")
  };
  let normalized = match meridiem {
    Some(m) => format!("{clock} {m}"),
    None => clock,
  };

  TIME_FORMATS
    .iter()
    .find_map(|f| NaiveTime::parse_from_str(&normalized, f).ok())
}

fn localize(tz: Tz, day: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
  tz.from_local_datetime(&day.and_time(time))
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
}

/// Derives sort and day keys from an event's labels. Anything outside the
/// accepted formats yields no keys at all.
pub fn schedule_keys(
  date_label: Option<&str>,
  start_label: Option<&str>,
  tz: Tz,
  default_year: i32,
) -> Option<ScheduleKeys> {
  let day = parse_date_label(date_label?, default_year)?;
  let start = match start_label.map(str::trim).filter(|s| !s.is_empty()) {
    Some(label) => parse_time_label(label)?,
    None => NaiveTime::MIN,
  };

  let starts_at = localize(tz, day, start)?;
  let midnight = localize(tz, day, NaiveTime::MIN)?;
  Some(ScheduleKeys {
    starts_at,
    day,
    sort_key: starts_at.timestamp_millis(),
    day_key:  midnight.timestamp_millis(),
  })
}

/// When an event is over. Events without a parseable start have no end.
pub fn event_ends_at(event: &Event, tz: Tz) -> Option<DateTime<Utc>> {
  let keys = event.keys?;
  let end = event
    .end_time
    .as_deref()
    .and_then(parse_time_label)
    .and_then(|t| localize(tz, keys.day, t));

  Some(match end {
    Some(end) if end >= keys.starts_at => end,
    _ => keys.starts_at + TimeDelta::minutes(DEFAULT_DURATION_MINUTES),
  })
}

/// Maps a raw event post. Relationships are left unresolved.
pub fn event_from_post(post: &WpPost, config: &ScheduleConfig) -> Event {
  let date = post.acf_str("event-date").map(ToOwned::to_owned);
  let start_time = post.acf_str("event-time-start").map(ToOwned::to_owned);
  let end_time = post.acf_str("event-time-end").map(ToOwned::to_owned);
  let keys = schedule_keys(
    date.as_deref(),
    start_time.as_deref(),
    config.timezone,
    config.conference_year,
  );
  if keys.is_none() {
    trace!(id = post.id, ?date, ?start_time, "event has no parseable start");
  }

  let room = post
    .first_term_name(&config.room_taxonomy)
    .map(renderable_text);
  let track = post
    .first_term_name(&config.track_taxonomy)
    .or_else(|| post.acf_str("track"))
    .map(renderable_text);

  let sponsor_rel = post
    .acf("sponsors")
    .map(|raw| entries(raw).into_iter().cloned().collect())
    .unwrap_or_default();

  Event {
    id:              post.id,
    title:           decode_entities(post.title()).into_owned(),
    date,
    start_time,
    end_time,
    keys,
    room,
    track,
    kinds:           post.term_slugs(&config.event_kind_taxonomy),
    speaker_ids:     post.acf("speakers").map(id_list).unwrap_or_default(),
    moderator_id:    post.acf("moderator").and_then(first_id),
    sponsor_rel,
    description:     first_of(EVENT_DESCRIPTION_CHAIN, post)
      .map(|d| decode_entities(&d).into_owned())
      .unwrap_or_default(),
    cover_image_url: first_of(EVENT_COVER_CHAIN, post),
    speakers:        Vec::new(),
    moderator:       None,
    sponsors:        Vec::new(),
  }
}

/// Fetches every event in one listing request.
#[instrument(skip_all)]
pub async fn fetch_events<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
) -> Result<Vec<Event>, FetchError> {
  let query = [
    ("per_page", config.page_size.to_string()),
    ("_embed", "1".to_owned()),
  ];
  let posts = fetch_posts(source, &config.event_collection, &query).await?;

  let events = posts
    .iter()
    .map(|p| event_from_post(p, config))
    .collect::<Vec<_>>();
  debug!(
    count = events.len(),
    undated = events.iter().filter(|e| e.keys.is_none()).count(),
    "fetched events"
  );
  Ok(events)
}
