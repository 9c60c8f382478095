use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use miette::{Context, IntoDiagnostic};
use serde::{Deserialize, Serialize};

use crate::schedule::model::SponsorKind;

/// A named sponsor tier, backed by one post in the sponsorship collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorGroupDef {
  pub label: String,
  pub slug:  String,
}

impl SponsorGroupDef {
  pub fn new(label: &str, slug: &str) -> Self {
    Self {
      label: label.to_owned(),
      slug:  slug.to_owned(),
    }
  }
}

/// Everything the fetchers and the assembler need to know about how the
/// conference is laid out in the CMS.
#[derive(Clone, Debug)]
pub struct ScheduleConfig {
  pub event_collection:       String,
  pub presenter_collection:   String,
  pub sponsorship_collection: String,
  /// ACF relationship field on a sponsorship post listing its members.
  pub group_field:            String,
  pub event_kind_taxonomy:    String,
  pub room_taxonomy:          String,
  pub track_taxonomy:         String,
  /// Event-kind slug marking a seminar session.
  pub session_kind:           String,
  /// Event-kind slug marking a social/networking event.
  pub social_kind:            String,
  /// Content types a sponsor relationship may point at, in probe order.
  pub sponsor_kinds:          Vec<SponsorKind>,
  pub sponsor_groups:         Vec<SponsorGroupDef>,
  /// `per_page` cap for listing requests.
  pub page_size:              usize,
  /// Zone the free-text date and time labels are written in.
  pub timezone:               Tz,
  /// Year applied to date labels that don't carry one.
  pub conference_year:        i32,
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      event_collection:       "events".to_owned(),
      presenter_collection:   "presenter".to_owned(),
      sponsorship_collection: "sponsorships".to_owned(),
      group_field:            "select_sponsors".to_owned(),
      event_kind_taxonomy:    "wigc-event-type".to_owned(),
      room_taxonomy:          "room".to_owned(),
      track_taxonomy:         "track".to_owned(),
      session_kind:           "sessions".to_owned(),
      social_kind:            "socials".to_owned(),
      sponsor_kinds:          SponsorKind::ALL.to_vec(),
      sponsor_groups:         vec![
        SponsorGroupDef::new("Platinum Sponsors", "platinum-sponsors"),
        SponsorGroupDef::new("Gold Sponsors", "gold-sponsors"),
        SponsorGroupDef::new("Silver Sponsors", "silver-sponsors"),
        SponsorGroupDef::new("Bronze Sponsors", "bronze-sponsors"),
        SponsorGroupDef::new("Exhibitors", "exhibitors"),
      ],
      page_size:              100,
      timezone:               Tz::UTC,
      conference_year:        Utc::now().year(),
    }
  }
}

impl ScheduleConfig {
  pub fn is_sponsor_kind(&self, kind: SponsorKind) -> bool {
    self.sponsor_kinds.contains(&kind)
  }
}

#[derive(Clone, Debug)]
pub struct Config {
  pub wp_base_url: String,
  pub schedule:    ScheduleConfig,
}

fn optional_env(key: &str) -> Option<String> {
  std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
  pub fn from_env() -> miette::Result<Self> {
    let wp_base_url = std::env::var("WP_BASE_URL")
      .into_diagnostic()
      .context("missing `WP_BASE_URL` env var")?;

    let mut schedule = ScheduleConfig::default();

    if let Some(tz) = optional_env("CONFERENCE_TIMEZONE") {
      schedule.timezone = tz
        .parse::<Tz>()
        .map_err(|e| miette::miette!("{e}"))
        .context(format!("failed to parse conference timezone, got {tz:?}"))?;
    }
    if let Some(year) = optional_env("CONFERENCE_YEAR") {
      schedule.conference_year = year
        .trim()
        .parse::<i32>()
        .into_diagnostic()
        .context("failed to parse conference year")?;
    }
    if let Some(collection) = optional_env("EVENT_COLLECTION") {
      schedule.event_collection = collection;
    }
    if let Some(kind) = optional_env("SESSION_KIND") {
      schedule.session_kind = kind;
    }
    if let Some(kind) = optional_env("SOCIAL_KIND") {
      schedule.social_kind = kind;
    }
    if let Some(groups) = optional_env("SPONSOR_GROUPS") {
      schedule.sponsor_groups =
        serde_json::from_str::<Vec<SponsorGroupDef>>(&groups)
          .into_diagnostic()
          .context("failed to parse `SPONSOR_GROUPS` as a JSON list")?;
    }

    Ok(Self {
      wp_base_url,
      schedule,
    })
  }
}
