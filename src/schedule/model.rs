use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Event-kind slugs that mark a social event whatever the configured kind.
pub const SOCIAL_KIND_SLUGS: [&str; 2] = ["social", "socials"];

/// One of the content types an event or sponsorship relationship field may
/// point at.
#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SponsorKind {
  TribalOffices,
  Casinos,
  AssociateMembers,
}

impl SponsorKind {
  pub const ALL: [SponsorKind; 3] = [
    SponsorKind::TribalOffices,
    SponsorKind::Casinos,
    SponsorKind::AssociateMembers,
  ];

  /// The CMS collection this kind is served from.
  pub fn collection(&self) -> &'static str {
    match self {
      SponsorKind::TribalOffices => "tribal_offices",
      SponsorKind::Casinos => "casinos",
      SponsorKind::AssociateMembers => "associate_members",
    }
  }
}

impl fmt::Display for SponsorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.collection())
  }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown sponsor kind: {0:?}")]
pub struct UnknownSponsorKind(pub String);

impl FromStr for SponsorKind {
  type Err = UnknownSponsorKind;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    SponsorKind::ALL
      .into_iter()
      .find(|k| k.collection() == s)
      .ok_or_else(|| UnknownSponsorKind(s.to_owned()))
  }
}

/// Composite sponsor identity. Numeric ids are only unique within a kind.
#[derive(
  Clone,
  Copy,
  Debug,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
pub struct SponsorKey {
  pub kind: SponsorKind,
  pub id:   u32,
}

impl fmt::Display for SponsorKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{kind}:{id}", kind = self.kind, id = self.id)
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Presenter {
  pub id:         u32,
  /// Display name, entity-decoded.
  pub name:       String,
  pub first_name: String,
  pub last_name:  String,
  pub title:      String,
  pub org:        String,
  /// Biography with markup preserved.
  pub bio_html:   String,
  pub photo:      Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
  pub id:       u32,
  pub kind:     SponsorKind,
  pub name:     String,
  pub logo_url: Option<String>,
  pub website:  Option<String>,
}

impl Sponsor {
  pub fn key(&self) -> SponsorKey {
    SponsorKey {
      kind: self.kind,
      id:   self.id,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SponsorGroup {
  pub label:    String,
  pub sponsors: Vec<Sponsor>,
}

/// The keys derived from one successful parse of an event's date and start
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleKeys {
  pub starts_at: DateTime<Utc>,
  /// Calendar day of the event in the conference timezone.
  pub day:       NaiveDate,
  /// Epoch millis of `starts_at`.
  pub sort_key:  i64,
  /// Epoch millis of local midnight on `day`.
  pub day_key:   i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id:              u32,
  pub title:           String,
  /// The raw date label, e.g. `"Monday, June 1"`.
  pub date:            Option<String>,
  pub start_time:      Option<String>,
  pub end_time:        Option<String>,
  pub keys:            Option<ScheduleKeys>,
  pub room:            Option<String>,
  pub track:           Option<String>,
  /// Event-kind taxonomy slugs.
  pub kinds:           Vec<String>,
  pub speaker_ids:     Vec<u32>,
  pub moderator_id:    Option<u32>,
  /// Raw sponsor relationship entries, resolved during assembly.
  pub sponsor_rel:     Vec<serde_json::Value>,
  /// Entity-decoded description with markup preserved.
  pub description:     String,
  pub cover_image_url: Option<String>,

  pub speakers:  Vec<Presenter>,
  pub moderator: Option<Presenter>,
  pub sponsors:  Vec<Sponsor>,
}

impl Event {
  pub fn sort_key(&self) -> Option<i64> {
    self.keys.map(|k| k.sort_key)
  }

  pub fn day_key(&self) -> Option<i64> {
    self.keys.map(|k| k.day_key)
  }

  pub fn has_kind(&self, kind: &str) -> bool {
    self.kinds.iter().any(|k| k == kind)
  }

  /// The id as the attendee storage layer keys favorites.
  pub fn favorite_id(&self) -> String {
    self.id.to_string()
  }

  /// `"9:00 AM–10:00 AM"`, or whichever side is present.
  pub fn time_range(&self) -> String {
    crate::text::time_range(
      self.start_time.as_deref(),
      self.end_time.as_deref(),
    )
  }

  /// Whether this is a social event: the configured social kind, or either
  /// of the stock `social`/`socials` slugs.
  pub fn is_social(&self, social_kind: &str) -> bool {
    self.has_kind(social_kind)
      || SOCIAL_KIND_SLUGS.iter().any(|slug| self.has_kind(slug))
  }

  /// Track as shown on cards: hidden for socials and for the `-` sentinel.
  pub fn display_track(&self, social_kind: &str) -> &str {
    if self.is_social(social_kind) {
      return "";
    }
    match self.track.as_deref().map(str::trim) {
      Some("-") | None => "",
      Some(t) => t,
    }
  }

  /// Description as plain text without the inline speaker roster.
  pub fn plain_description(&self) -> String {
    crate::text::clean_description(&crate::text::renderable_text(
      &self.description,
    ))
  }

  /// Every presenter attached to this event, moderator first.
  pub fn presenter_ids(&self) -> impl Iterator<Item = u32> + '_ {
    self.moderator_id.into_iter().chain(self.speaker_ids.iter().copied())
  }
}

/// One assembled schedule load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
  pub sessions:   Vec<Event>,
  pub socials:    Vec<Event>,
  pub all_events: Vec<Event>,
}
