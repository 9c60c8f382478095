//! Presenter lookups and the presenter directory.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::{
  config::ScheduleConfig,
  fallback::{PRESENTER_PHOTO_CHAIN, first_of},
  schedule::model::{Event, Presenter},
  text::{decode_entities, renderable_text},
  wp::{ContentSource, FetchError, fetch_posts, include_query, model::WpPost},
};

pub fn presenter_from_post(post: &WpPost) -> Presenter {
  let field = |name: &str| post.acf_str(name).unwrap_or_default().to_owned();
  Presenter {
    id:         post.id,
    name:       decode_entities(post.title()).into_owned(),
    first_name: field("first_name"),
    last_name:  field("last_name"),
    title:      field("presentertitle"),
    org:        field("presenterorg"),
    bio_html:   field("bio"),
    photo:      first_of(PRESENTER_PHOTO_CHAIN, post),
  }
}

/// Fetches the given presenters in one batched request, indexed by id.
/// No ids, no request.
#[instrument(skip_all, fields(requested = ids.len()))]
pub async fn fetch_presenters_by_ids<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
  ids: &[u32],
) -> Result<HashMap<u32, Presenter>, FetchError> {
  let unique = ids
    .iter()
    .copied()
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect::<Vec<_>>();
  if unique.is_empty() {
    return Ok(HashMap::new());
  }

  let query = include_query(&unique, config.page_size);
  let posts =
    fetch_posts(source, &config.presenter_collection, &query).await?;
  let presenters = posts
    .iter()
    .map(|p| (p.id, presenter_from_post(p)))
    .collect::<HashMap<_, _>>();

  if presenters.len() < unique.len() {
    warn!(
      requested = unique.len(),
      resolved = presenters.len(),
      "some presenters could not be resolved"
    );
  }
  debug!(count = presenters.len(), "fetched presenters by id");
  Ok(presenters)
}

/// Fetches the presenter directory in one listing request.
#[instrument(skip_all)]
pub async fn fetch_presenters_list<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
) -> Result<Vec<Presenter>, FetchError> {
  let query = [
    ("per_page", config.page_size.to_string()),
    ("_embed", "1".to_owned()),
  ];
  let posts =
    fetch_posts(source, &config.presenter_collection, &query).await?;
  let presenters = posts.iter().map(presenter_from_post).collect::<Vec<_>>();
  debug!(count = presenters.len(), "fetched presenter directory");
  Ok(presenters)
}

fn sort_field(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Last name, then first name, then display name. Presenters without a last
/// name are placed by their display name.
fn sort_key(p: &Presenter) -> (String, String, String) {
  let name = sort_field(&p.name);
  let last = match sort_field(&p.last_name) {
    last if last.is_empty() => name.clone(),
    last => last,
  };
  (last, sort_field(&p.first_name), name)
}

pub fn sort_presenters(presenters: &mut [Presenter]) {
  presenters.sort_by_cached_key(sort_key);
}

/// Presenters who speak at or moderate at least one event.
pub fn active_presenter_ids(events: &[Event]) -> HashSet<u32> {
  events.iter().flat_map(Event::presenter_ids).collect()
}

/// Active presenters matching a case-insensitive search over their names,
/// role and plain-text bio.
pub fn filter_presenters<'a>(
  presenters: &'a [Presenter],
  active: &HashSet<u32>,
  search: &str,
) -> Vec<&'a Presenter> {
  let query = search.trim().to_lowercase();
  presenters
    .iter()
    .filter(|p| active.contains(&p.id))
    .filter(|p| {
      if query.is_empty() {
        return true;
      }
      let bio = renderable_text(&p.bio_html);
      [
        p.name.as_str(),
        p.first_name.as_str(),
        p.last_name.as_str(),
        p.title.as_str(),
        p.org.as_str(),
        bio.as_str(),
      ]
      .iter()
      .filter(|s| !s.is_empty())
      .copied()
      .collect::<Vec<_>>()
      .join(" ")
      .to_lowercase()
      .contains(&query)
    })
    .collect()
}

/// Events a presenter speaks at or moderates, in the given order.
pub fn sessions_for_presenter(
  events: &[Event],
  presenter_id: u32,
) -> Vec<&Event> {
  events
    .iter()
    .filter(|e| e.presenter_ids().any(|id| id == presenter_id))
    .collect()
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn presenter(id: u32, first: &str, last: &str, name: &str) -> Presenter {
    Presenter {
      id,
      name:       name.to_owned(),
      first_name: first.to_owned(),
      last_name:  last.to_owned(),
      title:      String::new(),
      org:        String::new(),
      bio_html:   String::new(),
      photo:      None,
    }
  }

  #[test]
  fn maps_presenter_posts() {
    let post: WpPost = serde_json::from_value(json!({
      "id": 12,
      "title": { "rendered": "Dr. Ana O&#8217;Neil" },
      "acf": {
        "first_name": "Ana",
        "last_name": "O'Neil",
        "presentertitle": "Chair",
        "presenterorg": "Gaming Commission",
        "bio": "<p>Bio</p>",
        "presenterphoto": "",
        "presenter_photo_upload": { "url": "https://cdn/ana.jpg" }
      }
    }))
    .unwrap();
    let p = presenter_from_post(&post);
    assert_eq!(p.name, "Dr. Ana O\u{2019}Neil");
    assert_eq!(p.last_name, "O'Neil");
    assert_eq!(p.title, "Chair");
    assert_eq!(p.org, "Gaming Commission");
    assert_eq!(p.bio_html, "<p>Bio</p>");
    assert_eq!(p.photo.as_deref(), Some("https://cdn/ana.jpg"));
  }

  #[test]
  fn sorts_by_last_then_first_then_name() {
    let mut list = vec![
      presenter(1, "Zed", "Adams", "Zed Adams"),
      presenter(2, "Amy", "adams", "Amy Adams"),
      presenter(3, "", "", "Cher"),
      presenter(4, "Bo", "Baker", "Bo Baker"),
    ];
    sort_presenters(&mut list);
    let ids = list.iter().map(|p| p.id).collect::<Vec<_>>();
    // "Cher" has no last name and is placed by display name
    assert_eq!(ids, vec![2, 1, 4, 3]);
  }

  #[test]
  fn filters_to_active_presenters() {
    let list = vec![
      presenter(1, "Ana", "Lopez", "Ana Lopez"),
      presenter(2, "Ben", "Ng", "Ben Ng"),
    ];
    let active = HashSet::from([1]);
    let all = filter_presenters(&list, &active, "  ");
    assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);
    assert!(filter_presenters(&list, &active, "ng").is_empty());
    assert_eq!(filter_presenters(&list, &active, "LOP").len(), 1);
  }
}
