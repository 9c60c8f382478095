#![allow(dead_code)]

use std::{
  collections::{HashMap, HashSet, VecDeque},
  sync::Mutex,
  time::Duration,
};

use conference_guide::{
  config::ScheduleConfig,
  wp::{ContentSource, FetchError, Query, describe},
};
use serde_json::{Value, json};

/// In-memory CMS. Listings honor `include` and `slug`; `<collection>/<id>`
/// returns one post or a 404.
#[derive(Default)]
pub struct FakeSource {
  posts:    HashMap<String, Vec<Value>>,
  failing:  HashSet<String>,
  pending:  HashSet<String>,
  delays:   Mutex<HashMap<String, VecDeque<Duration>>>,
  requests: Mutex<Vec<String>>,
}

impl FakeSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_posts(mut self, collection: &str, posts: Vec<Value>) -> Self {
    self.posts.entry(collection.to_owned()).or_default().extend(posts);
    self
  }

  /// Every request to `collection` answers 500.
  pub fn failing(mut self, collection: &str) -> Self {
    self.failing.insert(collection.to_owned());
    self
  }

  /// Requests to `collection` never complete.
  pub fn pending(mut self, collection: &str) -> Self {
    self.pending.insert(collection.to_owned());
    self
  }

  /// The next requests to `collection` wait for these durations, one each.
  pub fn delayed(
    self,
    collection: &str,
    delays: impl IntoIterator<Item = Duration>,
  ) -> Self {
    self
      .delays
      .lock()
      .unwrap()
      .entry(collection.to_owned())
      .or_default()
      .extend(delays);
    self
  }

  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().unwrap().clone()
  }

  pub fn request_count(&self, collection: &str) -> usize {
    self
      .requests()
      .iter()
      .filter(|r| collection_of(r) == collection)
      .count()
  }

  fn next_delay(&self, collection: &str) -> Option<Duration> {
    self
      .delays
      .lock()
      .unwrap()
      .get_mut(collection)
      .and_then(VecDeque::pop_front)
  }
}

fn collection_of(request: &str) -> &str {
  request
    .split(['/', '?'])
    .next()
    .unwrap_or_default()
}

fn param<'q>(query: &'q Query, name: &str) -> Option<&'q str> {
  query
    .iter()
    .find(|(k, _)| *k == name)
    .map(|(_, v)| v.as_str())
}

impl ContentSource for FakeSource {
  async fn get_json(
    &self,
    path: &str,
    query: &Query,
  ) -> Result<Value, FetchError> {
    let url = describe(path, query);
    self.requests.lock().unwrap().push(url.clone());

    let (collection, id) = match path.split_once('/') {
      Some((collection, id)) => (collection, id.parse::<u32>().ok()),
      None => (path, None),
    };
    if let Some(delay) = self.next_delay(collection) {
      tokio::time::sleep(delay).await;
    }
    if self.pending.contains(collection) {
      std::future::pending::<()>().await;
    }
    if self.failing.contains(collection) {
      return Err(FetchError::Status { status: 500, url });
    }

    let mut posts = self.posts.get(collection).cloned().unwrap_or_default();
    if let Some(id) = id {
      return posts
        .into_iter()
        .find(|p| p["id"] == id)
        .ok_or(FetchError::Status { status: 404, url });
    }
    if let Some(include) = param(query, "include") {
      let ids = include
        .split(',')
        .filter_map(|s| s.parse::<u64>().ok())
        .collect::<HashSet<_>>();
      posts.retain(|p| p["id"].as_u64().is_some_and(|id| ids.contains(&id)));
    }
    if let Some(slug) = param(query, "slug") {
      posts.retain(|p| p["slug"] == slug);
    }
    Ok(Value::Array(posts))
  }
}

pub fn config() -> ScheduleConfig {
  ScheduleConfig {
    conference_year: 2026,
    ..ScheduleConfig::default()
  }
}

pub fn event_post(
  id: u32,
  date: &str,
  start: &str,
  kind: &str,
  acf: Value,
) -> Value {
  let mut fields = json!({
    "event-date": date,
    "event-time-start": start,
  });
  if let (Some(fields), Value::Object(extra)) = (fields.as_object_mut(), acf) {
    fields.extend(extra);
  }
  json!({
    "id": id,
    "title": { "rendered": format!("Event {id}") },
    "acf": fields,
    "_embedded": {
      "wp:term": [[
        { "taxonomy": "wigc-event-type", "slug": kind, "name": kind }
      ]]
    }
  })
}

pub fn presenter_post(id: u32, first: &str, last: &str) -> Value {
  json!({
    "id": id,
    "title": { "rendered": format!("{first} {last}") },
    "acf": { "first_name": first, "last_name": last }
  })
}

pub fn sponsor_post(id: u32, name: &str) -> Value {
  json!({
    "id": id,
    "title": { "rendered": name },
    "acf": { "website": format!("https://example.com/{id}") }
  })
}
