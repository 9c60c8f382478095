//! Sponsor lookups across the polymorphic sponsor content types, and sponsor
//! group assembly.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::{
  config::{ScheduleConfig, SponsorGroupDef},
  fallback::{SPONSOR_LOGO_CHAIN, SPONSOR_WEBSITE_CHAIN, first_of},
  relationship::normalize_rel_list,
  schedule::model::{Sponsor, SponsorGroup, SponsorKey, SponsorKind},
  text::decode_entities,
  wp::{
    ContentSource, FetchError, fetch_post, fetch_posts, include_query,
    model::WpPost,
  },
};

pub fn sponsor_from_post(post: &WpPost, kind: SponsorKind) -> Sponsor {
  Sponsor {
    id:       post.id,
    kind,
    name:     decode_entities(post.title()).into_owned(),
    logo_url: first_of(SPONSOR_LOGO_CHAIN, post),
    website:  first_of(SPONSOR_WEBSITE_CHAIN, post),
  }
}

/// Fetches one batch of sponsors of a single kind. A failed batch degrades
/// to no sponsors for that kind.
async fn fetch_kind_batch<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
  kind: SponsorKind,
  ids: &[u32],
) -> Vec<Sponsor> {
  let query = include_query(ids, config.page_size);
  match fetch_posts(source, kind.collection(), &query).await {
    Ok(posts) => posts.iter().map(|p| sponsor_from_post(p, kind)).collect(),
    Err(error) => {
      warn!(%kind, %error, "failed to fetch sponsor batch, skipping kind");
      Vec::new()
    }
  }
}

/// Resolves typed relationship entries, with one concurrent batched request
/// per kind present. Entries of kinds outside the configured set, and ids the
/// CMS doesn't return, are left out of the mapping.
#[instrument(skip_all, fields(requested = keys.len()))]
pub async fn fetch_sponsors_by_rel_items<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
  keys: &[SponsorKey],
) -> HashMap<SponsorKey, Sponsor> {
  let mut by_kind = BTreeMap::<SponsorKind, Vec<u32>>::new();
  for key in keys {
    if !config.is_sponsor_kind(key.kind) {
      debug!(%key, "ignoring relationship to unconfigured sponsor kind");
      continue;
    }
    let ids = by_kind.entry(key.kind).or_default();
    if !ids.contains(&key.id) {
      ids.push(key.id);
    }
  }
  if by_kind.is_empty() {
    return HashMap::new();
  }

  let batches = join_all(
    by_kind
      .iter()
      .map(|(kind, ids)| fetch_kind_batch(source, config, *kind, ids)),
  )
  .await;

  let sponsors = batches
    .into_iter()
    .flatten()
    .map(|s| (s.key(), s))
    .collect::<HashMap<_, _>>();
  debug!(
    kinds = by_kind.len(),
    count = sponsors.len(),
    "fetched sponsors by relationship"
  );
  sponsors
}

/// Resolves bare sponsor ids whose kind is unknown by probing every
/// configured kind concurrently. Results are merged by numeric id (a later
/// kind in probe order wins a collision), de-duplicated, and returned in the
/// order of `ids`. Unresolved ids are dropped.
///
/// Cancelling `cancel` abandons the in-flight requests and returns
/// [`FetchError::Cancelled`].
#[instrument(skip_all, fields(requested = ids.len()))]
pub async fn fetch_event_sponsors_by_ids<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
  ids: &[u32],
  cancel: &CancellationToken,
) -> Result<Vec<Sponsor>, FetchError> {
  let ids = ids.iter().copied().filter(|id| *id > 0).collect::<Vec<_>>();
  if ids.is_empty() {
    return Ok(Vec::new());
  }

  let probes = join_all(
    config
      .sponsor_kinds
      .iter()
      .map(|kind| fetch_kind_batch(source, config, *kind, &ids)),
  );
  let batches = tokio::select! {
    biased;
    _ = cancel.cancelled() => {
      debug!("sponsor probe cancelled");
      return Err(FetchError::Cancelled);
    }
    batches = probes => batches,
  };

  let mut by_id = HashMap::new();
  for sponsor in batches.into_iter().flatten() {
    by_id.insert(sponsor.id, sponsor);
  }

  let mut seen = HashSet::new();
  let ordered = ids
    .iter()
    .filter(|id| seen.insert(**id))
    .filter_map(|id| by_id.remove(id))
    .collect::<Vec<_>>();
  debug!(count = ordered.len(), "resolved event sponsors by id");
  Ok(ordered)
}

/// Fetches a single sponsor. Kinds outside the configured set resolve to
/// nothing.
#[instrument(skip(source, config))]
pub async fn fetch_sponsor<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
  kind: SponsorKind,
  id: u32,
) -> Result<Option<Sponsor>, FetchError> {
  if !config.is_sponsor_kind(kind) || id == 0 {
    return Ok(None);
  }
  let post = fetch_post(source, kind.collection(), id).await?;
  Ok(Some(sponsor_from_post(&post, kind)))
}

#[instrument(skip(source, config))]
async fn fetch_group_post<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
  slug: &str,
) -> Result<Option<WpPost>, FetchError> {
  let query = [("slug", slug.to_owned())];
  let posts =
    fetch_posts(source, &config.sponsorship_collection, &query).await?;
  Ok(posts.into_iter().next())
}

/// Assembles the configured sponsor groups, in configured order.
///
/// A group is left out when its sponsorship post can't be found or fetched,
/// when its relationship field is empty, or when none of its members
/// resolve. Only when every group lookup fails is the whole call an error.
#[instrument(skip_all, fields(groups = config.sponsor_groups.len()))]
pub async fn fetch_sponsor_groups<S: ContentSource>(
  source: &S,
  config: &ScheduleConfig,
) -> Result<Vec<SponsorGroup>, FetchError> {
  let lookups = join_all(
    config
      .sponsor_groups
      .iter()
      .map(|def| fetch_group_post(source, config, &def.slug)),
  )
  .await;

  let mut failures = 0;
  let mut last_error = None;
  let mut members: Vec<(&SponsorGroupDef, Vec<SponsorKey>)> = Vec::new();
  for (def, lookup) in config.sponsor_groups.iter().zip(lookups) {
    match lookup {
      Ok(Some(post)) => {
        let keys = post
          .acf(&config.group_field)
          .map(normalize_rel_list)
          .unwrap_or_default();
        if keys.is_empty() {
          debug!(slug = def.slug, "sponsor group has no members, skipping");
          continue;
        }
        members.push((def, keys));
      }
      Ok(None) => {
        warn!(slug = def.slug, "sponsor group post not found, skipping");
      }
      Err(error) => {
        warn!(slug = def.slug, %error, "failed to fetch sponsor group post");
        failures += 1;
        last_error = Some(error);
      }
    }
  }
  if failures == config.sponsor_groups.len() {
    if let Some(error) = last_error {
      return Err(error);
    }
  }

  let all_keys = members
    .iter()
    .flat_map(|(_, keys)| keys.iter().copied())
    .collect::<Vec<_>>();
  let sponsors = fetch_sponsors_by_rel_items(source, config, &all_keys).await;

  let groups = members
    .into_iter()
    .filter_map(|(def, keys)| {
      let mut seen = HashSet::new();
      let resolved = keys
        .iter()
        .filter(|k| seen.insert(**k))
        .filter_map(|k| sponsors.get(k).cloned())
        .collect::<Vec<_>>();
      if resolved.is_empty() {
        warn!(slug = def.slug, "no sponsors in group resolved, skipping");
        return None;
      }
      Some(SponsorGroup {
        label:    def.label.clone(),
        sponsors: resolved,
      })
    })
    .collect::<Vec<_>>();
  debug!(count = groups.len(), "assembled sponsor groups");
  Ok(groups)
}
