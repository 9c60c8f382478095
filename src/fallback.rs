//! Ordered, first-to-succeed accessor chains for fields the CMS spreads
//! across several places.

use crate::wp::model::{WpPost, file_url};

pub type Accessor = fn(&WpPost) -> Option<String>;

/// Evaluates a chain, returning the first accessor that yields a value.
pub fn first_of(chain: &[Accessor], post: &WpPost) -> Option<String> {
  chain.iter().find_map(|accessor| accessor(post))
}

pub const EVENT_COVER_CHAIN: &[Accessor] = &[
  acf_event_image,
  featured_full,
  featured_large,
  featured_medium_large,
  featured_medium,
];

pub const SPONSOR_LOGO_CHAIN: &[Accessor] = &[
  featured_full,
  featured_medium,
  featured_thumbnail,
  acf_image,
];

pub const PRESENTER_PHOTO_CHAIN: &[Accessor] = &[
  acf_presenter_photo,
  acf_presenter_photo_upload,
  featured_full,
  featured_medium,
];

pub const SPONSOR_WEBSITE_CHAIN: &[Accessor] =
  &[acf_website, top_level_website];

/// Raw (still entity-encoded) event description.
pub const EVENT_DESCRIPTION_CHAIN: &[Accessor] = &[
  acf_session_description_dashed,
  acf_session_description,
  acf_event_description,
  acf_event_description_dashed,
  post_content,
];

fn acf_text(post: &WpPost, field: &str) -> Option<String> {
  post.acf_str(field).map(ToOwned::to_owned)
}

fn acf_file(post: &WpPost, field: &str) -> Option<String> {
  post.acf(field).and_then(file_url).map(ToOwned::to_owned)
}

fn featured_size(post: &WpPost, size: &str) -> Option<String> {
  post
    .featured_media()?
    .size_url(size)
    .map(ToOwned::to_owned)
}

fn acf_event_image(post: &WpPost) -> Option<String> {
  acf_file(post, "event_image")
}

fn acf_image(post: &WpPost) -> Option<String> {
  acf_file(post, "image")
}

fn acf_presenter_photo(post: &WpPost) -> Option<String> {
  acf_file(post, "presenterphoto")
}

fn acf_presenter_photo_upload(post: &WpPost) -> Option<String> {
  acf_file(post, "presenter_photo_upload")
}

fn featured_full(post: &WpPost) -> Option<String> {
  post.featured_media()?.full_url().map(ToOwned::to_owned)
}

fn featured_large(post: &WpPost) -> Option<String> {
  featured_size(post, "large")
}

fn featured_medium_large(post: &WpPost) -> Option<String> {
  featured_size(post, "medium_large")
}

fn featured_medium(post: &WpPost) -> Option<String> {
  featured_size(post, "medium")
}

fn featured_thumbnail(post: &WpPost) -> Option<String> {
  featured_size(post, "thumbnail")
}

fn acf_session_description_dashed(post: &WpPost) -> Option<String> {
  acf_text(post, "session-description")
}

fn acf_session_description(post: &WpPost) -> Option<String> {
  acf_text(post, "session_description")
}

fn acf_event_description(post: &WpPost) -> Option<String> {
  acf_text(post, "event_description")
}

fn acf_event_description_dashed(post: &WpPost) -> Option<String> {
  acf_text(post, "event-description")
}

fn acf_website(post: &WpPost) -> Option<String> {
  acf_text(post, "website")
}

fn top_level_website(post: &WpPost) -> Option<String> {
  post
    .website
    .as_str()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(ToOwned::to_owned)
}

fn post_content(post: &WpPost) -> Option<String> {
  let content = post.content().trim();
  (!content.is_empty()).then(|| content.to_owned())
}
