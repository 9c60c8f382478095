use serde::Deserialize;
use serde_json::Value;

/// A CMS post as served by `/wp-json/wp/v2/<collection>`. Every field is
/// optional on the wire; the accessors below fall back to empty values.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WpPost {
  #[serde(default)]
  pub id:       u32,
  #[serde(default)]
  pub slug:     Option<String>,
  #[serde(default)]
  pub title:    Option<Rendered>,
  #[serde(default)]
  pub content:  Option<Rendered>,
  /// ACF custom fields. An object when populated, but `[]` or `false` when
  /// a post has none.
  #[serde(default)]
  pub acf:      Value,
  /// Some collections expose the sponsor website outside of ACF.
  #[serde(default)]
  pub website:  Value,
  #[serde(default, rename = "_embedded")]
  pub embedded: Option<Embedded>,
}

/// A `{ "rendered": ... }` wrapper, occasionally flattened to a string.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Rendered {
  Wrapped {
    #[serde(default)]
    rendered: Option<String>,
  },
  Plain(String),
}

impl Rendered {
  pub fn as_str(&self) -> &str {
    match self {
      Rendered::Wrapped { rendered } => rendered.as_deref().unwrap_or_default(),
      Rendered::Plain(s) => s,
    }
  }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Embedded {
  #[serde(default, rename = "wp:featuredmedia")]
  pub featured_media: Option<Vec<Option<WpMedia>>>,
  #[serde(default, rename = "wp:term")]
  pub terms:          Option<Vec<Option<Vec<Option<WpTerm>>>>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WpMedia {
  #[serde(default)]
  pub source_url:    Option<String>,
  #[serde(default)]
  pub media_details: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct WpTerm {
  #[serde(default)]
  pub taxonomy: Option<String>,
  #[serde(default)]
  pub slug:     Option<String>,
  #[serde(default)]
  pub name:     Option<String>,
}

fn non_empty(s: &str) -> Option<&str> {
  let s = s.trim();
  (!s.is_empty()).then_some(s)
}

impl WpPost {
  pub fn title(&self) -> &str {
    self.title.as_ref().map(Rendered::as_str).unwrap_or_default()
  }

  pub fn content(&self) -> &str {
    self.content.as_ref().map(Rendered::as_str).unwrap_or_default()
  }

  pub fn acf(&self, field: &str) -> Option<&Value> {
    self.acf.get(field).filter(|v| !v.is_null())
  }

  /// A trimmed, non-empty string ACF field.
  pub fn acf_str(&self, field: &str) -> Option<&str> {
    self.acf(field).and_then(Value::as_str).and_then(non_empty)
  }

  pub fn featured_media(&self) -> Option<&WpMedia> {
    self
      .embedded
      .as_ref()?
      .featured_media
      .as_ref()?
      .first()?
      .as_ref()
  }

  /// Every embedded taxonomy term, across all taxonomies.
  pub fn terms(&self) -> impl Iterator<Item = &WpTerm> {
    self
      .embedded
      .iter()
      .filter_map(|e| e.terms.as_ref())
      .flatten()
      .flatten()
      .flatten()
      .flatten()
  }

  /// The first term of a taxonomy carrying a non-empty name.
  pub fn first_term_name(&self, taxonomy: &str) -> Option<&str> {
    self
      .terms()
      .filter(|t| t.taxonomy.as_deref() == Some(taxonomy))
      .find_map(|t| t.name.as_deref().and_then(non_empty))
  }

  /// Slugs of every term in a taxonomy, in embed order.
  pub fn term_slugs(&self, taxonomy: &str) -> Vec<String> {
    self
      .terms()
      .filter(|t| t.taxonomy.as_deref() == Some(taxonomy))
      .filter_map(|t| t.slug.as_deref().and_then(non_empty))
      .map(ToOwned::to_owned)
      .collect()
  }
}

impl WpMedia {
  /// The original upload.
  pub fn full_url(&self) -> Option<&str> {
    self
      .source_url
      .as_deref()
      .and_then(non_empty)
      .or_else(|| self.size_url("full"))
  }

  /// A generated rendition, e.g. `large`, `medium` or `thumbnail`.
  pub fn size_url(&self, size: &str) -> Option<&str> {
    self
      .media_details
      .get("sizes")?
      .get(size)?
      .get("source_url")?
      .as_str()
      .and_then(non_empty)
  }
}

/// Resolves an ACF image/file field, which may be a URL string, or an
/// attachment object. Bare attachment ids can't be resolved without another
/// lookup and yield nothing.
pub fn file_url(value: &Value) -> Option<&str> {
  match value {
    Value::String(s) => non_empty(s),
    Value::Object(_) => [
      value.get("url"),
      value.get("source_url"),
      value.get("guid").and_then(|g| g.get("rendered")),
      value.get("sizes").and_then(|s| s.get("medium")),
      value.get("sizes").and_then(|s| s.get("large")),
      value.get("sizes").and_then(|s| s.get("thumbnail")),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().and_then(non_empty)),
    _ => None,
  }
}
