pub mod model;

use std::{future::Future, sync::LazyLock};

use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use self::model::WpPost;

pub static HTTP_CLIENT: LazyLock<reqwest::Client> =
  LazyLock::new(reqwest::Client::new);

pub type Query = [(&'static str, String)];

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum FetchError {
  #[error("request failed: {status} for {url}")]
  #[diagnostic(
    code(conference_guide::fetch::status),
    help("the CMS answered with a non-success status")
  )]
  Status { status: u16, url: String },
  #[error("failed to send request to {url}")]
  #[diagnostic(code(conference_guide::fetch::transport))]
  Transport {
    url:    String,
    #[source]
    source: reqwest::Error,
  },
  #[error("failed to decode response from {url}: {message}")]
  #[diagnostic(code(conference_guide::fetch::decode))]
  Decode { url: String, message: String },
  #[error("request was cancelled")]
  #[diagnostic(code(conference_guide::fetch::cancelled))]
  Cancelled,
}

/// Read access to the CMS REST API, rooted at `/wp-json/wp/v2`.
pub trait ContentSource: Send + Sync {
  /// `GET <root>/<path>?<query>`, decoded as JSON. Non-2xx responses are
  /// errors.
  fn get_json(
    &self,
    path: &str,
    query: &Query,
  ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

#[derive(Clone, Debug)]
pub struct WpClient {
  api_root: String,
  client:   reqwest::Client,
}

impl WpClient {
  pub fn new(base_url: &str) -> Self {
    Self {
      api_root: format!(
        "{base}/wp-json/wp/v2",
        base = base_url.trim_end_matches('/')
      ),
      client:   HTTP_CLIENT.clone(),
    }
  }
}

impl ContentSource for WpClient {
  #[instrument(skip(self))]
  async fn get_json(
    &self,
    path: &str,
    query: &Query,
  ) -> Result<Value, FetchError> {
    let url = format!("{root}/{path}", root = self.api_root);
    let req = self
      .client
      .get(&url)
      .query(query)
      .build()
      .map_err(|source| FetchError::Transport {
        url: url.clone(),
        source,
      })?;
    let url = req.url().to_string();

    trace!(url, "sending CMS request");
    let resp = self.client.execute(req).await.map_err(|source| {
      FetchError::Transport {
        url: url.clone(),
        source,
      }
    })?;

    let status = resp.status();
    if !status.is_success() {
      warn!(url, %status, "got error response from CMS");
      return Err(FetchError::Status {
        status: status.as_u16(),
        url,
      });
    }
    trace!(
      content_length = resp.content_length(),
      "got successful response from CMS"
    );

    let payload =
      resp.text().await.map_err(|source| FetchError::Transport {
        url: url.clone(),
        source,
      })?;
    let jd = &mut serde_json::Deserializer::from_str(&payload);
    serde_path_to_error::deserialize(jd).map_err(|e| FetchError::Decode {
      url,
      message: e.to_string(),
    })
  }
}

/// Renders a request for log and error messages.
pub fn describe(path: &str, query: &Query) -> String {
  if query.is_empty() {
    return path.to_owned();
  }
  let params = query
    .iter()
    .map(|(k, v)| format!("{k}={v}"))
    .collect::<Vec<_>>()
    .join("&");
  format!("{path}?{params}")
}

/// `per_page=<n>&include=<ids>&_embed=1`
pub fn include_query(
  ids: &[u32],
  page_size: usize,
) -> Vec<(&'static str, String)> {
  let include = ids
    .iter()
    .map(u32::to_string)
    .collect::<Vec<_>>()
    .join(",");
  vec![
    ("per_page", page_size.to_string()),
    ("include", include),
    ("_embed", "1".to_owned()),
  ]
}

/// Decodes one post. A post that can't be decoded is logged and skipped so
/// one bad record never sinks a listing.
fn decode_post(raw: &Value, source: &str) -> Option<WpPost> {
  serde_path_to_error::deserialize::<_, WpPost>(raw)
    .inspect_err(|e| {
      warn!(
        source,
        path = %e.path(),
        error = %e.inner(),
        "skipping CMS post that failed to decode"
      );
    })
    .ok()
}

/// Fetches a listing of posts from a collection.
#[instrument(skip(source))]
pub async fn fetch_posts<S: ContentSource>(
  source: &S,
  collection: &str,
  query: &Query,
) -> Result<Vec<WpPost>, FetchError> {
  let what = describe(collection, query);
  let payload = source.get_json(collection, query).await?;
  let Value::Array(items) = payload else {
    return Err(FetchError::Decode {
      url:     what,
      message: "expected a JSON array of posts".to_owned(),
    });
  };

  let posts = items
    .iter()
    .filter_map(|raw| decode_post(raw, &what))
    .collect::<Vec<_>>();
  debug!(
    count = posts.len(),
    received = items.len(),
    "fetched CMS posts"
  );
  Ok(posts)
}

/// Fetches one post with its embedded media and terms.
#[instrument(skip(source))]
pub async fn fetch_post<S: ContentSource>(
  source: &S,
  collection: &str,
  id: u32,
) -> Result<WpPost, FetchError> {
  let path = format!("{collection}/{id}");
  let query = [("_embed", "1".to_owned())];
  let what = describe(&path, &query);
  let payload = source.get_json(&path, &query).await?;
  serde_path_to_error::deserialize::<_, WpPost>(&payload).map_err(|e| {
    FetchError::Decode {
      url:     what,
      message: e.to_string(),
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_include_queries() {
    let query = include_query(&[3, 1, 2], 100);
    assert_eq!(
      describe("presenter", &query),
      "presenter?per_page=100&include=3,1,2&_embed=1"
    );
    assert_eq!(describe("events", &[]), "events");
  }

  #[test]
  fn api_root_is_normalized() {
    let client = WpClient::new("https://example.org/");
    assert_eq!(client.api_root, "https://example.org/wp-json/wp/v2");
  }
}
