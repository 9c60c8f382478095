//! Turning CMS rich text into display text.

use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

static STYLE_BLOCK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<style.*?>.*?</style>").unwrap());
static SCRIPT_BLOCK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<script.*?>.*?</script>").unwrap());
static LINE_BREAK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>").unwrap());
static PARAGRAPH_END: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)<\s*/p\s*>").unwrap());
static ANY_TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static BLANK_RUN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

pub const ELLIPSIS: char = '…';

/// Decodes named and numeric HTML character references.
pub fn decode_entities(input: &str) -> Cow<'_, str> {
  html_escape::decode_html_entities(input)
}

/// Drops `<style>`/`<script>` blocks, turns `<br>` and `</p>` into line
/// breaks, removes every other tag and squeezes blank runs to one empty line.
pub fn strip_markup(input: &str) -> String {
  let s = STYLE_BLOCK.replace_all(input, "");
  let s = SCRIPT_BLOCK.replace_all(&s, "");
  let s = LINE_BREAK.replace_all(&s, "\n");
  let s = PARAGRAPH_END.replace_all(&s, "\n\n");
  let s = ANY_TAG.replace_all(&s, "");
  let s = BLANK_RUN.replace_all(&s, "\n\n");
  s.trim().to_owned()
}

/// The canonical CMS-text-to-display-text conversion.
pub fn renderable_text(input: &str) -> String {
  strip_markup(&decode_entities(input))
}

/// Truncates to `max_len` characters, without regard for word boundaries,
/// drops trailing whitespace and appends an ellipsis.
pub fn excerpt(text: &str, max_len: usize) -> Cow<'_, str> {
  match text.char_indices().nth(max_len) {
    None => Cow::Borrowed(text),
    Some((cut, _)) => {
      let mut out = text[..cut].trim_end().to_owned();
      out.push(ELLIPSIS);
      Cow::Owned(out)
    }
  }
}

/// Removes `Speaker:`/`Speakers:` roster lines that editors paste into
/// descriptions; the resolved presenters are shown separately.
pub fn clean_description(plain: &str) -> String {
  plain
    .lines()
    .filter(|line| {
      let line = line.trim().to_lowercase();
      !line.starts_with("speakers:") && !line.starts_with("speaker:")
    })
    .collect::<Vec<_>>()
    .join("\n")
    .trim()
    .to_owned()
}

pub fn time_range(start: Option<&str>, end: Option<&str>) -> String {
  let start = start.map(str::trim).unwrap_or_default();
  let end = end.map(str::trim).unwrap_or_default();
  match (start.is_empty(), end.is_empty()) {
    (false, false) => format!("{start}–{end}"),
    (false, true) => start.to_owned(),
    (true, _) => end.to_owned(),
  }
}
