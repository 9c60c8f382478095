//! Normalizing relationship field values.
//!
//! ACF relationship fields arrive as bare ids, as post objects carrying `ID`
//! (or `id`) and `post_type`, as a single value where a list was expected,
//! or as `""`/`false` when empty. Nothing in here fails: anything that can't
//! be made sense of is dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schedule::model::{SponsorKey, SponsorKind};

const ID_KEYS: [&str; 2] = ["ID", "id"];
const TYPE_KEYS: [&str; 2] = ["post_type", "type"];

/// A relationship entry whose target kind may not be known yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelRef {
  pub id:   u32,
  #[serde(rename = "post_type")]
  pub kind: Option<SponsorKind>,
}

impl RelRef {
  pub fn key(&self) -> Option<SponsorKey> {
    self.kind.map(|kind| SponsorKey { kind, id: self.id })
  }
}

/// Coerces a positive integer id out of a number, a numeric string, or an
/// object carrying one under `ID`/`id`.
pub fn coerce_id(raw: &Value) -> Option<u32> {
  let id = match raw {
    Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
    Value::String(s) => s.trim().parse::<u32>().ok(),
    Value::Object(map) => ID_KEYS
      .iter()
      .filter_map(|k| map.get(*k))
      .find_map(|v| match v {
        Value::Object(_) => None,
        v => coerce_id(v),
      }),
    _ => None,
  };
  id.filter(|id| *id > 0)
}

pub fn normalize_rel_item(raw: &Value) -> Option<RelRef> {
  match raw {
    Value::Object(map) => {
      let id = coerce_id(raw)?;
      let kind = TYPE_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find_map(Value::as_str)
        .and_then(|t| t.parse::<SponsorKind>().ok());
      Some(RelRef { id, kind })
    }
    Value::Number(_) => coerce_id(raw).map(|id| RelRef { id, kind: None }),
    _ => None,
  }
}

/// Flattens a singular-or-plural field value into its entries.
pub fn entries(raw: &Value) -> Vec<&Value> {
  match raw {
    Value::Array(items) => items
      .iter()
      .flat_map(|item| match item {
        Value::Array(inner) => inner.iter().collect::<Vec<_>>(),
        item => vec![item],
      })
      .collect(),
    Value::Null => Vec::new(),
    single => vec![single],
  }
}

/// Typed relationship entries, in field order. Entries without a resolvable
/// kind are dropped.
pub fn normalize_rel_list(raw: &Value) -> Vec<SponsorKey> {
  entries(raw)
    .into_iter()
    .filter_map(normalize_rel_item)
    .filter_map(|r| r.key())
    .collect()
}

/// Presenter ids from a speakers-style field, in field order.
pub fn id_list(raw: &Value) -> Vec<u32> {
  entries(raw).into_iter().filter_map(coerce_id).collect()
}

/// The first id of a single-presenter field such as a moderator.
pub fn first_id(raw: &Value) -> Option<u32> {
  entries(raw).into_iter().next().and_then(coerce_id)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn object_items_carry_kind() {
    assert_eq!(
      normalize_rel_item(&json!({ "ID": 12, "post_type": "casinos" })),
      Some(RelRef {
        id:   12,
        kind: Some(SponsorKind::Casinos),
      })
    );
    assert_eq!(
      normalize_rel_item(&json!({ "id": "40", "post_type": "tribal_offices" })),
      Some(RelRef {
        id:   40,
        kind: Some(SponsorKind::TribalOffices),
      })
    );
  }

  #[test]
  fn bare_ids_have_no_kind() {
    assert_eq!(
      normalize_rel_item(&json!(7)),
      Some(RelRef { id: 7, kind: None })
    );
  }

  #[test]
  fn malformed_items_are_none() {
    for raw in [
      json!(null),
      json!(""),
      json!([]),
      json!({}),
      json!({ "post_type": "casinos" }),
      json!(-3),
      json!(0),
      json!(1.5),
      json!(true),
    ] {
      assert_eq!(normalize_rel_item(&raw), None, "{raw}");
    }
  }

  #[test]
  fn unknown_post_types_have_no_kind() {
    assert_eq!(
      normalize_rel_item(&json!({ "ID": 3, "post_type": "page" })),
      Some(RelRef { id: 3, kind: None })
    );
  }

  #[test]
  fn normalizing_own_output_is_stable() {
    for raw in [
      json!({ "ID": 12, "post_type": "associate_members" }),
      json!(99),
    ] {
      let once = normalize_rel_item(&raw).unwrap();
      let again =
        normalize_rel_item(&serde_json::to_value(once).unwrap()).unwrap();
      assert_eq!(once, again);
    }
  }

  #[test]
  fn lists_accept_singular_and_drop_untyped() {
    let single = json!({ "ID": 5, "post_type": "casinos" });
    assert_eq!(
      normalize_rel_list(&single),
      vec![SponsorKey {
        kind: SponsorKind::Casinos,
        id:   5,
      }]
    );

    let mixed = json!([
      { "ID": 5, "post_type": "casinos" },
      8,
      null,
      [{ "id": 9, "post_type": "tribal_offices" }],
      { "ID": 10 },
    ]);
    assert_eq!(normalize_rel_list(&mixed), vec![
      SponsorKey {
        kind: SponsorKind::Casinos,
        id:   5,
      },
      SponsorKey {
        kind: SponsorKind::TribalOffices,
        id:   9,
      },
    ]);

    for raw in [json!(null), json!(""), json!([]), json!(false)] {
      assert!(normalize_rel_list(&raw).is_empty(), "{raw}");
    }
  }

  #[test]
  fn presenter_ids_are_coerced() {
    assert_eq!(
      id_list(&json!([3, "4", { "ID": 5 }, { "id": "6" }, "x", 0, [7]])),
      vec![3, 4, 5, 6, 7]
    );
    assert_eq!(id_list(&json!(11)), vec![11]);
    assert_eq!(id_list(&json!("")), Vec::<u32>::new());
    assert_eq!(first_id(&json!([21, 22])), Some(21));
    assert_eq!(first_id(&json!({ "ID": 23 })), Some(23));
    assert_eq!(first_id(&json!(false)), None);
  }
}
