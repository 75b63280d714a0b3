use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one queue entry.
///
/// Queue APIs hand out either numeric or string ids; both compare by value and
/// carry no ordering meaning.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Num(u64),
    Text(String),
}

impl ItemId {
    pub fn as_num(&self) -> Option<u64> {
        match self {
            ItemId::Num(n) => Some(*n),
            ItemId::Text(_) => None,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Num(n) => write!(f, "{n}"),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ItemId {
    fn from(n: u64) -> Self {
        ItemId::Num(n)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        ItemId::Text(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        ItemId::Text(s)
    }
}

/// Render ids the way alerts show them: `#1, #2, #abc`.
pub fn format_ids(ids: &[ItemId]) -> String {
    ids.iter().map(|id| format!("#{id}")).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_text_ids_deserialize_untagged() {
        let ids: Vec<ItemId> = serde_json::from_str(r#"[42, "abc"]"#).unwrap();
        assert_eq!(ids, vec![ItemId::Num(42), ItemId::from("abc")]);
        assert_eq!(ids[0].as_num(), Some(42));
        assert_eq!(ids[1].as_num(), None);
    }

    #[test]
    fn format_ids_prefixes_hash() {
        assert_eq!(format_ids(&[ItemId::from(7), ItemId::from("x")]), "#7, #x");
        assert_eq!(format_ids(&[]), "");
    }
}
