use std::fmt;

use serde_json::{Map, Value};

use super::Row;
use crate::convert;

/// A row reference used as a mutation target or positional anchor.
///
/// Literal ids go to the device as-is; a search object is looked up first
/// and replaced by the ids of the matching rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// One id or item number, e.g. `*1A` or `3`.
    Id(String),
    /// Several ids, sent comma-joined.
    Ids(Vec<String>),
    /// Field/value pairs identifying the row(s), in caller case.
    Search(Map<String, Value>),
}

impl Reference {
    /// Build a search reference from a JSON object.
    pub fn search(fields: Map<String, Value>) -> Self {
        Self::Search(fields)
    }

    /// Comma-joined ids, or `None` for a search object.
    pub fn literal(&self) -> Option<String> {
        match self {
            Self::Id(id) => Some(id.clone()),
            Self::Ids(ids) => Some(ids.join(",")),
            Self::Search(_) => None,
        }
    }

    pub fn is_search(&self) -> bool {
        matches!(self, Self::Search(_))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => f.write_str(id),
            Self::Ids(ids) => f.write_str(&ids.join(",")),
            Self::Search(fields) => write!(f, "{}", Value::Object(fields.clone())),
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

impl From<String> for Reference {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<&String> for Reference {
    fn from(id: &String) -> Self {
        Self::Id(id.clone())
    }
}

impl From<Vec<String>> for Reference {
    fn from(ids: Vec<String>) -> Self {
        Self::Ids(ids)
    }
}

impl From<Vec<&str>> for Reference {
    fn from(ids: Vec<&str>) -> Self {
        Self::Ids(ids.into_iter().map(str::to_owned).collect())
    }
}

impl From<Map<String, Value>> for Reference {
    fn from(fields: Map<String, Value>) -> Self {
        Self::Search(fields)
    }
}

/// A row refers to itself by id; a row without one is searched by its fields.
impl From<&Row> for Reference {
    fn from(row: &Row) -> Self {
        match row.id() {
            Some(id) => Self::Id(id.to_owned()),
            None => Self::Search(row.iter().map(|(k, v)| (k.to_owned(), v.clone())).collect()),
        }
    }
}

impl From<Value> for Reference {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => {
                match fields.get("id").or_else(|| fields.get(".id")) {
                    Some(id) => Self::Id(convert::coerce_in(id)),
                    None => Self::Search(fields),
                }
            }
            Value::Array(items) => Self::Ids(items.iter().map(convert::coerce_in).collect()),
            other => Self::Id(convert::coerce_in(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_values_map_to_variants() {
        assert_eq!(Reference::from(json!("*1")), Reference::Id("*1".into()));
        assert_eq!(Reference::from(json!(4)), Reference::Id("4".into()));
        assert_eq!(
            Reference::from(json!(["*1", "*2"])),
            Reference::Ids(vec!["*1".into(), "*2".into()])
        );
        assert_eq!(
            Reference::from(json!({"id": "*9", "comment": "x"})),
            Reference::Id("*9".into())
        );
        assert!(Reference::from(json!({"comment": "x"})).is_search());
    }

    #[test]
    fn literal_joins_ids() {
        assert_eq!(Reference::from(vec!["*1", "*2"]).literal().as_deref(), Some("*1,*2"));
        assert_eq!(Reference::from(json!({"comment": "x"})).literal(), None);
    }

    #[test]
    fn display_renders_search_as_json() {
        let reference = Reference::from(json!({"comment": "first rule"}));
        assert_eq!(reference.to_string(), r#"{"comment":"first rule"}"#);
    }
}
