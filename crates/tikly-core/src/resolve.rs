// ── Reference resolution ──
//
// Turns search objects in `.id`, `numbers`, `place-before`, `place-after`
// and `destination` into concrete row ids, and looks up implicit targets
// from queued filters. Every lookup is a `print =.proplist=.id` on the
// same menu.

use serde_json::Map;
use serde_json::Value;
use tracing::{debug, warn};

use crate::convert::{coerce_in, wire_key};
use crate::error::CoreError;
use crate::menu::Menu;
use crate::model::Reference;
use crate::query::pending::split_ids;
use crate::query::{Filter, ParamValue, PendingQuery};

/// Keys that name a single position rather than a set of rows.
const POSITIONAL_KEYS: &[&str] = &["place-before", "place-after", "destination"];

pub(crate) struct Resolver<'a> {
    menu: &'a Menu,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(menu: &'a Menu) -> Self {
        Self { menu }
    }

    /// Ids of every row matching `filters`, in device order.
    pub(crate) async fn lookup_ids(&self, filters: &[Filter]) -> Result<Vec<String>, CoreError> {
        let mut sentence = vec![
            self.menu.path().command("print"),
            "=.proplist=.id".to_owned(),
        ];
        for filter in filters {
            filter.write_words(&mut sentence);
        }
        let rows = self.menu.write(sentence).await?;
        Ok(rows.into_iter().filter_map(|mut row| row.shift_remove(".id")).collect())
    }

    async fn search(&self, fields: &Map<String, Value>) -> Result<Vec<String>, CoreError> {
        let filters: Vec<Filter> = fields
            .iter()
            .map(|(key, value)| Filter::eq(wire_key(key), coerce_in(value)))
            .collect();
        self.lookup_ids(&filters).await
    }

    /// Concrete wire value for `reference` under `key`.
    pub(crate) async fn resolve(&self, key: &str, reference: &Reference) -> Result<String, CoreError> {
        let fields = match reference {
            Reference::Search(fields) => fields,
            literal => return Ok(literal.literal().unwrap_or_default()),
        };
        let ids = self.search(fields).await?;
        debug!(menu = %self.menu.path(), key, ids = ids.len(), "resolved reference");

        let Some(first) = ids.first() else {
            return Err(self.not_found(key, &reference.to_string()));
        };
        if POSITIONAL_KEYS.contains(&key) {
            if ids.len() > 1 {
                warn!(
                    menu = %self.menu.path(),
                    key,
                    matches = ids.len(),
                    "positional reference matched several rows, using the first"
                );
            }
            return Ok(first.clone());
        }
        Ok(ids.join(","))
    }

    /// Replace every reference attribute in `pending` with its literal form.
    pub(crate) async fn resolve_params(&self, pending: &mut PendingQuery) -> Result<(), CoreError> {
        for param in pending.params_mut() {
            if let ParamValue::Reference(reference) = &param.value {
                let literal = self.resolve(&param.key, reference).await?;
                param.value = ParamValue::Literal(literal);
            }
        }
        Ok(())
    }

    /// Ids selected by queued filters when no explicit target was given.
    pub(crate) async fn implicit_targets(&self, filters: &[Filter]) -> Result<Vec<String>, CoreError> {
        let ids = self.lookup_ids(filters).await?;
        debug!(menu = %self.menu.path(), ids = ids.len(), "implicit target lookup");
        Ok(ids)
    }

    /// Replace item numbers and names in a literal target with `.id`s.
    ///
    /// Item numbers index the menu in print order; names match the `name`
    /// field. Ids (`*1F`) pass through, and no lookup is made when every
    /// entry already is one.
    pub(crate) async fn concrete_ids(&self, key: &str, ids: Vec<String>) -> Result<Vec<String>, CoreError> {
        if ids.iter().all(|id| is_row_id(id)) {
            return Ok(ids);
        }
        let listed = if ids.iter().any(|id| is_item_number(id)) {
            self.lookup_ids(&[]).await?
        } else {
            Vec::new()
        };

        let mut concrete = Vec::with_capacity(ids.len());
        for id in ids {
            let found = if is_row_id(&id) {
                Some(id.clone())
            } else if is_item_number(&id) {
                id.parse::<usize>().ok().and_then(|index| listed.get(index).cloned())
            } else {
                self.lookup_ids(&[Filter::eq("name", id.as_str())])
                    .await?
                    .into_iter()
                    .next()
            };
            match found {
                Some(found) => concrete.push(found),
                None => return Err(self.not_found(key, &id)),
            }
        }
        debug!(menu = %self.menu.path(), key, ids = concrete.len(), "resolved literal target");
        Ok(concrete)
    }

    /// Id of the row currently following `anchor`; `None` when the anchor
    /// is the last row. An anchor missing from the menu is an error.
    pub(crate) async fn row_after(&self, anchor: &str) -> Result<Option<String>, CoreError> {
        let ids = self.lookup_ids(&[]).await?;
        let index = split_ids(anchor).first().and_then(|first| {
            if is_item_number(first) {
                first.parse::<usize>().ok().filter(|index| *index < ids.len())
            } else {
                ids.iter().position(|candidate| candidate == first)
            }
        });
        let Some(index) = index else {
            return Err(self.not_found("place-after", anchor));
        };
        Ok(ids.get(index + 1).cloned())
    }

    fn not_found(&self, key: &str, reference: &str) -> CoreError {
        CoreError::ReferenceNotFound {
            key: key.to_owned(),
            menu: self.menu.path().to_string(),
            reference: reference.to_owned(),
        }
    }
}

fn is_row_id(id: &str) -> bool {
    id.starts_with('*')
}

fn is_item_number(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_literal_targets() {
        assert!(is_row_id("*1F"));
        assert!(!is_row_id("ether1"));
        assert!(is_item_number("0"));
        assert!(is_item_number("12"));
        assert!(!is_item_number(""));
        assert!(!is_item_number("*3"));
        assert!(!is_item_number("ether1"));
    }
}
