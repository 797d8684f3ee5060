use serde_json::{Map, Value};
use tikly_api::Combinator;

use super::filter::Filter;
use super::pending::{ParamValue, PendingQuery};
use crate::convert::{self, coerce_in, wire_key};
use crate::error::CoreError;
use crate::menu::Menu;
use crate::model::Reference;

/// A query chain on one menu.
///
/// Every builder call consumes the query and returns it; every terminal
/// call (reads, mutations, `exec`, `stream`) consumes it for good. Field
/// names may be given in camelCase or snake_case and are translated to the
/// device's dashed keys.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) menu: Menu,
    pub(crate) pending: PendingQuery,
    /// First caller-input problem, reported by the terminal call.
    pub(crate) invalid: Option<String>,
}

impl Query {
    pub(crate) fn new(menu: Menu) -> Self {
        Self {
            menu,
            pending: PendingQuery::new(),
            invalid: None,
        }
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    pub fn pending(&self) -> &PendingQuery {
        &self.pending
    }

    /// The sentence `action` would send, before reference resolution.
    pub fn to_sentence(&self, action: &str) -> Vec<String> {
        self.pending.full_query(self.menu.path(), action)
    }

    // ── Projection ───────────────────────────────────────────────────

    /// Only return `fields` (`=.proplist=`).
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pending.set_proplist(fields);
        self
    }

    /// Alias of [`select`](Self::select).
    pub fn only<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select(fields)
    }

    /// Alias of [`select`](Self::select).
    pub fn proplist<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select(fields)
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// `key` equals `value`.
    pub fn filter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.pending.push_filter(eq(key, &value.into()));
        self
    }

    /// One equality filter per field of a JSON object.
    pub fn filter_all(mut self, fields: Value) -> Self {
        if let Some(fields) = self.object(fields) {
            for (key, value) in &fields {
                self.pending.push_filter(eq(key, value));
            }
        }
        self
    }

    /// Push a prebuilt filter expression. Keys must already be wire keys.
    pub fn filter_by(mut self, filter: Filter) -> Self {
        self.pending.push_filter(filter);
        self
    }

    /// OR this equality with the previous filter.
    pub fn or_filter(self, key: &str, value: impl Into<Value>) -> Self {
        self.filter(key, value).combined(Combinator::Or)
    }

    /// AND this equality with the previous filter.
    pub fn and_filter(self, key: &str, value: impl Into<Value>) -> Self {
        self.filter(key, value).combined(Combinator::And)
    }

    /// `key` does not equal `value`.
    pub fn filter_not(self, key: &str, value: impl Into<Value>) -> Self {
        self.filter(key, value).combined(Combinator::Not)
    }

    pub fn or_filter_not(self, key: &str, value: impl Into<Value>) -> Self {
        self.filter_not(key, value).combined(Combinator::Or)
    }

    pub fn and_filter_not(self, key: &str, value: impl Into<Value>) -> Self {
        self.filter_not(key, value).combined(Combinator::And)
    }

    /// `key` greater than `value`.
    pub fn filter_higher(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.pending
            .push_filter(Filter::higher(wire_key(key), coerce_in(&value.into())));
        self
    }

    /// `key` less than `value`.
    pub fn filter_lower(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.pending
            .push_filter(Filter::lower(wire_key(key), coerce_in(&value.into())));
        self
    }

    /// `key` is present with a value.
    pub fn filter_exists(mut self, key: &str) -> Self {
        self.pending.push_filter(Filter::exists(wire_key(key)));
        self
    }

    /// Alias of [`filter_exists`](Self::filter_exists).
    pub fn filter_not_empty(self, key: &str) -> Self {
        self.filter_exists(key)
    }

    /// `key` is missing or empty.
    pub fn filter_empty(mut self, key: &str) -> Self {
        self.pending.push_filter(Filter::empty(wire_key(key)));
        self
    }

    /// Alias of [`filter_empty`](Self::filter_empty).
    pub fn filter_not_exists(self, key: &str) -> Self {
        self.filter_empty(key)
    }

    /// Append pre-built words without translation.
    pub fn filter_raw<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.push_raw(words);
        self
    }

    fn combined(mut self, combinator: Combinator) -> Self {
        self.pending.combine(combinator);
        self
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// `=key=value` attribute, e.g. `interval` for `monitor`.
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        let key = wire_key(key);
        let value = ParamValue::from_value(&key, &value.into());
        self.pending.push_param(key, value);
        self
    }

    /// One attribute per field of a JSON object.
    pub fn params(mut self, fields: Value) -> Self {
        if let Some(fields) = self.object(fields) {
            self.push_params(&fields);
        }
        self
    }

    /// Bare flags such as `count-only`, `detail` or `stats`.
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for option in options {
            self.pending
                .push_param(convert::to_wire(option.as_ref()), ParamValue::Literal(String::new()));
        }
        self
    }

    /// Rows the command acts on (`=numbers=`). Search objects are
    /// resolved before the command is sent and must match.
    pub fn target(mut self, reference: impl Into<Reference>) -> Self {
        self.pending
            .push_param("numbers", ParamValue::Reference(reference.into()));
        self
    }

    // ── Helpers ──────────────────────────────────────────────────────

    pub(crate) fn push_params(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            let key = wire_key(key);
            let value = ParamValue::from_value(&key, value);
            self.pending.push_param(key, value);
        }
    }

    /// Unwrap a JSON object, remembering a non-object for the terminal call.
    pub(crate) fn object(&mut self, value: Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(fields) => Some(fields),
            other => {
                self.invalid
                    .get_or_insert_with(|| format!("expected a JSON object, got {other}"));
                None
            }
        }
    }

    pub(crate) fn check(&mut self) -> Result<(), CoreError> {
        match self.invalid.take() {
            Some(message) => Err(CoreError::InvalidData { message }),
            None => Ok(()),
        }
    }
}

fn eq(key: &str, value: &Value) -> Filter {
    Filter::eq(wire_key(key), coerce_in(value))
}
