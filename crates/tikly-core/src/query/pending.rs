use serde_json::Value;
use tikly_api::{Combinator, Word};

use super::filter::Filter;
use crate::convert;
use crate::model::{MenuPath, Reference};

/// Wire keys whose values name rows and may need resolving.
pub const REFERENCE_KEYS: &[&str] = &[".id", "numbers", "place-before", "place-after", "destination"];

/// Keys that select the rows a command acts on.
pub const TARGET_KEYS: &[&str] = &["numbers", ".id"];

pub fn is_reference_key(key: &str) -> bool {
    REFERENCE_KEYS.contains(&key)
}

/// Value of an `=key=value` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Literal(String),
    Reference(Reference),
}

impl ParamValue {
    /// Classify a caller value for wire key `key`.
    pub fn from_value(key: &str, value: &Value) -> Self {
        if is_reference_key(key) {
            Self::Reference(Reference::from(value.clone()))
        } else {
            Self::Literal(convert::coerce_in(value))
        }
    }

    /// Wire text. Unresolved search objects render as JSON.
    pub fn render(&self) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Reference(reference) => reference.to_string(),
        }
    }

    pub fn needs_lookup(&self) -> bool {
        matches!(self, Self::Reference(r) if r.is_search())
    }
}

/// One `=key=value` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub key: String,
    pub value: ParamValue,
}

/// Accumulated state of one query chain.
///
/// Filters form a stack: combinators pop their operands from the top, the
/// same way the device evaluates the postfix words they serialize to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingQuery {
    proplist: Option<Vec<String>>,
    filters: Vec<Filter>,
    params: Vec<Param>,
}

impl PendingQuery {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Projection ───────────────────────────────────────────────────

    /// Restrict returned fields. Metafield short names become dotted.
    pub fn set_proplist<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.proplist = Some(
            fields
                .into_iter()
                .map(|f| convert::wire_key(f.as_ref()))
                .collect(),
        );
    }

    pub fn proplist(&self) -> Option<&[String]> {
        self.proplist.as_deref()
    }

    // ── Filters ──────────────────────────────────────────────────────

    pub fn push_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    /// Combine the two newest filters. With fewer than two, the bare
    /// combinator word is queued instead and the device decides.
    pub fn combine(&mut self, combinator: Combinator) {
        let join: fn(Filter, Filter) -> Filter = match combinator {
            Combinator::Not => {
                self.negate_last();
                return;
            }
            Combinator::And => Filter::and,
            Combinator::Or => Filter::or,
        };
        if self.filters.len() < 2 {
            self.filters.push(Filter::raw([combinator.word()]));
            return;
        }
        let (Some(right), Some(left)) = (self.filters.pop(), self.filters.pop()) else {
            return;
        };
        self.filters.push(join(left, right));
    }

    /// Negate the newest filter.
    pub fn negate_last(&mut self) {
        match self.filters.pop() {
            Some(last) => self.filters.push(!last),
            None => self.filters.push(Filter::raw([Combinator::Not.word()])),
        }
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    pub fn take_filters(&mut self) -> Vec<Filter> {
        std::mem::take(&mut self.filters)
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// Queue `=key=value`. `key` is already a wire key.
    pub fn push_param(&mut self, key: impl Into<String>, value: ParamValue) {
        self.params.push(Param {
            key: key.into(),
            value,
        });
    }

    /// Replace every `key` attribute with a single one.
    pub fn set_param(&mut self, key: &str, value: ParamValue) {
        self.params.retain(|p| p.key != key);
        self.push_param(key, value);
    }

    /// Remove and return the last `key` attribute.
    pub fn take_param(&mut self, key: &str) -> Option<ParamValue> {
        let index = self.params.iter().rposition(|p| p.key == key)?;
        let value = self.params.remove(index).value;
        self.params.retain(|p| p.key != key);
        Some(value)
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut [Param] {
        &mut self.params
    }

    /// The last explicit `numbers` or `.id` target.
    pub fn explicit_target(&self) -> Option<&ParamValue> {
        self.params
            .iter()
            .rev()
            .find(|p| TARGET_KEYS.contains(&p.key.as_str()))
            .map(|p| &p.value)
    }

    pub fn target_param_mut(&mut self) -> Option<&mut Param> {
        self.params
            .iter_mut()
            .rev()
            .find(|p| TARGET_KEYS.contains(&p.key.as_str()))
    }

    /// Literal ids of the explicit target, once resolved.
    pub fn target_ids(&self) -> Option<Vec<String>> {
        match self.explicit_target()? {
            ParamValue::Literal(text) => Some(split_ids(text)),
            ParamValue::Reference(reference) => reference.literal().map(|text| split_ids(&text)),
        }
    }

    /// Queue pre-built words. Attributes become parameters, anything else
    /// is kept verbatim in the filter stack.
    pub fn push_raw<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut verbatim = Vec::new();
        for word in words {
            let word = word.into();
            let attribute = match Word::parse(&word) {
                Word::Attribute { key, value } => Some((key.to_owned(), value.to_owned())),
                _ => None,
            };
            match attribute {
                Some((key, value)) => {
                    let value = if is_reference_key(&key) {
                        // Search objects may arrive pre-encoded as JSON.
                        let reference = match serde_json::from_str::<Value>(&value) {
                            Ok(object @ Value::Object(_)) => Reference::from(object),
                            _ => Reference::from(value),
                        };
                        ParamValue::Reference(reference)
                    } else {
                        ParamValue::Literal(value)
                    };
                    self.push_param(key, value);
                }
                None => verbatim.push(word),
            }
        }
        if !verbatim.is_empty() {
            self.filters.push(Filter::Raw(verbatim));
        }
    }

    // ── Assembly ─────────────────────────────────────────────────────

    /// Filter words in postfix order.
    pub fn filter_words(&self) -> Vec<String> {
        let mut out = Vec::new();
        for filter in &self.filters {
            filter.write_words(&mut out);
        }
        out
    }

    /// The complete sentence for `action` on `menu`.
    ///
    /// Layout is command, `=.proplist=`, attributes, filters. Outside of
    /// `print`/`getall` the device only understands attributes, so `?` words
    /// are rewritten to `=`.
    pub fn full_query(&self, menu: &MenuPath, action: &str) -> Vec<String> {
        let command = menu.command(action);
        let read = is_read_command(&command);
        let mut sentence = vec![command];
        if let Some(fields) = &self.proplist {
            sentence.push(format!("=.proplist={}", fields.join(",")));
        }
        sentence.extend(
            self.params
                .iter()
                .map(|p| format!("={}={}", p.key, p.value.render())),
        );
        for word in self.filter_words() {
            match word.strip_prefix('?') {
                Some(rest) if !read => sentence.push(format!("={rest}")),
                _ => sentence.push(word),
            }
        }
        sentence
    }
}

/// `print` and `getall` accept `?` query words.
pub fn is_read_command(command: &str) -> bool {
    command.ends_with("print") || command.ends_with("getall")
}

pub(crate) fn split_ids(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
