use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tikly_api::RawRow;

use super::MenuPath;
use crate::convert::{self, CaseConvention};

/// One normalized row returned by the device.
///
/// Keys are in the session's case convention with the leading dot of
/// metafields removed (`.id` becomes `id`). Values are coerced: booleans,
/// numbers, or the original string. The row remembers the menu it was read
/// from so an [`Item`](crate::Item) can be built from it later. That tag is
/// not part of the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, Value>,
    #[serde(skip)]
    menu: MenuPath,
}

impl Row {
    pub fn new(menu: MenuPath) -> Self {
        Self {
            fields: IndexMap::new(),
            menu,
        }
    }

    /// Normalize one raw device row.
    pub fn from_raw(raw: &RawRow, menu: &MenuPath, case: CaseConvention) -> Self {
        let fields = raw
            .iter()
            .map(|(key, value)| {
                let key = convert::from_wire(key, case);
                let key = key.strip_prefix('.').map_or_else(|| key.clone(), str::to_owned);
                (key, convert::coerce_out(value))
            })
            .collect();
        Self {
            fields,
            menu: menu.clone(),
        }
    }

    /// The row's `.id`, e.g. `*1A`.
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.fields.get(key).and_then(Value::as_u64)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    /// Field names in device order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Menu the row was read from.
    pub fn menu(&self) -> &MenuPath {
        &self.menu
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> IndexMap<String, Value> {
        self.fields
    }

    /// The fields as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }
}
