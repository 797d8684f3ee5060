//! Sentence vocabulary shared by transports and the query layer.
//!
//! A RouterOS API sentence is an ordered list of words. The first word is the
//! command (`/ip/address/print`); the rest are attributes (`=key=value`),
//! query words (`?key=value`, `?#|`, ...) or API attributes (`.tag=7`).
//! [`Word::parse`] classifies a single word without allocating.

use indexmap::IndexMap;

/// One reply row as the device sent it: dashed keys, string values, device order.
pub type RawRow = IndexMap<String, String>;

/// Logical operator word (`?#|`, `?#&`, `?#!`) applied to the query stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// `?#|`: pop two values, push their disjunction.
    Or,
    /// `?#&`: pop two values, push their conjunction.
    And,
    /// `?#!`: replace the top value with its negation.
    Not,
}

impl Combinator {
    /// The full query word, including the `?#` prefix.
    pub fn word(self) -> &'static str {
        match self {
            Self::Or => "?#|",
            Self::And => "?#&",
            Self::Not => "?#!",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c {
            '|' => Some(Self::Or),
            '&' => Some(Self::And),
            '!' => Some(Self::Not),
            _ => None,
        }
    }
}

/// A classified `?` query word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryWord<'a> {
    /// `?key=value`
    Equals { key: &'a str, value: &'a str },
    /// `?>key=value`
    Greater { key: &'a str, value: &'a str },
    /// `?<key=value`
    Less { key: &'a str, value: &'a str },
    /// `?key`
    Has { key: &'a str },
    /// `?-key`
    Lacks { key: &'a str },
    /// `?#...`: one or more operators, applied left to right.
    Operators(Vec<Combinator>),
}

/// A single classified sentence word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Word<'a> {
    /// Command path, e.g. `/ip/firewall/filter/add`.
    Command(&'a str),
    /// `=key=value` attribute.
    Attribute { key: &'a str, value: &'a str },
    /// `?...` query word.
    Query(QueryWord<'a>),
    /// `.key=value` API attribute (`.tag`, `.proplist` when sent bare).
    ApiAttribute { key: &'a str, value: &'a str },
    /// Anything else; transports decide whether to reject it.
    Other(&'a str),
}

impl<'a> Word<'a> {
    pub fn parse(word: &'a str) -> Self {
        if word.starts_with('/') {
            return Self::Command(word);
        }
        if let Some(rest) = word.strip_prefix('=') {
            let (key, value) = split_pair(rest);
            return Self::Attribute { key, value };
        }
        if let Some(rest) = word.strip_prefix('?') {
            return Self::Query(parse_query(rest));
        }
        if word.starts_with('.') {
            let (key, value) = split_pair(word);
            return Self::ApiAttribute { key, value };
        }
        Self::Other(word)
    }

    /// The attribute value for `key`, if this word is `=key=value`.
    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        match *self {
            Self::Attribute { key: k, value } if k == key => Some(value),
            _ => None,
        }
    }
}

fn split_pair(raw: &str) -> (&str, &str) {
    raw.split_once('=').unwrap_or((raw, ""))
}

fn parse_query(rest: &str) -> QueryWord<'_> {
    if let Some(ops) = rest.strip_prefix('#') {
        return QueryWord::Operators(ops.chars().filter_map(Combinator::from_char).collect());
    }
    if let Some(key) = rest.strip_prefix('-') {
        return QueryWord::Lacks {
            key: split_pair(key).0,
        };
    }
    if let Some(pair) = rest.strip_prefix('>') {
        let (key, value) = split_pair(pair);
        return QueryWord::Greater { key, value };
    }
    if let Some(pair) = rest.strip_prefix('<') {
        let (key, value) = split_pair(pair);
        return QueryWord::Less { key, value };
    }
    match rest.split_once('=') {
        Some((key, value)) => QueryWord::Equals { key, value },
        None => QueryWord::Has { key: rest },
    }
}
