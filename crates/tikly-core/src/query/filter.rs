use std::ops::Not;

use tikly_api::Combinator;

/// Comparison applied to a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `?key=value`
    Equals,
    /// `?>key=value`; with an empty value, "has a value".
    Greater,
    /// `?<key=value`
    Less,
    /// `?-key`: field missing or empty.
    Absent,
}

/// Filter expression evaluated by the device.
///
/// Built as a tree and only flattened into postfix query words (`?#|`,
/// `?#&`, `?#!`) when the sentence is assembled. Keys are wire keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        op: Comparison,
        key: String,
        value: String,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
    Not(Box<Filter>),
    /// Pre-built words appended untouched.
    Raw(Vec<String>),
}

impl Filter {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(Comparison::Equals, key, value)
    }

    pub fn higher(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(Comparison::Greater, key, value)
    }

    pub fn lower(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(Comparison::Less, key, value)
    }

    /// Field has a non-empty value.
    pub fn exists(key: impl Into<String>) -> Self {
        Self::compare(Comparison::Greater, key, "")
    }

    /// Field is missing or empty.
    pub fn empty(key: impl Into<String>) -> Self {
        Self::compare(Comparison::Absent, key, "")
    }

    pub fn raw<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Raw(words.into_iter().map(Into::into).collect())
    }

    fn compare(op: Comparison, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Compare {
            op,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn and(self, other: Filter) -> Self {
        Self::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Self::Or(Box::new(self), Box::new(other))
    }

    /// `.id` equal to any of `ids`. `None` when `ids` is empty.
    pub fn any_id(ids: &[String]) -> Option<Self> {
        ids.iter()
            .map(|id| Self::eq(".id", id.as_str()))
            .reduce(Self::or)
    }

    /// Append this expression's query words in postfix order.
    pub fn write_words(&self, out: &mut Vec<String>) {
        match self {
            Self::Compare { op, key, value } => out.push(match op {
                Comparison::Equals => format!("?{key}={value}"),
                Comparison::Greater => format!("?>{key}={value}"),
                Comparison::Less => format!("?<{key}={value}"),
                Comparison::Absent => format!("?-{key}"),
            }),
            Self::And(left, right) => {
                left.write_words(out);
                right.write_words(out);
                out.push(Combinator::And.word().to_owned());
            }
            Self::Or(left, right) => {
                left.write_words(out);
                right.write_words(out);
                out.push(Combinator::Or.word().to_owned());
            }
            Self::Not(inner) => {
                inner.write_words(out);
                out.push(Combinator::Not.word().to_owned());
            }
            Self::Raw(words) => out.extend(words.iter().cloned()),
        }
    }

    pub fn to_words(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.write_words(&mut out);
        out
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Self::Output {
        Filter::Not(Box::new(self))
    }
}
