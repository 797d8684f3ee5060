use std::fmt;

use serde::{Deserialize, Serialize};

/// Action verbs stripped from the end of a menu path.
const ACTION_VERBS: &[&str] = &[
    "print", "enable", "disable", "add", "set", "remove", "getall", "move",
];

/// Normalized, slash-separated command namespace such as `/ip/firewall/filter`.
///
/// Accepts space or slash delimited input and drops a trailing action verb,
/// so `"ip address print"`, `"/ip/address/"` and `"/ip/address"` are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MenuPath(String);

impl MenuPath {
    pub fn new(raw: &str) -> Self {
        let mut segments: Vec<&str> = raw
            .split(|c: char| c == '/' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        if segments
            .last()
            .is_some_and(|last| ACTION_VERBS.contains(last))
        {
            segments.pop();
        }
        Self(format!("/{}", segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full command word for `action`, e.g. `/ip/address/print`.
    pub fn command(&self, action: &str) -> String {
        let action = action.trim_start_matches('/');
        if action.is_empty() {
            self.0.clone()
        } else if self.0 == "/" {
            format!("/{action}")
        } else {
            format!("{}/{action}", self.0)
        }
    }
}

impl fmt::Display for MenuPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MenuPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for MenuPath {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<MenuPath> for String {
    fn from(path: MenuPath) -> Self {
        path.0
    }
}
