use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Split `family:name`. Anything without exactly one `:` or with an empty
/// side is malformed.
pub(crate) fn split_pattern(value: &str) -> Option<(&str, &str)> {
    let (family, name) = value.split_once(':')?;
    if family.is_empty() || name.is_empty() || name.contains(':') {
        return None;
    }
    Some((family, name))
}

/// Does `pattern` (`family:name` or `family:*`) match the concrete `value`?
///
/// Families must be equal; names must be equal or the pattern name is `*`.
/// Malformed input on either side never matches.
pub fn matches_pattern(pattern: &str, value: &str) -> bool {
    match (split_pattern(pattern), split_pattern(value)) {
        (Some((p_family, p_name)), Some((v_family, v_name))) => {
            p_family == v_family && (p_name == "*" || p_name == v_name)
        }
        _ => false,
    }
}

/// Permission string, `family:action` or `family:*` (e.g. `"doc:read"`).
///
/// Permissions are unconditional grants. A string that is not of that shape
/// grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn family(&self) -> Option<&str> {
        split_pattern(self.as_str()).map(|(family, _)| family)
    }

    /// `true` for `family:*`.
    pub fn is_wildcard(&self) -> bool {
        matches!(split_pattern(self.as_str()), Some((_, "*")))
    }

    /// Flat check: same family and the action is named or wildcarded.
    pub fn grants(&self, family: &str, action: &str) -> bool {
        match split_pattern(self.as_str()) {
            Some((f, name)) => f == family && (name == "*" || name == action),
            None => false,
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
