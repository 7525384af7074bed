use std::fmt::Display;

use super::ALL;

/// Represents namespace scope of a watch.\
/// **Note** that it treats string `all` (and an empty string) as a special case: all namespaces.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceScope {
    value: Option<String>,
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_all() {
            write!(f, "/ALL/")
        } else {
            write!(f, "'{}'", self.as_str())
        }
    }
}

impl NamespaceScope {
    /// Creates new [`NamespaceScope`] instance that represents all namespaces.
    pub fn all() -> Self {
        Self { value: None }
    }

    /// Creates new [`NamespaceScope`] instance for a single namespace.
    pub fn named(namespace: impl Into<String>) -> Self {
        namespace.into().into()
    }

    /// Extracts a string slice containing the entire [`NamespaceScope`].
    #[inline]
    pub fn as_str(&self) -> &str {
        match &self.value {
            Some(value) => value.as_str(),
            None => ALL,
        }
    }

    /// Provides a [`NamespaceScope`] as an option, `None` means all namespaces.
    #[inline]
    pub fn as_option(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns `true` if the [`NamespaceScope`] instance represents all namespaces.
    #[inline]
    pub const fn is_all(&self) -> bool {
        self.value.is_none()
    }
}

impl From<String> for NamespaceScope {
    fn from(value: String) -> Self {
        if value.is_empty() || value == ALL {
            Self { value: None }
        } else {
            Self { value: Some(value) }
        }
    }
}

impl From<&str> for NamespaceScope {
    fn from(value: &str) -> Self {
        if value.is_empty() || value == ALL {
            Self { value: None }
        } else {
            Self {
                value: Some(value.to_owned()),
            }
        }
    }
}

impl From<Option<&str>> for NamespaceScope {
    fn from(value: Option<&str>) -> Self {
        value.map_or_else(Self::all, Self::from)
    }
}
