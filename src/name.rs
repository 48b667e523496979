use std::ops::Deref;

use compact_str::CompactString;

/// A cheaply-cloned identifier: variable names, type names, operator labels.
///
/// Types are interned by canonical name (see [`crate::graph::types`]), so
/// `Name` needs cheap equality/hashing/cloning; `CompactString` keeps short
/// identifiers (the overwhelming majority here) inline, unallocated.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Name(CompactString);

impl Name {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self(CompactString::new(name))
    }

    #[inline]
    pub fn new_static(name: &'static str) -> Self {
        Self(CompactString::new(name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Deref for Name {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl<T> From<T> for Name
where
    T: Into<CompactString>,
{
    fn from(value: T) -> Self {
        Self(value.into())
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<Name> for str {
    fn eq(&self, other: &Name) -> bool {
        other == self
    }
}
