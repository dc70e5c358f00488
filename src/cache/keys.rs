//! Query key definitions.
//!
//! A `QueryKey` names a cached resource or collection as an ordered sequence of
//! primitive tokens. Keys nest: `["documents"]` is a prefix of
//! `["documents", 7]` and therefore a broader invalidation scope.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One primitive component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyToken {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<&str> for KeyToken {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyToken {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for KeyToken {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

impl From<i64> for KeyToken {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for KeyToken {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for KeyToken {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<bool> for KeyToken {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
        }
    }
}

/// Structured, immutable identifier of a cache entry.
///
/// Equality is element-wise; cloning shares the token slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Arc<[KeyToken]>);

impl QueryKey {
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<KeyToken>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    pub fn from_tokens(tokens: Vec<KeyToken>) -> Self {
        Self(tokens.into())
    }

    pub fn tokens(&self) -> &[KeyToken] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return a narrower key with `token` appended.
    pub fn child(&self, token: impl Into<KeyToken>) -> Self {
        let mut tokens = self.0.to_vec();
        tokens.push(token.into());
        Self::from_tokens(tokens)
    }

    /// True when `prefix` equals this key or is a leading subsequence of it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (idx, token) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{token}")?;
        }
        f.write_str("]")
    }
}

impl Serialize for QueryKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for QueryKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<KeyToken>::deserialize(deserializer).map(Self::from_tokens)
    }
}

/// Build a [`QueryKey`] from heterogeneous literals.
///
/// ```
/// use careboard::query_key;
/// let key = query_key!["document", 42];
/// assert_eq!(key.to_string(), r#"["document",42]"#);
/// ```
#[macro_export]
macro_rules! query_key {
    ($($token:expr),* $(,)?) => {
        $crate::cache::QueryKey::from_tokens(vec![$($crate::cache::KeyToken::from($token)),*])
    };
}
