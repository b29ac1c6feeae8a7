//! Scope sets.
//!
//! A scope travels on the wire as a space-delimited string and is stored as an
//! ordered list of distinct scope tokens. Order follows first appearance so a
//! request for `foo bar` is answered with `foo bar`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// An ordered set of scope tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(Vec<String>);

impl Scope {
    /// Parse a space-delimited scope string.
    ///
    /// Runs of whitespace are treated as a single separator and duplicate
    /// tokens are dropped, keeping the first occurrence.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.split_whitespace().map(str::to_owned).collect()
    }

    /// Parse an optional scope parameter; absent means empty.
    #[must_use]
    pub fn parse_optional(raw: Option<&str>) -> Self {
        raw.map(Self::parse).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Tokens in `self` that are not in `other` (`self - other`).
    #[must_use]
    pub fn difference<'a>(&'a self, other: &Self) -> Vec<&'a str> {
        self.iter().filter(|t| !other.contains(t)).collect()
    }

    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.iter().all(|t| other.contains(t))
    }

    /// Space-joined wire form.
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.0.join(" ")
    }
}

impl FromIterator<String> for Scope {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut tokens: Vec<String> = Vec::new();
        for token in iter {
            if !token.is_empty() && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        Self(tokens)
    }
}

impl<'a> FromIterator<&'a str> for Scope {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_owned).collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// Deserialize a scope written as a space-delimited string (registry files).
pub fn deserialize_space_delimited<'de, D>(deserializer: D) -> Result<Scope, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(Scope::parse_optional(raw.as_deref()))
}
