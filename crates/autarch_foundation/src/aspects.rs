//! Weighted tags ("aspects") carried by entities and aggregated over stations.
//!
//! A thin wrapper around `im::OrdMap`, so cloning is O(1) and iteration is
//! always in name order.

use std::fmt;
use std::iter::FromIterator;

/// A persistent map of aspect name to non-negative degree.
///
/// Zero degrees are never stored: setting an aspect to zero removes it.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Aspects(im::OrdMap<String, u32>);

impl Aspects {
    /// Creates an empty aspect set.
    #[must_use]
    pub fn new() -> Self {
        Self(im::OrdMap::new())
    }

    /// Returns the degree of an aspect, zero if absent.
    #[must_use]
    pub fn degree(&self, name: &str) -> u32 {
        self.0.get(name).copied().unwrap_or(0)
    }

    /// Returns true if the aspect is present with a non-zero degree.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns a new set with the aspect set to the given degree.
    #[must_use]
    pub fn with(&self, name: impl Into<String>, degree: u32) -> Self {
        let mut next = self.0.clone();
        let name = name.into();
        if degree == 0 {
            next.remove(&name);
        } else {
            next.insert(name, degree);
        }
        Self(next)
    }

    /// Sum of every degree.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.0.values().map(|d| u64::from(*d)).sum()
    }

    /// Sum of the degrees of the given aspects only.
    #[must_use]
    pub fn weight_of<'a, I>(&self, names: I) -> u64
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().map(|n| u64::from(self.degree(n))).sum()
    }

    /// Returns a new set whose degrees are the sum of both sets.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let merged = self
            .0
            .clone()
            .union_with(other.0.clone(), |a, b| a.saturating_add(b));
        Self(merged)
    }

    /// Number of distinct aspects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no aspects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, degree)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for Aspects {
    fn from_iter<T: IntoIterator<Item = (S, u32)>>(iter: T) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .filter(|(_, v)| *v > 0)
            .collect();
        Self(map)
    }
}

impl fmt::Debug for Aspects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for Aspects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{k}:{v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
