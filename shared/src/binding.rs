/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// One solution row: variable name -> dictionary-encoded constant.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding {
    map: BTreeMap<String, u32>,
}

impl Binding {
    pub fn new() -> Self {
        Binding {
            map: BTreeMap::new(),
        }
    }

    pub fn put(&mut self, variable: &str, value: u32) {
        self.map.insert(variable.to_string(), value);
    }

    pub fn get(&self, variable: &str) -> Option<u32> {
        self.map.get(variable).copied()
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.map.contains_key(variable)
    }

    pub fn remove(&mut self, variable: &str) -> Option<u32> {
        self.map.remove(variable)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Two bindings are compatible when they agree on every shared variable.
    /// The empty binding is compatible with everything.
    pub fn is_compatible(&self, other: &Binding) -> bool {
        self.iter()
            .all(|(var, value)| other.get(var).map_or(true, |v| v == value))
    }

    pub fn is_conflicting(&self, other: &Binding) -> bool {
        !self.is_compatible(other)
    }

    /// Union of two compatible bindings. On a shared variable the value of
    /// `self` wins, which is only observable for conflicting inputs.
    pub fn merged(&self, other: &Binding) -> Binding {
        let mut map = other.map.clone();
        for (k, v) in &self.map {
            map.insert(k.clone(), *v);
        }
        Binding { map }
    }
}

impl FromIterator<(String, u32)> for Binding {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Binding {
            map: iter.into_iter().collect(),
        }
    }
}

/// An unordered, duplicate-free collection of bindings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSet {
    bindings: HashSet<Binding>,
}

impl BindingSet {
    pub fn new() -> Self {
        BindingSet {
            bindings: HashSet::new(),
        }
    }

    pub fn add(&mut self, binding: Binding) {
        self.bindings.insert(binding);
    }

    pub fn add_all<I: IntoIterator<Item = Binding>>(&mut self, bindings: I) {
        self.bindings.extend(bindings);
    }

    pub fn contains(&self, binding: &Binding) -> bool {
        self.bindings.contains(binding)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// True when the set carries no information at all: either no bindings,
    /// or nothing but empty bindings (the "no constraints" form).
    pub fn is_structurally_empty(&self) -> bool {
        self.bindings.iter().all(|b| b.is_empty())
    }
}

impl FromIterator<Binding> for BindingSet {
    fn from_iter<I: IntoIterator<Item = Binding>>(iter: I) -> Self {
        BindingSet {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a BindingSet {
    type Item = &'a Binding;
    type IntoIter = std::collections::hash_set::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(pairs: &[(&str, u32)]) -> Binding {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_compatibility() {
        let a = binding(&[("x", 1), ("y", 2)]);
        let b = binding(&[("y", 2), ("z", 3)]);
        let c = binding(&[("y", 9)]);
        assert!(a.is_compatible(&b));
        assert!(a.is_conflicting(&c));
        assert!(Binding::new().is_compatible(&a));
        assert!(Binding::new().is_compatible(&c));
    }

    #[test]
    fn test_merged_unions_disjoint_keys() {
        let a = binding(&[("x", 1)]);
        let b = binding(&[("y", 2)]);
        assert_eq!(a.merged(&b), binding(&[("x", 1), ("y", 2)]));
    }

    #[test]
    fn test_binding_set_collapses_duplicates() {
        let mut bs = BindingSet::new();
        bs.add(binding(&[("x", 1)]));
        bs.add(binding(&[("x", 1)]));
        assert_eq!(bs.len(), 1);
        assert!(!bs.is_structurally_empty());

        let mut empty_row = BindingSet::new();
        empty_row.add(Binding::new());
        assert!(empty_row.is_structurally_empty());
        assert!(BindingSet::new().is_structurally_empty());
    }

    #[test]
    fn test_binding_set_json_round_trip() {
        let mut bs = BindingSet::new();
        bs.add(binding(&[("id", 4), ("name", 5)]));
        bs.add(binding(&[("id", 6)]));

        let json = serde_json::to_string(&bs).unwrap();
        let back: BindingSet = serde_json::from_str(&json).unwrap();
        assert_eq!(bs, back);
    }
}
