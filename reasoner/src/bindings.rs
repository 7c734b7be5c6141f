//! Binding sets scoped to a graph pattern, keyed by (pattern, variable)
//! instead of bare variable names. The scoping is what keeps identical
//! variable names of unrelated rules apart while plans are composed;
//! `translate` is the only way bindings cross a rule boundary.

use crate::errors::ReasonerError;
use crate::matching::Match;
use shared::binding::{Binding, BindingSet};
use shared::terms::{format_patterns, pattern_terms, pattern_variables, Term, TriplePattern};
use std::collections::{BTreeMap, HashSet};

/// A variable scoped to one occurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripleVar {
    pub pattern: TriplePattern,
    pub variable: String,
}

impl TripleVar {
    pub fn new(pattern: &TriplePattern, variable: &str) -> Self {
        TripleVar {
            pattern: pattern.clone(),
            variable: variable.to_string(),
        }
    }
}

/// One row of a [`TripleVarBindingSet`]: (pattern, variable) -> constant.
///
/// Overlap and conflict are judged by variable *name*: two entries with the
/// same name must agree, whichever pattern they belong to.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TripleVarBinding {
    entries: BTreeMap<TripleVar, u32>,
}

impl TripleVarBinding {
    pub fn new() -> Self {
        TripleVarBinding::default()
    }

    pub fn put(&mut self, var: TripleVar, value: u32) {
        self.entries.insert(var, value);
    }

    pub fn get(&self, var: &TripleVar) -> Option<u32> {
        self.entries.get(var).copied()
    }

    /// First value bound under the given variable name, in any pattern.
    pub fn value_of(&self, variable: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(tv, _)| tv.variable == variable)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, var: &TripleVar) -> bool {
        self.entries.contains_key(var)
    }

    pub fn contains_pattern(&self, pattern: &TriplePattern) -> bool {
        self.entries.keys().any(|tv| &tv.pattern == pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_overlapping(&self, other: &TripleVarBinding) -> bool {
        self.entries
            .keys()
            .any(|tv| other.value_of(&tv.variable).is_some())
    }

    pub fn is_conflicting(&self, other: &TripleVarBinding) -> bool {
        self.entries.iter().any(|(tv, value)| {
            other
                .value_of(&tv.variable)
                .map_or(false, |v| v != *value)
        })
    }

    /// Union of two rows; entries of `self` win on a shared key.
    pub fn merged(&self, other: &TripleVarBinding) -> TripleVarBinding {
        let mut entries = other.entries.clone();
        for (k, v) in &self.entries {
            entries.insert(k.clone(), *v);
        }
        TripleVarBinding { entries }
    }

    /// Collapse to a name-keyed binding, dropping the pattern scope.
    pub fn to_binding(&self) -> Binding {
        let mut b = Binding::new();
        for (tv, value) in &self.entries {
            b.put(&tv.variable, *value);
        }
        b
    }
}

/// A set of pattern-scoped rows over one graph pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleVarBindingSet {
    graph_pattern: Vec<TriplePattern>,
    bindings: HashSet<TripleVarBinding>,
}

impl TripleVarBindingSet {
    pub fn new(graph_pattern: Vec<TriplePattern>) -> Self {
        TripleVarBindingSet {
            graph_pattern,
            bindings: HashSet::new(),
        }
    }

    /// Scope a name-keyed binding set onto a graph pattern: every binding
    /// becomes a row with an entry for each (pattern, variable) it binds.
    pub fn from_binding_set(bs: &BindingSet, graph_pattern: &[TriplePattern]) -> Self {
        let mut result = TripleVarBindingSet::new(graph_pattern.to_vec());
        for binding in bs {
            let mut tvb = TripleVarBinding::new();
            for pattern in graph_pattern {
                for var in pattern_variables(pattern) {
                    if let Some(value) = binding.get(var) {
                        tvb.put(TripleVar::new(pattern, var), value);
                    }
                }
            }
            result.add(tvb);
        }
        result
    }

    pub fn to_binding_set(&self) -> BindingSet {
        self.bindings.iter().map(TripleVarBinding::to_binding).collect()
    }

    pub fn graph_pattern(&self) -> &[TriplePattern] {
        &self.graph_pattern
    }

    pub fn add(&mut self, binding: TripleVarBinding) {
        self.bindings.insert(binding);
    }

    pub fn bindings(&self) -> impl Iterator<Item = &TripleVarBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Every (pattern, variable) of the owning graph pattern.
    pub fn triple_vars(&self) -> Vec<TripleVar> {
        let mut vars = Vec::new();
        for pattern in &self.graph_pattern {
            for name in pattern_variables(pattern) {
                let tv = TripleVar::new(pattern, name);
                if !vars.contains(&tv) {
                    vars.push(tv);
                }
            }
        }
        vars
    }

    /// Union of both operands plus the union of every non-conflicting pair
    /// of rows. This realizes the join without discarding unjoined rows;
    /// duplicates collapse by value equality, so re-merging an already
    /// merged set does not grow it with copies.
    pub fn merge(&self, other: &TripleVarBindingSet) -> Result<TripleVarBindingSet, ReasonerError> {
        if self.graph_pattern != other.graph_pattern {
            return Err(ReasonerError::ScopeMismatch {
                left: format_patterns(&self.graph_pattern),
                right: format_patterns(&other.graph_pattern),
            });
        }
        let mut result = TripleVarBindingSet::new(self.graph_pattern.clone());
        if self.bindings.is_empty() {
            result.bindings = other.bindings.clone();
        } else {
            for a in &self.bindings {
                result.add(a.clone());
                for b in &other.bindings {
                    result.add(b.clone());
                    if !a.is_conflicting(b) {
                        result.add(a.merged(b));
                    }
                }
            }
        }
        Ok(result)
    }

    /// Keep the rows that agree with at least one row of `other` on shared
    /// variable names. An empty `other` constrains nothing.
    pub fn keep_compatible(&self, other: &TripleVarBindingSet) -> TripleVarBindingSet {
        let mut result = TripleVarBindingSet::new(self.graph_pattern.clone());
        if other.bindings.is_empty() {
            result.bindings = self.bindings.clone();
            return result;
        }
        for b in &self.bindings {
            if other.bindings.iter().any(|o| !b.is_conflicting(o)) {
                result.add(b.clone());
            }
        }
        result
    }

    /// Rows that bind every variable of the owning graph pattern.
    pub fn full_bindings(&self) -> TripleVarBindingSet {
        let vars = self.triple_vars();
        let mut result = TripleVarBindingSet::new(self.graph_pattern.clone());
        for b in &self.bindings {
            if vars.iter().all(|tv| b.contains(tv)) {
                result.add(b.clone());
            }
        }
        result
    }

    /// Complement of [`full_bindings`]: rows leaving some variable unbound.
    pub fn partial_bindings(&self) -> TripleVarBindingSet {
        let vars = self.triple_vars();
        let mut result = TripleVarBindingSet::new(self.graph_pattern.clone());
        for b in &self.bindings {
            if !vars.iter().all(|tv| b.contains(tv)) {
                result.add(b.clone());
            }
        }
        result
    }

    /// Re-express this set in the scope of `target` using the substitution
    /// of the given matches.
    ///
    /// A mapping entry applies to a row only when the row touches the mapped
    /// source pattern. A row whose mapped variable is unbound, or is bound
    /// to a constant that contradicts the match, cannot be expressed in the
    /// target scope and is dropped. When the source set is empty, each match
    /// synthesizes one row carrying only the constants the match itself
    /// implies.
    pub fn translate(
        &self,
        target: &[TriplePattern],
        matches: &[Match],
    ) -> Result<TripleVarBindingSet, ReasonerError> {
        for m in matches {
            for (from, to) in m.pattern_pairs() {
                if !self.graph_pattern.contains(from) {
                    return Err(ReasonerError::PatternOutOfScope {
                        pattern: shared::terms::format_pattern(from),
                        scope: format_patterns(&self.graph_pattern),
                    });
                }
                if !target.contains(to) {
                    return Err(ReasonerError::PatternOutOfScope {
                        pattern: shared::terms::format_pattern(to),
                        scope: format_patterns(target),
                    });
                }
            }
        }

        let mut result = TripleVarBindingSet::new(target.to_vec());
        if self.bindings.is_empty() {
            // No rows to carry over: the match itself may still imply
            // constants for target variables.
            for m in matches {
                let mut tvb = TripleVarBinding::new();
                for (from, to) in m.pattern_pairs() {
                    for (f, t) in pattern_terms(from).into_iter().zip(pattern_terms(to)) {
                        if let (Term::Constant(c), Term::Variable(v)) = (f, t) {
                            tvb.put(TripleVar::new(to, v), *c);
                        }
                    }
                }
                result.add(tvb);
            }
            return Ok(result);
        }

        'rows: for b in &self.bindings {
            let mut tvb = TripleVarBinding::new();
            for m in matches {
                for (from, to) in m.pattern_pairs() {
                    if !b.contains_pattern(from) {
                        continue;
                    }
                    for (f, t) in pattern_terms(from).into_iter().zip(pattern_terms(to)) {
                        match (f, t) {
                            (Term::Constant(c), Term::Variable(v)) => {
                                tvb.put(TripleVar::new(to, v), *c);
                            }
                            (Term::Variable(fv), Term::Variable(tv)) => {
                                match b.get(&TripleVar::new(from, fv)) {
                                    Some(value) => tvb.put(TripleVar::new(to, tv), value),
                                    None => continue 'rows,
                                }
                            }
                            (Term::Variable(fv), Term::Constant(c)) => {
                                // the target position is fixed; the row must
                                // already agree with it, nothing is carried
                                if b.get(&TripleVar::new(from, fv)) != Some(*c) {
                                    continue 'rows;
                                }
                            }
                            (Term::Constant(_), Term::Constant(_)) => {}
                        }
                    }
                }
            }
            result.add(tvb);
        }
        Ok(result)
    }
}
