/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::binding::Binding;
use crate::triple::Triple;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable(String),
    Constant(u32),
}

pub type TriplePattern = (Term, Term, Term);

impl Term {
    pub fn is_var(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    pub fn var_name(&self) -> Option<&str> {
        match self {
            Term::Variable(v) => Some(v),
            Term::Constant(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "?{}", v),
            Term::Constant(c) => write!(f, "<{}>", c),
        }
    }
}

pub fn pattern_terms(pattern: &TriplePattern) -> [&Term; 3] {
    [&pattern.0, &pattern.1, &pattern.2]
}

/// All distinct variable names occurring in the pattern, in position order.
pub fn pattern_variables(pattern: &TriplePattern) -> Vec<&str> {
    let mut vars = Vec::new();
    for term in pattern_terms(pattern) {
        if let Term::Variable(v) = term {
            if !vars.contains(&v.as_str()) {
                vars.push(v.as_str());
            }
        }
    }
    vars
}

/// Replace every variable with its bound value, yielding a ground triple.
/// Returns `None` when some variable is unbound in the binding.
pub fn substitute_pattern(pattern: &TriplePattern, binding: &Binding) -> Option<Triple> {
    let resolve = |term: &Term| match term {
        Term::Variable(v) => binding.get(v),
        Term::Constant(c) => Some(*c),
    };
    Some(Triple {
        subject: resolve(&pattern.0)?,
        predicate: resolve(&pattern.1)?,
        object: resolve(&pattern.2)?,
    })
}

pub fn format_pattern(pattern: &TriplePattern) -> String {
    format!("{} {} {}", pattern.0, pattern.1, pattern.2)
}

pub fn format_patterns(patterns: &[TriplePattern]) -> String {
    patterns
        .iter()
        .map(format_pattern)
        .collect::<Vec<_>>()
        .join(" . ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::Variable(name.to_string())
    }

    #[test]
    fn test_pattern_variables_are_deduplicated() {
        let pattern = (var("x"), Term::Constant(1), var("x"));
        assert_eq!(pattern_variables(&pattern), vec!["x"]);
    }

    #[test]
    fn test_substitute_pattern() {
        let pattern = (var("s"), Term::Constant(7), var("o"));
        let mut binding = Binding::new();
        binding.put("s", 1);
        binding.put("o", 2);
        assert_eq!(
            substitute_pattern(&pattern, &binding),
            Some(Triple {
                subject: 1,
                predicate: 7,
                object: 2,
            })
        );

        binding.remove("o");
        assert_eq!(substitute_pattern(&pattern, &binding), None);
    }
}
