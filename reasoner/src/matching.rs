use shared::terms::{pattern_terms, Term, TriplePattern};
use std::collections::{BTreeMap, HashSet};

/// Governs how many structural matches the store retains between two rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    /// Keep every consistent alignment, including strictly dominated ones.
    AllMatches,
    /// Keep only alignments of maximal cardinality. Several maximal
    /// alignments may survive; no further tie breaking happens.
    BiggestMatches,
}

/// A structural alignment between two pattern sets: which pattern maps to
/// which, plus one term substitution consistent over all mapped pairs.
/// Directional (source set -> target set) and invertible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Match {
    pattern_mapping: BTreeMap<TriplePattern, TriplePattern>,
    term_mapping: BTreeMap<Term, Term>,
}

impl Match {
    /// Match a single source pattern against a single target pattern.
    ///
    /// Per position: two variables align, a variable aligns with a constant
    /// (in either direction), identical constants align, different constants
    /// fail. A repeated term must map to the same counterpart everywhere,
    /// and two distinct terms may not collapse onto one counterpart (that
    /// would make the inverse ill-defined).
    pub fn between(source: &TriplePattern, target: &TriplePattern) -> Option<Match> {
        let mut m = Match::default();
        for (s, t) in pattern_terms(source).into_iter().zip(pattern_terms(target)) {
            match (s, t) {
                (Term::Constant(a), Term::Constant(b)) if a == b => {}
                (Term::Constant(_), Term::Constant(_)) => return None,
                _ => {
                    if !m.insert_term_pair(s, t) {
                        return None;
                    }
                }
            }
        }
        m.pattern_mapping.insert(source.clone(), target.clone());
        Some(m)
    }

    fn insert_term_pair(&mut self, source: &Term, target: &Term) -> bool {
        if let Some(existing) = self.term_mapping.get(source) {
            return existing == target;
        }
        if self.term_mapping.values().any(|t| t == target) {
            return false;
        }
        self.term_mapping.insert(source.clone(), target.clone());
        true
    }

    /// Combine two alignments into a bigger one. Fails when they map the
    /// same source or target pattern, or when their substitutions disagree.
    pub fn merge_with(&self, other: &Match) -> Option<Match> {
        for (from, to) in &other.pattern_mapping {
            if self.pattern_mapping.contains_key(from) {
                return None;
            }
            if self.pattern_mapping.values().any(|p| p == to) {
                return None;
            }
        }
        let mut merged = self.clone();
        for (s, t) in &other.term_mapping {
            if !merged.insert_term_pair(s, t) {
                return None;
            }
        }
        merged
            .pattern_mapping
            .extend(other.pattern_mapping.clone());
        Some(merged)
    }

    pub fn invert(&self) -> Match {
        Match {
            pattern_mapping: self
                .pattern_mapping
                .iter()
                .map(|(k, v)| (v.clone(), k.clone()))
                .collect(),
            term_mapping: self
                .term_mapping
                .iter()
                .map(|(k, v)| (v.clone(), k.clone()))
                .collect(),
        }
    }

    pub fn pattern_pairs(&self) -> impl Iterator<Item = (&TriplePattern, &TriplePattern)> {
        self.pattern_mapping.iter()
    }

    pub fn len(&self) -> usize {
        self.pattern_mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_mapping.is_empty()
    }

    /// True when every pattern of the given source side is matched.
    pub fn covers_source(&self, patterns: &[TriplePattern]) -> bool {
        patterns.iter().all(|p| self.pattern_mapping.contains_key(p))
    }

    /// True when every pattern of the given target side is matched.
    pub fn covers_target(&self, patterns: &[TriplePattern]) -> bool {
        patterns
            .iter()
            .all(|p| self.pattern_mapping.values().any(|v| v == p))
    }
}

pub fn invert_all(matches: &[Match]) -> Vec<Match> {
    matches.iter().map(Match::invert).collect()
}

/// All consistent alignments between two pattern sets, filtered by strategy.
///
/// Starts from every single-pattern match and grows combinations until no
/// pair of them can be merged. With `BiggestMatches` only the maximal
/// cardinality survives, which still degrades to partial matches when no
/// full alignment exists.
pub fn find_matches(
    source: &[TriplePattern],
    target: &[TriplePattern],
    strategy: MatchStrategy,
) -> Vec<Match> {
    let mut singles = Vec::new();
    for s in source {
        for t in target {
            if let Some(m) = Match::between(s, t) {
                singles.push(m);
            }
        }
    }
    if singles.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<Match> = singles.iter().cloned().collect();
    let mut all: Vec<Match> = Vec::new();
    let mut frontier = singles.clone();
    while !frontier.is_empty() {
        let mut next = Vec::new();
        for m in &frontier {
            for s in &singles {
                if let Some(bigger) = m.merge_with(s) {
                    if seen.insert(bigger.clone()) {
                        next.push(bigger);
                    }
                }
            }
        }
        all.append(&mut frontier);
        frontier = next;
    }

    match strategy {
        MatchStrategy::AllMatches => all,
        MatchStrategy::BiggestMatches => {
            let biggest = all.iter().map(Match::len).max().unwrap_or(0);
            all.retain(|m| m.len() == biggest);
            all
        }
    }
}
