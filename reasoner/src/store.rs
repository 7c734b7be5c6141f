use crate::matching::{find_matches, Match, MatchStrategy};
use crate::rule::Rule;
use log::{debug, info};
use rayon::prelude::*;
use shared::terms::TriplePattern;
use std::collections::HashMap;

pub type RuleId = usize;

/// Holds every registered rule. Read-only once an episode is running;
/// mutating rules concurrently with an active plan is caller responsibility.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: Vec<Rule>,
}

impl RuleStore {
    pub fn new() -> Self {
        RuleStore { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Rule) -> RuleId {
        self.rules.push(rule);
        self.rules.len() - 1
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Matches between the consequent of one rule and the antecedent of another,
/// for one unordered rule pair. Both directions live in one entry.
#[derive(Debug, Default, Clone)]
pub struct PairMatches {
    /// lo.consequent -> hi.antecedent
    pub lo_to_hi: Vec<Match>,
    /// hi.consequent -> lo.antecedent (empty for the self pair, where both
    /// directions coincide and live in `lo_to_hi`)
    pub hi_to_lo: Vec<Match>,
}

/// The adjacency table over all rules, built in one indexing pass when a
/// plan is requested, keyed by unordered rule pair.
#[derive(Debug, Default)]
pub struct MatchIndex {
    edges: HashMap<(RuleId, RuleId), PairMatches>,
}

impl MatchIndex {
    pub fn build(rules: &[Rule], strategy: MatchStrategy) -> MatchIndex {
        // handler trait objects are not Send; the parallel pass only ever
        // touches extracted pattern lists
        let sides: Vec<(Vec<TriplePattern>, Vec<TriplePattern>)> = rules
            .iter()
            .map(|r| (r.antecedent().to_vec(), r.consequent().to_vec()))
            .collect();

        let mut pairs = Vec::new();
        for lo in 0..sides.len() {
            for hi in lo..sides.len() {
                pairs.push((lo, hi));
            }
        }

        let edges: Vec<((RuleId, RuleId), PairMatches)> = pairs
            .par_iter()
            .filter_map(|&(lo, hi)| {
                let lo_to_hi = find_matches(&sides[lo].1, &sides[hi].0, strategy);
                let hi_to_lo = if lo == hi {
                    Vec::new()
                } else {
                    find_matches(&sides[hi].1, &sides[lo].0, strategy)
                };
                if lo_to_hi.is_empty() && hi_to_lo.is_empty() {
                    None
                } else {
                    Some(((lo, hi), PairMatches { lo_to_hi, hi_to_lo }))
                }
            })
            .collect();

        if strategy == MatchStrategy::BiggestMatches {
            for ((lo, hi), pair) in &edges {
                if !pair.lo_to_hi.is_empty()
                    && !pair.lo_to_hi.iter().any(|m| m.covers_target(&sides[*hi].0))
                {
                    info!(
                        "no full match of rule {} consequent onto rule {} antecedent; \
                         continuing with {} partial match(es)",
                        lo,
                        hi,
                        pair.lo_to_hi.len()
                    );
                }
                if !pair.hi_to_lo.is_empty()
                    && !pair.hi_to_lo.iter().any(|m| m.covers_target(&sides[*lo].0))
                {
                    info!(
                        "no full match of rule {} consequent onto rule {} antecedent; \
                         continuing with {} partial match(es)",
                        hi,
                        lo,
                        pair.hi_to_lo.len()
                    );
                }
            }
        }
        debug!(
            "match index over {} rule(s): {} connected pair(s)",
            rules.len(),
            edges.len()
        );
        MatchIndex {
            edges: edges.into_iter().collect(),
        }
    }

    /// Rules whose consequent matches the antecedent of `rule`, with the
    /// matches oriented source consequent -> `rule` antecedent.
    pub fn antecedent_sources(&self, rule: RuleId) -> Vec<(RuleId, &[Match])> {
        let mut sources = Vec::new();
        for ((lo, hi), pair) in &self.edges {
            if *hi == rule && !pair.lo_to_hi.is_empty() {
                sources.push((*lo, pair.lo_to_hi.as_slice()));
            }
            if *lo == rule && lo != hi && !pair.hi_to_lo.is_empty() {
                sources.push((*hi, pair.hi_to_lo.as_slice()));
            }
        }
        sources
    }

    /// Rules whose antecedent matches the consequent of `rule`, with the
    /// matches oriented `rule` consequent -> target antecedent.
    pub fn consequent_targets(&self, rule: RuleId) -> Vec<(RuleId, &[Match])> {
        let mut targets = Vec::new();
        for ((lo, hi), pair) in &self.edges {
            if *lo == rule && !pair.lo_to_hi.is_empty() {
                targets.push((*hi, pair.lo_to_hi.as_slice()));
            }
            if *hi == rule && lo != hi && !pair.hi_to_lo.is_empty() {
                targets.push((*lo, pair.hi_to_lo.as_slice()));
            }
        }
        targets
    }
}
