/*
 * Copyright © 2024 Volodymyr Kadzhaia
 * Copyright © 2024 Pieter Bonte
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::matching::MatchStrategy;
use crate::node::{NodeId, RuleNode};
use crate::plan::{ChainingDirection, ReasoningPlan};
use crate::rule::Rule;
use crate::store::{MatchIndex, RuleId, RuleStore};
use log::debug;
use shared::terms::TriplePattern;
use std::collections::{HashMap, HashSet};

/// The registration surface and plan factory. Rules are registered up
/// front; every `backward_plan`/`forward_plan` call snapshots them into a
/// self-contained episode, so the store stays untouched while a plan runs.
#[derive(Debug, Default)]
pub struct Reasoner {
    store: RuleStore,
}

impl Reasoner {
    pub fn new() -> Self {
        Reasoner {
            store: RuleStore::new(),
        }
    }

    pub fn add_rule(&mut self, rule: Rule) -> RuleId {
        self.store.add_rule(rule)
    }

    pub fn rules(&self) -> &[Rule] {
        self.store.rules()
    }

    /// Plan what must be derived to satisfy the goal pattern set. The
    /// episode root is a synthetic structural rule whose antecedent is the
    /// goal; rules whose consequents match it become its children.
    pub fn backward_plan(
        &self,
        goal: Vec<TriplePattern>,
        strategy: MatchStrategy,
    ) -> ReasoningPlan {
        let root_rule = Rule::new(goal, Vec::new());
        self.build_plan(root_rule, ChainingDirection::Backward, strategy)
    }

    /// Plan what follows from the asserted pattern set. The episode root is
    /// a synthetic structural rule whose consequent is the premise.
    pub fn forward_plan(
        &self,
        premise: Vec<TriplePattern>,
        strategy: MatchStrategy,
    ) -> ReasoningPlan {
        let root_rule = Rule::new(Vec::new(), premise);
        self.build_plan(root_rule, ChainingDirection::Forward, strategy)
    }

    fn build_plan(
        &self,
        root_rule: Rule,
        direction: ChainingDirection,
        strategy: MatchStrategy,
    ) -> ReasoningPlan {
        let mut rules: Vec<Rule> = self.store.rules().to_vec();
        let root_id: RuleId = rules.len();
        rules.push(root_rule);
        let index = MatchIndex::build(&rules, strategy);

        // the episode only carries rules reachable from the root
        let mut reachable = vec![root_id];
        let mut seen: HashSet<RuleId> = HashSet::from([root_id]);
        let mut cursor = 0;
        while cursor < reachable.len() {
            let current = reachable[cursor];
            cursor += 1;
            let next: Vec<RuleId> = match direction {
                ChainingDirection::Backward => index
                    .antecedent_sources(current)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect(),
                ChainingDirection::Forward => index
                    .consequent_targets(current)
                    .into_iter()
                    .map(|(id, _)| id)
                    .collect(),
            };
            for id in next {
                if seen.insert(id) {
                    reachable.push(id);
                }
            }
        }

        let node_of: HashMap<RuleId, NodeId> = reachable
            .iter()
            .enumerate()
            .map(|(node, rule)| (*rule, node))
            .collect();
        let mut nodes: Vec<RuleNode> = reachable
            .iter()
            .map(|&rule| RuleNode::new(rules[rule].clone(), rule))
            .collect();
        for (node, &rule) in reachable.iter().enumerate() {
            for (source, matches) in index.antecedent_sources(rule) {
                if let Some(&source_node) = node_of.get(&source) {
                    nodes[node].add_antecedent_neighbor(source_node, matches.to_vec());
                }
            }
            for (target, matches) in index.consequent_targets(rule) {
                if let Some(&target_node) = node_of.get(&target) {
                    nodes[node].add_consequent_neighbor(target_node, matches.to_vec());
                }
            }
        }
        debug!(
            "{:?} plan: {} of {} rule(s) reachable from the episode root",
            direction,
            nodes.len(),
            rules.len()
        );
        ReasoningPlan::new(nodes, node_of[&root_id], direction)
    }
}
