//! The per-episode reasoning graph: an arena of rule nodes composed around a
//! synthetic goal or premise rule, driven stepwise. `continue_backward` and
//! `continue_forward` do bounded synchronous work per call and never block;
//! they return `None` while some handler is still on the task board.

use crate::bindings::TripleVarBindingSet;
use crate::errors::ReasonerError;
use crate::matching::invert_all;
use crate::node::{NodeId, NodeStatus, RuleNode};
use crate::rule::Rule;
use crate::taskboard::ExecutionPolicy;
use log::{debug, error};
use shared::binding::BindingSet;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainingDirection {
    Backward,
    Forward,
}

pub struct ReasoningPlan {
    nodes: Vec<RuleNode>,
    root: NodeId,
    direction: ChainingDirection,
}

enum Visit {
    Enter(NodeId),
    Exit(NodeId),
}

impl ReasoningPlan {
    pub(crate) fn new(nodes: Vec<RuleNode>, root: NodeId, direction: ChainingDirection) -> Self {
        ReasoningPlan {
            nodes,
            root,
            direction,
        }
    }

    pub fn direction(&self) -> ChainingDirection {
        self.direction
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &RuleNode {
        &self.nodes[id]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_rule(&self, id: NodeId) -> &Rule {
        self.nodes[id].rule()
    }

    /// Resolve a node with a handler result coming back from the task board.
    pub fn set_binding_set(&mut self, id: NodeId, bs: &BindingSet) {
        self.nodes[id].set_binding_set(bs);
    }

    /// Resolve a sink node: it produced nothing, it is just done.
    pub fn mark_node_ready(&mut self, id: NodeId) {
        self.nodes[id].mark_ready();
    }

    /// One bounded step of goal-directed reasoning. Returns the final
    /// binding set once the episode root is ready, or `None` while handler
    /// work is still scheduled (drain the task board, then call again).
    pub fn continue_backward(
        &mut self,
        bs: &BindingSet,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<Option<BindingSet>, ReasonerError> {
        assert!(
            self.direction == ChainingDirection::Backward,
            "continue_backward called on a forward plan"
        );
        if self.nodes[self.root].status() != NodeStatus::Ready {
            self.backward_pass(bs, exec)?;
        }
        if self.nodes[self.root].status() == NodeStatus::Ready {
            let result = self.nodes[self.root]
                .incoming_antecedent()
                .map(TripleVarBindingSet::to_binding_set)
                .unwrap_or_default();
            Ok(Some(result))
        } else {
            Ok(None)
        }
    }

    /// Depth-first worklist over the antecedent edges: children are ensured
    /// first, a node fires once every antecedent neighbor is ready. A
    /// back-edge to a node on the current path is skipped, so cycles neither
    /// recurse forever nor deadlock the pass.
    fn backward_pass(
        &mut self,
        bs: &BindingSet,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<(), ReasonerError> {
        let mut stack = vec![Visit::Enter(self.root)];
        let mut on_path: HashSet<NodeId> = HashSet::new();

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    match self.nodes[id].status() {
                        NodeStatus::Ready | NodeStatus::AwaitingHandler => continue,
                        NodeStatus::Pending | NodeStatus::AwaitingChildren => {}
                    }
                    if !on_path.insert(id) {
                        continue;
                    }
                    stack.push(Visit::Exit(id));

                    let constraint = self.antecedent_constraint(id, bs);
                    if let Some(children) = self.prepare_antecedent_neighbors(id, &constraint)? {
                        for child in children {
                            if !on_path.contains(&child) {
                                stack.push(Visit::Enter(child));
                            }
                        }
                    }
                    // the sentinel case needs no descent: every child already
                    // has output pending on the board
                }
                Visit::Exit(id) => {
                    on_path.remove(&id);
                    match self.nodes[id].status() {
                        NodeStatus::Ready | NodeStatus::AwaitingHandler => continue,
                        NodeStatus::Pending | NodeStatus::AwaitingChildren => {}
                    }
                    let blocked = self.nodes[id].has_antecedent()
                        && self.nodes[id].antecedent_neighbors().iter().any(
                            |(neighbor, _)| {
                                self.nodes[*neighbor].status() != NodeStatus::Ready
                                    && !on_path.contains(neighbor)
                            },
                        );
                    if blocked {
                        self.nodes[id].set_status(NodeStatus::AwaitingChildren);
                        continue;
                    }
                    self.fire_backward(id, bs, exec)?;
                }
            }
        }
        Ok(())
    }

    /// The goal-side constraint of a node, scoped to its antecedent: the
    /// externally supplied binding set for the episode root, otherwise
    /// whatever the parent pushed onto the consequent side, carried across
    /// the rule (shared variable names survive, the rest is dropped).
    fn antecedent_constraint(&self, id: NodeId, bs: &BindingSet) -> TripleVarBindingSet {
        let antecedent = self.nodes[id].rule().antecedent();
        if id == self.root {
            return TripleVarBindingSet::from_binding_set(bs, antecedent);
        }
        match self.nodes[id].incoming_consequent() {
            Some(incoming) => {
                TripleVarBindingSet::from_binding_set(&incoming.to_binding_set(), antecedent)
            }
            None => TripleVarBindingSet::new(antecedent.to_vec()),
        }
    }

    /// Push the constraint down onto every antecedent neighbor that has no
    /// output yet (first writer wins on the neighbor's incoming consequent).
    /// Returns the neighbors that still need processing, or `None` when
    /// nothing needs processing but not every neighbor is ready — the
    /// structural "wait for the board" signal, distinct from `Some(empty)`
    /// which means this node can complete.
    pub fn prepare_antecedent_neighbors(
        &mut self,
        id: NodeId,
        constraint: &TripleVarBindingSet,
    ) -> Result<Option<Vec<NodeId>>, ReasonerError> {
        if !self.nodes[id].has_antecedent() {
            return Ok(Some(Vec::new()));
        }
        let neighbors = self.nodes[id].antecedent_neighbors().to_vec();
        let mut needing = Vec::new();
        let mut all_ready = true;
        for (neighbor, matches) in neighbors {
            if self.nodes[neighbor].status() != NodeStatus::Ready {
                all_ready = false;
            }
            if self.nodes[neighbor].outgoing_consequent().is_some() {
                continue;
            }
            let translated = constraint.translate(
                self.nodes[neighbor].rule().consequent(),
                &invert_all(&matches),
            )?;
            if self.nodes[neighbor].incoming_consequent().is_none() {
                self.nodes[neighbor].set_incoming_consequent(translated);
            }
            needing.push(neighbor);
        }
        if needing.is_empty() && !all_ready {
            Ok(None)
        } else {
            Ok(Some(needing))
        }
    }

    /// Consequent-side counterpart: the neighbors fed by this node that
    /// still need processing.
    pub fn prepare_consequent_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes[id].has_consequent() {
            return Vec::new();
        }
        self.nodes[id]
            .consequent_neighbors()
            .iter()
            .filter(|(neighbor, _)| self.nodes[*neighbor].status() == NodeStatus::Pending)
            .map(|(neighbor, _)| *neighbor)
            .collect()
    }

    /// The join step: every antecedent neighbor's output translated into
    /// this rule's antecedent scope, merged (including the self-merge that
    /// combines partial rows), filtered against the supplied constraint and
    /// restricted to fully bound rows.
    pub fn collect_incoming_antecedent(
        &mut self,
        id: NodeId,
        constraint: &TripleVarBindingSet,
    ) -> Result<(), ReasonerError> {
        let antecedent = self.nodes[id].rule().antecedent().to_vec();
        let mut combined = TripleVarBindingSet::new(antecedent.clone());
        let neighbors = self.nodes[id].antecedent_neighbors().to_vec();
        for (neighbor, matches) in neighbors {
            let translated = match self.nodes[neighbor].outgoing_consequent() {
                Some(out) => out.translate(&antecedent, &matches)?,
                None => {
                    debug!(
                        "collecting for node {}: neighbor {} has no output (cycle or dead end)",
                        id, neighbor
                    );
                    continue;
                }
            };
            combined = combined.merge(&translated)?;
        }
        combined = combined.merge(&combined)?;
        let compatible = combined.keep_compatible(constraint);
        self.nodes[id].set_incoming_antecedent(compatible.full_bindings());
        Ok(())
    }

    fn fire_backward(
        &mut self,
        id: NodeId,
        bs: &BindingSet,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<(), ReasonerError> {
        if self.nodes[id].has_antecedent() {
            let constraint = self.antecedent_constraint(id, bs);
            self.collect_incoming_antecedent(id, &constraint)?;
            let rule = self.nodes[id].rule().clone();
            let input = self.nodes[id]
                .incoming_antecedent()
                .map(TripleVarBindingSet::to_binding_set)
                .unwrap_or_default();
            if rule.is_sink() {
                self.apply_sink(id, &rule, input, exec)?;
            } else if rule.has_consequent() {
                self.apply_transform(id, &rule, input, exec)?;
            } else {
                // goal-style structural rule: collecting is all there is
                self.nodes[id].mark_ready();
            }
        } else {
            // no antecedent: the handler answers the constraint the parent
            // pushed down, e.g. a data-producing rule being asked backward
            let rule = self.nodes[id].rule().clone();
            let input = self.nodes[id]
                .incoming_consequent()
                .map(TripleVarBindingSet::to_binding_set)
                .unwrap_or_default();
            self.apply_transform(id, &rule, input, exec)?;
        }
        Ok(())
    }

    /// One bounded step of fact-directed reasoning: the premise root fires
    /// first, then the wave follows consequent edges, firing every node
    /// whose in-plan antecedent sources are all ready. Returns the premise
    /// binding set once every reachable node is done.
    pub fn continue_forward(
        &mut self,
        bs: &BindingSet,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<Option<BindingSet>, ReasonerError> {
        assert!(
            self.direction == ChainingDirection::Forward,
            "continue_forward called on a backward plan"
        );
        if self.nodes[self.root].status() == NodeStatus::Pending {
            let consequent = self.nodes[self.root].rule().consequent().to_vec();
            self.nodes[self.root]
                .set_incoming_consequent(TripleVarBindingSet::from_binding_set(bs, &consequent));
            let rule = self.nodes[self.root].rule().clone();
            self.apply_transform(self.root, &rule, bs.clone(), exec)?;
        }

        loop {
            let mut progressed = false;
            let ready: Vec<NodeId> = (0..self.nodes.len())
                .filter(|&id| self.nodes[id].status() == NodeStatus::Ready)
                .collect();
            for id in ready {
                for neighbor in self.prepare_consequent_neighbors(id) {
                    if self.nodes[neighbor].status() != NodeStatus::Pending {
                        continue;
                    }
                    let sources_ready = self.nodes[neighbor]
                        .antecedent_neighbors()
                        .iter()
                        .all(|(source, _)| self.nodes[*source].status() == NodeStatus::Ready);
                    if sources_ready {
                        self.fire_forward(neighbor, exec)?;
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        if self
            .nodes
            .iter()
            .any(|n| n.status() == NodeStatus::AwaitingHandler)
        {
            return Ok(None);
        }
        let unfired = self
            .nodes
            .iter()
            .filter(|n| n.status() != NodeStatus::Ready)
            .count();
        if unfired > 0 {
            debug!(
                "forward episode completed with {} node(s) never triggered",
                unfired
            );
        }
        let result = self.nodes[self.root]
            .outgoing_consequent()
            .map(TripleVarBindingSet::to_binding_set)
            .unwrap_or_default();
        Ok(Some(result))
    }

    fn fire_forward(
        &mut self,
        id: NodeId,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<(), ReasonerError> {
        let unconstrained =
            TripleVarBindingSet::new(self.nodes[id].rule().antecedent().to_vec());
        self.collect_incoming_antecedent(id, &unconstrained)?;
        let rule = self.nodes[id].rule().clone();
        let input = self.nodes[id]
            .incoming_antecedent()
            .map(TripleVarBindingSet::to_binding_set)
            .unwrap_or_default();
        if rule.is_sink() {
            self.apply_sink(id, &rule, input, exec)?;
        } else if rule.has_consequent() {
            self.apply_transform(id, &rule, input, exec)?;
        } else {
            self.nodes[id].mark_ready();
        }
        Ok(())
    }

    fn apply_transform(
        &mut self,
        id: NodeId,
        rule: &Rule,
        input: BindingSet,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<(), ReasonerError> {
        match exec.transform(id, rule, input)? {
            Some(result) => self.nodes[id].set_binding_set(&result),
            None => self.nodes[id].set_status(NodeStatus::AwaitingHandler),
        }
        Ok(())
    }

    fn apply_sink(
        &mut self,
        id: NodeId,
        rule: &Rule,
        input: BindingSet,
        exec: &mut dyn ExecutionPolicy,
    ) -> Result<(), ReasonerError> {
        if input.is_structurally_empty() {
            // a sink is never invoked on nothing
            self.nodes[id].mark_ready();
        } else if exec.sink(id, rule, input)? {
            self.nodes[id].mark_ready();
        } else {
            self.nodes[id].set_status(NodeStatus::AwaitingHandler);
        }
        Ok(())
    }

    /// Run the inverse transform (consequent -> antecedent) inline. Inverse
    /// handlers never go through the task board.
    pub fn apply_handler_inverse(&mut self, id: NodeId) -> Result<(), ReasonerError> {
        let rule = self.nodes[id].rule().clone();
        let input = self.nodes[id]
            .incoming_consequent()
            .map(TripleVarBindingSet::to_binding_set)
            .unwrap_or_default();
        match rule.apply_inverse(&input) {
            None => Err(ReasonerError::MissingInverseHandler(rule.describe())),
            Some(Err(e)) => {
                error!(
                    "inverse handler of rule [{}] failed on {:?}: {}",
                    rule.describe(),
                    input,
                    e
                );
                Err(ReasonerError::Handler {
                    rule: rule.describe(),
                    source: e,
                })
            }
            Some(Ok(result)) => {
                let antecedent = rule.antecedent();
                self.nodes[id].set_outgoing_antecedent(TripleVarBindingSet::from_binding_set(
                    &result, antecedent,
                ));
                Ok(())
            }
        }
    }
}

impl fmt::Display for ReasoningPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:?} plan, root {}", self.direction, self.root)?;
        for (id, node) in self.nodes.iter().enumerate() {
            writeln!(f, "  [{id}] {:?} {:?}", node.status(), node.rule())?;
        }
        Ok(())
    }
}
