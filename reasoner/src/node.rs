use crate::bindings::TripleVarBindingSet;
use crate::matching::Match;
use crate::rule::Rule;
use crate::store::RuleId;
use shared::binding::BindingSet;

/// Handle of a rule node inside one plan's arena.
pub type NodeId = usize;

/// Per-episode execution state of a rule node. Readiness is monotonic: once
/// `Ready`, a node never leaves that state within the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Pending,
    AwaitingChildren,
    AwaitingHandler,
    Ready,
}

/// One rule plus its mutable per-episode state: the four directional binding
/// sets, the neighbor edges (with the matches that connect them) and the
/// status flag. Created once per rule per planning episode.
#[derive(Debug)]
pub struct RuleNode {
    rule: Rule,
    rule_id: RuleId,
    status: NodeStatus,
    incoming_antecedent: Option<TripleVarBindingSet>,
    outgoing_antecedent: Option<TripleVarBindingSet>,
    incoming_consequent: Option<TripleVarBindingSet>,
    outgoing_consequent: Option<TripleVarBindingSet>,
    /// Nodes whose consequent matches this rule's antecedent; matches are
    /// oriented neighbor consequent -> this antecedent.
    antecedent_neighbors: Vec<(NodeId, Vec<Match>)>,
    /// Nodes whose antecedent matches this rule's consequent; matches are
    /// oriented this consequent -> neighbor antecedent.
    consequent_neighbors: Vec<(NodeId, Vec<Match>)>,
}

impl RuleNode {
    pub fn new(rule: Rule, rule_id: RuleId) -> Self {
        RuleNode {
            rule,
            rule_id,
            status: NodeStatus::Pending,
            incoming_antecedent: None,
            outgoing_antecedent: None,
            incoming_consequent: None,
            outgoing_consequent: None,
            antecedent_neighbors: Vec::new(),
            consequent_neighbors: Vec::new(),
        }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    pub fn rule_id(&self) -> RuleId {
        self.rule_id
    }

    pub fn status(&self) -> NodeStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: NodeStatus) {
        assert!(
            self.status != NodeStatus::Ready,
            "a ready node must not change state within an episode"
        );
        self.status = status;
    }

    pub(crate) fn mark_ready(&mut self) {
        self.set_status(NodeStatus::Ready);
    }

    pub fn is_ready(&self) -> bool {
        self.status == NodeStatus::Ready
    }

    pub fn has_antecedent(&self) -> bool {
        self.rule.has_antecedent()
    }

    pub fn has_consequent(&self) -> bool {
        self.rule.has_consequent()
    }

    // The side accessors are part of the design contract: asking an
    // antecedent-less rule for antecedent state is a programming error, not
    // a recoverable condition.

    pub fn incoming_antecedent(&self) -> Option<&TripleVarBindingSet> {
        assert!(self.has_antecedent(), "rule has no antecedent side");
        self.incoming_antecedent.as_ref()
    }

    pub fn set_incoming_antecedent(&mut self, bs: TripleVarBindingSet) {
        assert!(self.has_antecedent(), "rule has no antecedent side");
        self.incoming_antecedent = Some(bs);
    }

    pub fn outgoing_antecedent(&self) -> Option<&TripleVarBindingSet> {
        assert!(self.has_antecedent(), "rule has no antecedent side");
        self.outgoing_antecedent.as_ref()
    }

    pub fn set_outgoing_antecedent(&mut self, bs: TripleVarBindingSet) {
        assert!(self.has_antecedent(), "rule has no antecedent side");
        self.outgoing_antecedent = Some(bs);
    }

    pub fn incoming_consequent(&self) -> Option<&TripleVarBindingSet> {
        assert!(self.has_consequent(), "rule has no consequent side");
        self.incoming_consequent.as_ref()
    }

    pub fn set_incoming_consequent(&mut self, bs: TripleVarBindingSet) {
        assert!(self.has_consequent(), "rule has no consequent side");
        self.incoming_consequent = Some(bs);
    }

    pub fn outgoing_consequent(&self) -> Option<&TripleVarBindingSet> {
        assert!(self.has_consequent(), "rule has no consequent side");
        self.outgoing_consequent.as_ref()
    }

    /// Resolve this node with the handler result, re-scoped onto the
    /// consequent. May happen once per episode; a second resolution is a
    /// programming error (readiness is monotonic).
    pub fn set_binding_set(&mut self, bs: &BindingSet) {
        assert!(self.has_consequent(), "rule has no consequent side");
        assert!(
            self.status != NodeStatus::Ready,
            "outgoing binding set may only be set once per episode"
        );
        self.outgoing_consequent = Some(TripleVarBindingSet::from_binding_set(
            bs,
            self.rule.consequent(),
        ));
        self.status = NodeStatus::Ready;
    }

    pub fn antecedent_neighbors(&self) -> &[(NodeId, Vec<Match>)] {
        &self.antecedent_neighbors
    }

    pub fn consequent_neighbors(&self) -> &[(NodeId, Vec<Match>)] {
        &self.consequent_neighbors
    }

    pub(crate) fn add_antecedent_neighbor(&mut self, node: NodeId, matches: Vec<Match>) {
        assert!(self.has_antecedent(), "rule has no antecedent side");
        self.antecedent_neighbors.push((node, matches));
    }

    pub(crate) fn add_consequent_neighbor(&mut self, node: NodeId, matches: Vec<Match>) {
        assert!(self.has_consequent(), "rule has no consequent side");
        self.consequent_neighbors.push((node, matches));
    }
}
