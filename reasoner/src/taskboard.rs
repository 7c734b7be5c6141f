//! The externally pumped work list. When an episode runs with a task board,
//! handler invocations are recorded here instead of being run inline; the
//! caller drains the board between `continue` calls and results are written
//! back onto the owning nodes.

use crate::errors::ReasonerError;
use crate::node::NodeId;
use crate::plan::ReasoningPlan;
use crate::rule::Rule;
use log::{debug, error};
use shared::binding::BindingSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Transform,
    Sink,
}

#[derive(Debug)]
pub struct ScheduledTask {
    pub node: NodeId,
    pub input: BindingSet,
    pub kind: TaskKind,
}

#[derive(Debug, Default)]
pub struct TaskBoard {
    tasks: Vec<ScheduledTask>,
}

impl TaskBoard {
    pub fn new() -> Self {
        TaskBoard { tasks: Vec::new() }
    }

    pub fn add_task(&mut self, node: NodeId, input: BindingSet) {
        self.tasks.push(ScheduledTask {
            node,
            input,
            kind: TaskKind::Transform,
        });
    }

    pub fn add_void_task(&mut self, node: NodeId, input: BindingSet) {
        self.tasks.push(ScheduledTask {
            node,
            input,
            kind: TaskKind::Sink,
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Run every currently due task to completion and write the results back
    /// onto the plan. A failing handler is logged with its rule and binding
    /// set and leaves its node unresolved; the episode then stays stuck at
    /// `None` until the caller notices. Returns how many tasks completed.
    pub fn execute_scheduled_tasks(&mut self, plan: &mut ReasoningPlan) -> usize {
        let tasks = std::mem::take(&mut self.tasks);
        let mut completed = 0;
        for task in tasks {
            let rule = plan.node_rule(task.node).clone();
            match task.kind {
                TaskKind::Transform => match rule.apply_transform(&task.input) {
                    Ok(result) => {
                        plan.set_binding_set(task.node, &result);
                        completed += 1;
                    }
                    Err(e) => {
                        error!(
                            "transform handler of rule [{}] failed on {:?}: {}",
                            rule.describe(),
                            task.input,
                            e
                        );
                    }
                },
                TaskKind::Sink => match rule.apply_sink(&task.input) {
                    Ok(()) => {
                        plan.mark_node_ready(task.node);
                        completed += 1;
                    }
                    Err(e) => {
                        error!(
                            "sink handler of rule [{}] failed on {:?}: {}",
                            rule.describe(),
                            task.input,
                            e
                        );
                    }
                },
            }
        }
        debug!("task board drained, {} task(s) completed", completed);
        completed
    }
}

/// How handler invocations run during one episode: inline, or deferred to a
/// task board. Selected once per episode so the node logic never branches on
/// "is there a scheduler".
pub trait ExecutionPolicy {
    /// `Some(result)` when the handler ran inline, `None` when it was
    /// deferred and the node has to wait for the board.
    fn transform(
        &mut self,
        node: NodeId,
        rule: &Rule,
        input: BindingSet,
    ) -> Result<Option<BindingSet>, ReasonerError>;

    /// `true` when the sink completed inline, `false` when deferred.
    fn sink(&mut self, node: NodeId, rule: &Rule, input: BindingSet)
        -> Result<bool, ReasonerError>;
}

/// Runs every handler synchronously. Single-shot use and tests.
#[derive(Debug, Default)]
pub struct ImmediateExecution;

impl ExecutionPolicy for ImmediateExecution {
    fn transform(
        &mut self,
        _node: NodeId,
        rule: &Rule,
        input: BindingSet,
    ) -> Result<Option<BindingSet>, ReasonerError> {
        match rule.apply_transform(&input) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                error!(
                    "transform handler of rule [{}] failed on {:?}: {}",
                    rule.describe(),
                    input,
                    e
                );
                Err(ReasonerError::Handler {
                    rule: rule.describe(),
                    source: e,
                })
            }
        }
    }

    fn sink(
        &mut self,
        _node: NodeId,
        rule: &Rule,
        input: BindingSet,
    ) -> Result<bool, ReasonerError> {
        match rule.apply_sink(&input) {
            Ok(()) => Ok(true),
            Err(e) => {
                error!(
                    "sink handler of rule [{}] failed on {:?}: {}",
                    rule.describe(),
                    input,
                    e
                );
                Err(ReasonerError::Handler {
                    rule: rule.describe(),
                    source: e,
                })
            }
        }
    }
}

/// Defers every handler to the given task board.
#[derive(Debug)]
pub struct ScheduledExecution<'a> {
    board: &'a mut TaskBoard,
}

impl<'a> ScheduledExecution<'a> {
    pub fn new(board: &'a mut TaskBoard) -> Self {
        ScheduledExecution { board }
    }
}

impl ExecutionPolicy for ScheduledExecution<'_> {
    fn transform(
        &mut self,
        node: NodeId,
        _rule: &Rule,
        input: BindingSet,
    ) -> Result<Option<BindingSet>, ReasonerError> {
        self.board.add_task(node, input);
        Ok(None)
    }

    fn sink(
        &mut self,
        node: NodeId,
        _rule: &Rule,
        input: BindingSet,
    ) -> Result<bool, ReasonerError> {
        self.board.add_void_task(node, input);
        Ok(false)
    }
}
