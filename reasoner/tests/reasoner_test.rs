extern crate reasoner;

use reasoner::errors::{HandlerError, ReasonerError};
use reasoner::matching::MatchStrategy;
use reasoner::parser::{parse_pattern, parse_patterns};
use reasoner::plan::ReasoningPlan;
use reasoner::reasoning::Reasoner;
use reasoner::rule::Rule;
use reasoner::taskboard::{ImmediateExecution, ScheduledExecution, TaskBoard};
use shared::binding::{Binding, BindingSet};
use shared::dictionary::Dictionary;
use shared::terms::substitute_pattern;
use std::cell::RefCell;
use std::rc::Rc;

/// In-memory relation backing a data-producing rule, queried with a binding
/// as the filter.
struct Table {
    rows: Vec<Binding>,
}

impl Table {
    fn query(&self, filter: &Binding) -> Vec<Binding> {
        self.rows
            .iter()
            .filter(|row| filter.is_compatible(row))
            .cloned()
            .collect()
    }

    fn all(&self) -> Vec<Binding> {
        self.rows.clone()
    }
}

struct Vocab {
    target0: u32,
    target1: u32,
    eek: u32,
    bla: u32,
    russia: u32,
    holland: u32,
    belgium: u32,
    dutch: u32,
    russian: u32,
    flemish: u32,
}

fn binding(pairs: &[(&str, u32)]) -> Binding {
    let mut b = Binding::new();
    for (var, value) in pairs {
        b.put(var, *value);
    }
    b
}

/// The dynamic-configuration setup: a table-backed rule producing targets,
/// a country lookup, and a rule promoting Russian targets to high value.
fn high_value_target_reasoner(dict: &mut Dictionary) -> (Reasoner, Vocab) {
    let vocab = Vocab {
        target0: dict.encode("https://www.tno.nl/target0"),
        target1: dict.encode("https://www.tno.nl/target1"),
        eek: dict.encode("Eek"),
        bla: dict.encode("Bla"),
        russia: dict.encode("Russia"),
        holland: dict.encode("Holland"),
        belgium: dict.encode("Belgium"),
        dutch: dict.encode("Dutch"),
        russian: dict.encode("Russian"),
        flemish: dict.encode("Flemish"),
    };

    let mut reasoner = Reasoner::new();

    let table = Table {
        rows: vec![
            binding(&[("id", vocab.target0), ("name", vocab.eek)]),
            binding(&[("id", vocab.target1), ("name", vocab.bla)]),
        ],
    };
    reasoner.add_rule(Rule::with_transform(
        Vec::new(),
        parse_patterns("?id <type> <Target> . ?id <hasName> ?name", dict).unwrap(),
        move |bs: &BindingSet| -> Result<BindingSet, HandlerError> {
            let mut out = BindingSet::new();
            if bs.is_empty() {
                out.add_all(table.all());
            } else {
                for b in bs {
                    if b.is_empty() {
                        out.add_all(table.all());
                    } else {
                        out.add_all(table.query(b));
                    }
                }
            }
            Ok(out)
        },
    ));

    reasoner.add_rule(Rule::new(
        parse_patterns("?id <type> <Target> . ?id <hasCountry> \"Russia\"", dict).unwrap(),
        parse_patterns("?id <type> <HighValueTarget>", dict).unwrap(),
    ));

    let (target0, target1) = (vocab.target0, vocab.target1);
    let (russia, holland, belgium) = (vocab.russia, vocab.holland, vocab.belgium);
    let (russian, dutch, flemish) = (vocab.russian, vocab.dutch, vocab.flemish);
    reasoner.add_rule(Rule::with_transform(
        parse_patterns("?id <type> <Target> . ?id <hasName> ?name", dict).unwrap(),
        parse_patterns("?id <hasCountry> ?c", dict).unwrap(),
        move |bs: &BindingSet| -> Result<BindingSet, HandlerError> {
            let mut out = BindingSet::new();
            for b in bs {
                let Some(id) = b.get("id") else { continue };
                let (country, language) = if id == target1 {
                    (russia, russian)
                } else if id == target0 {
                    (holland, dutch)
                } else {
                    (belgium, flemish)
                };
                // the extra language column is projected away by the
                // consequent scope
                out.add(binding(&[("id", id), ("c", country), ("lang", language)]));
            }
            Ok(out)
        },
    ));

    (reasoner, vocab)
}

fn goal(dict: &mut Dictionary) -> Vec<shared::terms::TriplePattern> {
    parse_patterns("?id <type> <HighValueTarget> . ?id <hasName> ?name", dict).unwrap()
}

fn drive_backward_with_board(plan: &mut ReasoningPlan, bs: &BindingSet) -> BindingSet {
    let mut board = TaskBoard::new();
    let mut iterations = 0;
    loop {
        iterations += 1;
        assert!(
            iterations <= plan.node_count() + 1,
            "episode did not terminate within the node bound"
        );
        let step = {
            let mut exec = ScheduledExecution::new(&mut board);
            plan.continue_backward(bs, &mut exec).unwrap()
        };
        match step {
            Some(result) => return result,
            None => {
                board.execute_scheduled_tasks(plan);
            }
        }
    }
}

#[test]
fn test_backward_high_value_target() {
    let mut dict = Dictionary::new();
    let (reasoner, vocab) = high_value_target_reasoner(&mut dict);
    let mut plan = reasoner.backward_plan(goal(&mut dict), MatchStrategy::BiggestMatches);

    let result = plan
        .continue_backward(&BindingSet::new(), &mut ImmediateExecution)
        .unwrap()
        .expect("inline handlers resolve in one pass");

    assert_eq!(result.len(), 1);
    let only = result.iter().next().unwrap();
    assert_eq!(only.get("id"), Some(vocab.target1));
    assert_eq!(only.get("name"), Some(vocab.bla));
}

#[test]
fn test_backward_high_value_target_with_taskboard() {
    let mut dict = Dictionary::new();
    let (reasoner, vocab) = high_value_target_reasoner(&mut dict);
    let mut plan = reasoner.backward_plan(goal(&mut dict), MatchStrategy::BiggestMatches);

    let result = drive_backward_with_board(&mut plan, &BindingSet::new());

    assert_eq!(result.len(), 1);
    let only = result.iter().next().unwrap();
    assert_eq!(only.get("id"), Some(vocab.target1));
    assert_eq!(only.get("name"), Some(vocab.bla));
}

#[test]
fn test_backward_respects_initial_bindings() {
    let mut dict = Dictionary::new();
    let (reasoner, vocab) = high_value_target_reasoner(&mut dict);

    // constraining the goal to the Russian target still derives it
    let mut plan = reasoner.backward_plan(goal(&mut dict), MatchStrategy::BiggestMatches);
    let mut bs = BindingSet::new();
    bs.add(binding(&[("name", vocab.bla)]));
    let result = drive_backward_with_board(&mut plan, &bs);
    assert_eq!(result.len(), 1);
    assert_eq!(result.iter().next().unwrap().get("id"), Some(vocab.target1));

    // constraining it to the Dutch target leaves nothing
    let mut plan = reasoner.backward_plan(goal(&mut dict), MatchStrategy::BiggestMatches);
    let mut bs = BindingSet::new();
    bs.add(binding(&[("name", vocab.eek)]));
    let result = drive_backward_with_board(&mut plan, &bs);
    assert!(result.is_empty());
}

#[test]
fn test_backward_goal_without_matching_rules() {
    let mut dict = Dictionary::new();
    let (reasoner, _) = high_value_target_reasoner(&mut dict);
    let unmatched = parse_patterns("?x <somethingElse> ?y", &mut dict).unwrap();
    let mut plan = reasoner.backward_plan(unmatched, MatchStrategy::BiggestMatches);

    // "no derivation" is an answer, not an error and not a hang
    let result = plan
        .continue_backward(&BindingSet::new(), &mut ImmediateExecution)
        .unwrap()
        .expect("a dead-end goal completes immediately");
    assert!(result.is_empty());
}

#[test]
fn test_unconstrained_fetch_invokes_handler_once() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let consequent =
        parse_patterns("?id <type> <Target> . ?id <hasName> ?name", &mut dict).unwrap();
    let a = dict.encode("a");
    let b = dict.encode("b");

    let calls = Rc::new(RefCell::new(0usize));
    let seen = calls.clone();
    reasoner.add_rule(Rule::with_transform(
        Vec::new(),
        consequent.clone(),
        move |bs: &BindingSet| -> Result<BindingSet, HandlerError> {
            *seen.borrow_mut() += 1;
            // no constraints were supplied: union-fetch everything
            assert!(bs.is_structurally_empty());
            assert!(!bs.is_empty());
            let mut out = BindingSet::new();
            out.add(binding(&[("id", a), ("name", a)]));
            out.add(binding(&[("id", b), ("name", b)]));
            Ok(out)
        },
    ));

    let mut plan = reasoner.backward_plan(consequent, MatchStrategy::BiggestMatches);
    let result = plan
        .continue_backward(&BindingSet::new(), &mut ImmediateExecution)
        .unwrap()
        .unwrap();

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(result.len(), 2);
}

#[test]
fn test_forward_premise_reaches_sink() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let premise = parse_patterns("?s <type> <Sensor>", &mut dict).unwrap();
    let sensor_pattern = parse_pattern("?s <type> <Sensor>", &mut dict).unwrap();

    let received: Rc<RefCell<Vec<Binding>>> = Rc::new(RefCell::new(Vec::new()));
    let inbox = received.clone();
    reasoner.add_rule(Rule::with_sink(
        premise.clone(),
        move |bs: &BindingSet| -> Result<(), HandlerError> {
            inbox.borrow_mut().extend(bs.iter().cloned());
            Ok(())
        },
    ));

    let sensor1 = dict.encode("sensor1");
    let mut bs = BindingSet::new();
    bs.add(binding(&[("s", sensor1)]));

    let mut plan = reasoner.forward_plan(premise, MatchStrategy::BiggestMatches);
    assert_eq!(plan.node_count(), 2);
    let result = plan
        .continue_forward(&bs, &mut ImmediateExecution)
        .unwrap()
        .expect("inline handlers resolve in one pass");
    assert_eq!(result, bs);

    let rows = received.borrow();
    assert_eq!(rows.len(), 1);
    // a fully bound row denotes a ground fact
    let fact = substitute_pattern(&sensor_pattern, &rows[0]).unwrap();
    assert_eq!(dict.decode_triple(&fact), "sensor1 type Sensor .");
}

#[test]
fn test_forward_with_taskboard() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let premise = parse_patterns("?s <type> <Sensor>", &mut dict).unwrap();

    let received: Rc<RefCell<Vec<Binding>>> = Rc::new(RefCell::new(Vec::new()));
    let inbox = received.clone();
    reasoner.add_rule(Rule::with_sink(
        premise.clone(),
        move |bs: &BindingSet| -> Result<(), HandlerError> {
            inbox.borrow_mut().extend(bs.iter().cloned());
            Ok(())
        },
    ));

    let sensor1 = dict.encode("sensor1");
    let mut bs = BindingSet::new();
    bs.add(binding(&[("s", sensor1)]));

    let mut plan = reasoner.forward_plan(premise, MatchStrategy::BiggestMatches);
    let mut board = TaskBoard::new();
    let mut iterations = 0;
    let result = loop {
        iterations += 1;
        assert!(iterations <= plan.node_count() + 1);
        let step = {
            let mut exec = ScheduledExecution::new(&mut board);
            plan.continue_forward(&bs, &mut exec).unwrap()
        };
        match step {
            Some(result) => break result,
            None => {
                board.execute_scheduled_tasks(&mut plan);
            }
        }
    };
    assert_eq!(result, bs);
    assert_eq!(received.borrow().len(), 1);
}

#[test]
fn test_forward_empty_premise_skips_sink() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let premise = parse_patterns("?s <type> <Sensor>", &mut dict).unwrap();

    let calls = Rc::new(RefCell::new(0usize));
    let seen = calls.clone();
    reasoner.add_rule(Rule::with_sink(
        premise.clone(),
        move |_: &BindingSet| -> Result<(), HandlerError> {
            *seen.borrow_mut() += 1;
            Ok(())
        },
    ));

    let mut plan = reasoner.forward_plan(premise, MatchStrategy::BiggestMatches);
    let result = plan
        .continue_forward(&BindingSet::new(), &mut ImmediateExecution)
        .unwrap()
        .expect("an empty premise completes immediately");
    assert!(result.is_empty());
    // a sink is never invoked on a structurally empty binding set
    assert_eq!(*calls.borrow(), 0);
}

#[test]
fn test_failing_handler_leaves_plan_stuck() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let consequent = parse_patterns("?id <type> <Target>", &mut dict).unwrap();
    reasoner.add_rule(Rule::with_transform(
        Vec::new(),
        consequent.clone(),
        |_: &BindingSet| -> Result<BindingSet, HandlerError> {
            Err(HandlerError("remote endpoint unavailable".to_string()))
        },
    ));

    let mut plan = reasoner.backward_plan(consequent, MatchStrategy::BiggestMatches);
    let mut board = TaskBoard::new();

    let step = {
        let mut exec = ScheduledExecution::new(&mut board);
        plan.continue_backward(&BindingSet::new(), &mut exec).unwrap()
    };
    assert!(step.is_none());
    // the failure is contained: nothing completes, the node stays unresolved
    assert_eq!(board.execute_scheduled_tasks(&mut plan), 0);
    let step = {
        let mut exec = ScheduledExecution::new(&mut board);
        plan.continue_backward(&BindingSet::new(), &mut exec).unwrap()
    };
    assert!(step.is_none());
}

#[test]
fn test_failing_handler_surfaces_error_inline() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let consequent = parse_patterns("?id <type> <Target>", &mut dict).unwrap();
    reasoner.add_rule(Rule::with_transform(
        Vec::new(),
        consequent.clone(),
        |_: &BindingSet| -> Result<BindingSet, HandlerError> {
            Err(HandlerError("remote endpoint unavailable".to_string()))
        },
    ));

    let mut plan = reasoner.backward_plan(consequent, MatchStrategy::BiggestMatches);
    let result = plan.continue_backward(&BindingSet::new(), &mut ImmediateExecution);
    assert!(matches!(result, Err(ReasonerError::Handler { .. })));
}

#[test]
fn test_inverse_transform_runs_inline() {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();
    let seven = dict.encode("seven");
    let eight = dict.encode("eight");

    reasoner.add_rule(
        Rule::with_transform(
            parse_patterns("?id <source> ?v", &mut dict).unwrap(),
            parse_patterns("?id <derived> ?v", &mut dict).unwrap(),
            |bs: &BindingSet| -> Result<BindingSet, HandlerError> { Ok(bs.clone()) },
        )
        .inverse(move |_: &BindingSet| -> Result<BindingSet, HandlerError> {
            let mut out = BindingSet::new();
            out.add(binding(&[("id", seven), ("v", eight)]));
            Ok(out)
        }),
    );
    // a structural rule without any inverse
    reasoner.add_rule(Rule::new(
        parse_patterns("?x <other> <thing>", &mut dict).unwrap(),
        parse_patterns("?x <derived> <thing>", &mut dict).unwrap(),
    ));

    let goal = parse_patterns("?a <derived> ?b", &mut dict).unwrap();
    let mut plan = reasoner.backward_plan(goal, MatchStrategy::BiggestMatches);
    plan.continue_backward(&BindingSet::new(), &mut ImmediateExecution)
        .unwrap()
        .expect("plan completes");

    let with_inverse = (0..plan.node_count())
        .find(|&id| plan.node(id).rule().has_inverse())
        .unwrap();
    plan.apply_handler_inverse(with_inverse).unwrap();
    let outgoing = plan.node(with_inverse).outgoing_antecedent().unwrap();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing.bindings().next().unwrap().value_of("id"), Some(seven));

    let without_inverse = (0..plan.node_count())
        .find(|&id| {
            let rule = plan.node(id).rule();
            rule.has_consequent() && rule.has_antecedent() && !rule.has_inverse()
        })
        .unwrap();
    assert!(matches!(
        plan.apply_handler_inverse(without_inverse),
        Err(ReasonerError::MissingInverseHandler(_))
    ));
}

#[test]
fn test_plan_is_printable() {
    let mut dict = Dictionary::new();
    let (reasoner, _) = high_value_target_reasoner(&mut dict);
    let plan = reasoner.backward_plan(goal(&mut dict), MatchStrategy::BiggestMatches);
    let rendered = format!("{}", plan);
    assert!(rendered.contains("Backward plan"));
    assert!(rendered.contains("Pending"));
}
