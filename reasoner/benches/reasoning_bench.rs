extern crate criterion;
extern crate reasoner;

use criterion::{criterion_group, criterion_main, Criterion};
use reasoner::errors::HandlerError;
use reasoner::matching::MatchStrategy;
use reasoner::reasoning::Reasoner;
use reasoner::rule::Rule;
use reasoner::taskboard::ImmediateExecution;
use shared::binding::{Binding, BindingSet};
use shared::dictionary::Dictionary;
use shared::terms::{Term, TriplePattern};

const DEPTH: usize = 8;
const ROWS: u32 = 16;

fn link(dict: &mut Dictionary, level: usize) -> TriplePattern {
    (
        Term::Variable("x".to_string()),
        Term::Constant(dict.encode(&format!("level{}", level))),
        Term::Variable("y".to_string()),
    )
}

/// A chain of identity rules over a table-backed base relation: level0 rows
/// propagate up through DEPTH rule applications.
fn chain_reasoner() -> (Reasoner, Vec<TriplePattern>) {
    let mut dict = Dictionary::new();
    let mut reasoner = Reasoner::new();

    reasoner.add_rule(Rule::with_transform(
        Vec::new(),
        vec![link(&mut dict, 0)],
        |_: &BindingSet| -> Result<BindingSet, HandlerError> {
            let mut out = BindingSet::new();
            for i in 0..ROWS {
                let mut b = Binding::new();
                b.put("x", 1000 + i);
                b.put("y", 2000 + i);
                out.add(b);
            }
            Ok(out)
        },
    ));
    for level in 0..DEPTH {
        reasoner.add_rule(Rule::new(
            vec![link(&mut dict, level)],
            vec![link(&mut dict, level + 1)],
        ));
    }
    let goal = vec![link(&mut dict, DEPTH)];
    (reasoner, goal)
}

fn bench_backward_chain(c: &mut Criterion) {
    let (reasoner, goal) = chain_reasoner();
    c.bench_function("backward_chain", |b| {
        b.iter(|| {
            let mut plan = reasoner.backward_plan(goal.clone(), MatchStrategy::BiggestMatches);
            plan.continue_backward(&BindingSet::new(), &mut ImmediateExecution)
                .unwrap()
                .unwrap()
        })
    });
}

fn bench_plan_construction(c: &mut Criterion) {
    let (reasoner, goal) = chain_reasoner();
    c.bench_function("backward_plan_construction", |b| {
        b.iter(|| reasoner.backward_plan(goal.clone(), MatchStrategy::BiggestMatches))
    });
}

criterion_group!(benches, bench_backward_chain, bench_plan_construction);
criterion_main!(benches);
