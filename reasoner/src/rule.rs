use crate::errors::HandlerError;
use shared::binding::BindingSet;
use shared::terms::{format_patterns, TriplePattern};
use std::fmt;
use std::rc::Rc;

/// External collaborator that turns antecedent bindings into consequent
/// bindings (or the reverse, for inverse transforms). Must tolerate an empty
/// binding set and the single-empty-binding form, both meaning "fetch
/// everything, no constraints were supplied".
pub trait TransformBindingSetHandler {
    fn handle(&self, bs: &BindingSet) -> Result<BindingSet, HandlerError>;
}

impl<F> TransformBindingSetHandler for F
where
    F: Fn(&BindingSet) -> Result<BindingSet, HandlerError>,
{
    fn handle(&self, bs: &BindingSet) -> Result<BindingSet, HandlerError> {
        self(bs)
    }
}

/// Side-effecting consumer of fully resolved antecedent bindings.
pub trait SinkBindingSetHandler {
    fn handle(&self, bs: &BindingSet) -> Result<(), HandlerError>;
}

impl<F> SinkBindingSetHandler for F
where
    F: Fn(&BindingSet) -> Result<(), HandlerError>,
{
    fn handle(&self, bs: &BindingSet) -> Result<(), HandlerError> {
        self(bs)
    }
}

#[derive(Clone)]
pub enum RuleHandler {
    /// Structural rule: bindings pass through unchanged. Projection onto the
    /// consequent happens when the result is re-scoped.
    Identity,
    Transform {
        forward: Rc<dyn TransformBindingSetHandler>,
        inverse: Option<Rc<dyn TransformBindingSetHandler>>,
    },
    Sink(Rc<dyn SinkBindingSetHandler>),
}

/// An inference rule: when the antecedent holds, the consequent follows.
/// Either side may be empty, but not both.
#[derive(Clone)]
pub struct Rule {
    antecedent: Vec<TriplePattern>,
    consequent: Vec<TriplePattern>,
    handler: RuleHandler,
}

impl Rule {
    pub fn new(antecedent: Vec<TriplePattern>, consequent: Vec<TriplePattern>) -> Self {
        Rule::with_handler(antecedent, consequent, RuleHandler::Identity)
    }

    pub fn with_transform<H>(
        antecedent: Vec<TriplePattern>,
        consequent: Vec<TriplePattern>,
        handler: H,
    ) -> Self
    where
        H: TransformBindingSetHandler + 'static,
    {
        Rule::with_handler(
            antecedent,
            consequent,
            RuleHandler::Transform {
                forward: Rc::new(handler),
                inverse: None,
            },
        )
    }

    pub fn with_sink<H>(antecedent: Vec<TriplePattern>, handler: H) -> Self
    where
        H: SinkBindingSetHandler + 'static,
    {
        Rule::with_handler(antecedent, Vec::new(), RuleHandler::Sink(Rc::new(handler)))
    }

    pub fn with_handler(
        antecedent: Vec<TriplePattern>,
        consequent: Vec<TriplePattern>,
        handler: RuleHandler,
    ) -> Self {
        assert!(
            !antecedent.is_empty() || !consequent.is_empty(),
            "a rule needs at least one antecedent or consequent pattern"
        );
        Rule {
            antecedent,
            consequent,
            handler,
        }
    }

    /// Attach an inverse transform (consequent -> antecedent) to a rule that
    /// already carries a forward transform.
    pub fn inverse<H>(mut self, handler: H) -> Self
    where
        H: TransformBindingSetHandler + 'static,
    {
        match &mut self.handler {
            RuleHandler::Transform { inverse, .. } => *inverse = Some(Rc::new(handler)),
            _ => panic!("only transform rules can carry an inverse handler"),
        }
        self
    }

    pub fn antecedent(&self) -> &[TriplePattern] {
        &self.antecedent
    }

    pub fn consequent(&self) -> &[TriplePattern] {
        &self.consequent
    }

    pub fn has_antecedent(&self) -> bool {
        !self.antecedent.is_empty()
    }

    pub fn has_consequent(&self) -> bool {
        !self.consequent.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        matches!(self.handler, RuleHandler::Sink(_))
    }

    pub fn has_inverse(&self) -> bool {
        matches!(
            self.handler,
            RuleHandler::Transform {
                inverse: Some(_),
                ..
            }
        )
    }

    /// Run the forward handler. Identity rules return their input unchanged.
    pub fn apply_transform(&self, bs: &BindingSet) -> Result<BindingSet, HandlerError> {
        match &self.handler {
            RuleHandler::Identity => Ok(bs.clone()),
            RuleHandler::Transform { forward, .. } => forward.handle(bs),
            RuleHandler::Sink(_) => Err(HandlerError(
                "sink rules cannot produce consequent bindings".to_string(),
            )),
        }
    }

    /// Run the inverse handler (consequent -> antecedent), when present.
    pub fn apply_inverse(&self, bs: &BindingSet) -> Option<Result<BindingSet, HandlerError>> {
        match &self.handler {
            RuleHandler::Transform {
                inverse: Some(inverse),
                ..
            } => Some(inverse.handle(bs)),
            _ => None,
        }
    }

    pub fn apply_sink(&self, bs: &BindingSet) -> Result<(), HandlerError> {
        match &self.handler {
            RuleHandler::Sink(sink) => sink.handle(bs),
            _ => Err(HandlerError("rule has no sink handler".to_string())),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{} => {}",
            format_patterns(&self.antecedent),
            format_patterns(&self.consequent)
        )
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.handler {
            RuleHandler::Identity => "identity",
            RuleHandler::Transform { .. } => "transform",
            RuleHandler::Sink(_) => "sink",
        };
        write!(f, "Rule [{} ({})]", self.describe(), kind)
    }
}
