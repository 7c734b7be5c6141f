//! Parsing of triple pattern strings like `?id <type> <Target>` or
//! `?id <hasCountry> "Russia"`. Constants are resolved through the
//! dictionary on the spot; angle brackets and quotes only disambiguate the
//! syntax, the encoded constant is the inner text in both cases.

use crate::errors::ReasonerError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    character::complete::{alphanumeric1, multispace0, multispace1},
    combinator::map,
    multi::separated_list1,
    sequence::{delimited, preceded},
    IResult,
};
use shared::dictionary::Dictionary;
use shared::terms::{Term, TriplePattern};

#[derive(Debug)]
enum RawTerm<'a> {
    Var(&'a str),
    Iri(&'a str),
    Literal(&'a str),
}

/// Parse something like "?variable", "<type>" or "\"Russia\""
fn parse_raw_term(input: &str) -> IResult<&str, RawTerm> {
    alt((
        map(preceded(tag("?"), alphanumeric1), RawTerm::Var),
        map(delimited(tag("<"), take_until(">"), tag(">")), RawTerm::Iri),
        map(
            delimited(tag("\""), take_until("\""), tag("\"")),
            RawTerm::Literal,
        ),
    ))(input)
}

fn parse_raw_pattern(input: &str) -> IResult<&str, (RawTerm, RawTerm, RawTerm)> {
    let (input, _) = multispace0(input)?;
    let (input, subject) = parse_raw_term(input)?;
    let (input, _) = multispace1(input)?;
    let (input, predicate) = parse_raw_term(input)?;
    let (input, _) = multispace1(input)?;
    let (input, object) = parse_raw_term(input)?;
    Ok((input, (subject, predicate, object)))
}

fn parse_raw_patterns(input: &str) -> IResult<&str, Vec<(RawTerm, RawTerm, RawTerm)>> {
    let (input, patterns) =
        separated_list1(preceded(multispace0, tag(".")), parse_raw_pattern)(input)?;
    // tolerate a terminating dot
    let (input, _) = multispace0(input)?;
    let (input, _) = nom::combinator::opt(tag("."))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, patterns))
}

fn to_term(raw: RawTerm, dict: &mut Dictionary) -> Term {
    match raw {
        RawTerm::Var(name) => Term::Variable(name.to_string()),
        RawTerm::Iri(value) | RawTerm::Literal(value) => Term::Constant(dict.encode(value)),
    }
}

/// Parse one triple pattern, encoding constants through the dictionary.
pub fn parse_pattern(input: &str, dict: &mut Dictionary) -> Result<TriplePattern, ReasonerError> {
    let patterns = parse_patterns(input, dict)?;
    if patterns.len() != 1 {
        return Err(ReasonerError::PatternParse(format!(
            "expected a single triple pattern, got {}: {:?}",
            patterns.len(),
            input
        )));
    }
    Ok(patterns.into_iter().next().unwrap())
}

/// Parse a whole graph pattern: triple patterns separated by `.`, with an
/// optional terminating `.`.
pub fn parse_patterns(
    input: &str,
    dict: &mut Dictionary,
) -> Result<Vec<TriplePattern>, ReasonerError> {
    match parse_raw_patterns(input) {
        Ok((rest, raw)) if rest.trim().is_empty() => Ok(raw
            .into_iter()
            .map(|(s, p, o)| (to_term(s, dict), to_term(p, dict), to_term(o, dict)))
            .collect()),
        Ok((rest, _)) => Err(ReasonerError::PatternParse(format!(
            "trailing input {:?} in {:?}",
            rest, input
        ))),
        Err(e) => Err(ReasonerError::PatternParse(format!(
            "{} in {:?}",
            e, input
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_pattern() {
        let mut dict = Dictionary::new();
        let pattern = parse_pattern("?id <type> <Target>", &mut dict).unwrap();
        assert_eq!(pattern.0, Term::Variable("id".to_string()));
        assert_eq!(pattern.1, Term::Constant(dict.lookup("type").unwrap()));
        assert_eq!(pattern.2, Term::Constant(dict.lookup("Target").unwrap()));
    }

    #[test]
    fn test_parse_literal_object() {
        let mut dict = Dictionary::new();
        let pattern = parse_pattern("?id <hasCountry> \"Russia\"", &mut dict).unwrap();
        assert_eq!(pattern.2, Term::Constant(dict.lookup("Russia").unwrap()));
    }

    #[test]
    fn test_parse_graph_pattern() {
        let mut dict = Dictionary::new();
        let patterns =
            parse_patterns("?id <type> <Target> . ?id <hasName> ?name .", &mut dict).unwrap();
        assert_eq!(patterns.len(), 2);
        // the shared variable keeps its name in both patterns
        assert_eq!(patterns[0].0, patterns[1].0);
    }

    #[test]
    fn test_same_constant_encodes_once() {
        let mut dict = Dictionary::new();
        let a = parse_pattern("?x <type> <Target>", &mut dict).unwrap();
        let b = parse_pattern("?y <type> <Target>", &mut dict).unwrap();
        assert_eq!(a.2, b.2);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_parse_error_is_typed() {
        let mut dict = Dictionary::new();
        let result = parse_pattern("?id <type", &mut dict);
        assert!(matches!(result, Err(ReasonerError::PatternParse(_))));
    }
}
