/*
 * Copyright © 2024 ladroid
 * KU Leuven — Stream Intelligence Lab, Belgium
 *
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this file,
 * you can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::terms::{Term, TriplePattern};
use crate::triple::Triple;
use std::collections::HashMap;

// Dictionary for encoding and decoding strings
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dictionary {
    string_to_id: HashMap<String, u32>,
    id_to_string: HashMap<u32, String>,
    next_id: u32,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            string_to_id: HashMap::new(),
            id_to_string: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn encode(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.string_to_id.get(value) {
            id
        } else {
            let id = self.next_id;
            self.string_to_id.insert(value.to_string(), id);
            self.id_to_string.insert(id, value.to_string());
            self.next_id += 1;
            id
        }
    }

    pub fn decode(&self, id: u32) -> Option<&str> {
        self.id_to_string.get(&id).map(|s| s.as_str())
    }

    pub fn lookup(&self, value: &str) -> Option<u32> {
        self.string_to_id.get(value).copied()
    }

    pub fn decode_triple(&self, triple: &Triple) -> String {
        let s = self.decode(triple.subject).unwrap_or("unknown");
        let p = self.decode(triple.predicate).unwrap_or("unknown");
        let o = self.decode(triple.object).unwrap_or("unknown");
        format!("{} {} {} .", s, p, o)
    }

    pub fn decode_term(&self, term: &Term) -> String {
        match term {
            Term::Variable(v) => format!("?{}", v),
            Term::Constant(c) => self
                .decode(*c)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("<{}>", c)),
        }
    }

    pub fn decode_pattern(&self, pattern: &TriplePattern) -> String {
        format!(
            "{} {} {}",
            self.decode_term(&pattern.0),
            self.decode_term(&pattern.1),
            self.decode_term(&pattern.2)
        )
    }

    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_stable() {
        let mut dict = Dictionary::new();
        let a = dict.encode("type");
        let b = dict.encode("Target");
        assert_ne!(a, b);
        assert_eq!(dict.encode("type"), a);
        assert_eq!(dict.decode(b), Some("Target"));
        assert_eq!(dict.lookup("missing"), None);
    }

    #[test]
    fn test_decode_pattern() {
        let mut dict = Dictionary::new();
        let t = dict.encode("type");
        let pattern = (
            Term::Variable("id".to_string()),
            Term::Constant(t),
            Term::Constant(dict.encode("Target")),
        );
        assert_eq!(dict.decode_pattern(&pattern), "?id type Target");
    }
}
