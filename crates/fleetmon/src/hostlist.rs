//! Expansion of the Slurm hostlist notation, e.g.
//! `queue1-dy-c5_xlarge-[1-3,7,11-12],queue2-st-t2_micro-5`.
//!
//! The expansion is lazy: [`expand`] returns an iterator that yields node names
//! in left-to-right, range-ascending order. The iterator stops after the first
//! error, so collecting it into a `Result<Vec<_>, _>` (see [`expand_to_vec`])
//! either yields every name or fails as a whole.

use std::ops::RangeInclusive;

use chumsky::Parser;
use chumsky::error::Simple;
use chumsky::primitive::just;
use thiserror::Error;

use crate::common::parser::{CharParser, all_consuming, parse_u32};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostlistError {
    #[error("empty node name at position {position} in `{spec}`")]
    EmptyName { spec: String, position: usize },
    #[error("unmatched `[` in `{fragment}`")]
    UnmatchedBracket { fragment: String },
    #[error("invalid ranges `[{ranges}]` for `{name}`:\n{diagnostic}")]
    InvalidRanges {
        name: String,
        ranges: String,
        diagnostic: String,
    },
    #[error("unexpected `{fragment}` after `]`, expected `,` or end of input")]
    TrailingCharacters { fragment: String },
}

/// Parses a single range in the format `n[-end]`.
fn parse_range() -> impl CharParser<RangeInclusive<u32>> {
    let start = parse_u32().labelled("start");
    let end = just('-').ignore_then(parse_u32()).labelled("end").or_not();

    start
        .then(end)
        .try_map(|(start, end), span| match end {
            None => Ok(start..=start),
            Some(end) if end >= start => Ok(start..=end),
            Some(_) => Err(Simple::custom(span, "Descending range")),
        })
        .labelled("Integer range")
}

/// Parses the body of a bracket: ranges separated by commas.
fn parse_ranges() -> impl CharParser<Vec<RangeInclusive<u32>>> {
    all_consuming(parse_range().separated_by(just(',')).at_least(1))
}

/// Expands a hostlist into the node names it denotes.
/// Whitespace is ignored everywhere; an empty input yields no names.
pub fn expand(spec: &str) -> NodeNames {
    NodeNames::new(spec)
}

/// Expands a hostlist into a list of node names, failing if any part of it is malformed.
pub fn expand_to_vec(spec: &str) -> Result<Vec<String>, HostlistError> {
    expand(spec).collect()
}

struct BracketExpansion {
    base: String,
    ranges: std::vec::IntoIter<RangeInclusive<u32>>,
    current: RangeInclusive<u32>,
}

impl Iterator for BracketExpansion {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(index) = self.current.next() {
                return Some(format!("{}{}", self.base, index));
            }
            self.current = self.ranges.next()?;
        }
    }
}

/// Single-pass iterator over the node names of a hostlist.
pub struct NodeNames {
    spec: String,
    position: usize,
    pending: Option<BracketExpansion>,
    finished: bool,
}

impl NodeNames {
    fn new(spec: &str) -> Self {
        let spec: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        Self {
            finished: spec.is_empty(),
            spec,
            position: 0,
            pending: None,
        }
    }

    fn fail(&mut self, error: HostlistError) -> Option<Result<String, HostlistError>> {
        self.finished = true;
        self.pending = None;
        Some(Err(error))
    }

    fn empty_name(&self, position: usize) -> HostlistError {
        HostlistError::EmptyName {
            spec: self.spec.clone(),
            position,
        }
    }

    /// Reads the next element starting at `self.position`.
    /// Returns either a plain name or a bracket expansion.
    fn next_element(&mut self) -> Result<Element, HostlistError> {
        let start = self.position;
        let rest = &self.spec[start..];
        let Some(offset) = rest.find([',', '[']) else {
            self.finished = true;
            return Ok(Element::Plain(rest.to_string()));
        };
        let name = &rest[..offset];
        if name.is_empty() {
            return Err(self.empty_name(start));
        }

        if rest.as_bytes()[offset] == b',' {
            self.position = start + offset + 1;
            if self.position == self.spec.len() {
                return Err(self.empty_name(self.position));
            }
            return Ok(Element::Plain(name.to_string()));
        }

        let body_start = offset + 1;
        let Some(body_len) = rest[body_start..].find(']') else {
            return Err(HostlistError::UnmatchedBracket {
                fragment: rest.to_string(),
            });
        };
        let body = &rest[body_start..body_start + body_len];
        let ranges = parse_ranges()
            .parse_text(body)
            .map_err(|e| HostlistError::InvalidRanges {
                name: name.to_string(),
                ranges: body.to_string(),
                diagnostic: e.to_string(),
            })?;

        let after = body_start + body_len + 1;
        match rest[after..].chars().next() {
            None => self.finished = true,
            Some(',') => {
                self.position = start + after + 1;
                if self.position == self.spec.len() {
                    return Err(self.empty_name(self.position));
                }
            }
            Some(_) => {
                return Err(HostlistError::TrailingCharacters {
                    fragment: rest[after..].to_string(),
                });
            }
        }

        let mut ranges = ranges.into_iter();
        let current = ranges.next().unwrap_or(1..=0);
        Ok(Element::Bracket(BracketExpansion {
            base: name.to_string(),
            ranges,
            current,
        }))
    }
}

enum Element {
    Plain(String),
    Bracket(BracketExpansion),
}

impl Iterator for NodeNames {
    type Item = Result<String, HostlistError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pending) = &mut self.pending {
                if let Some(name) = pending.next() {
                    return Some(Ok(name));
                }
                self.pending = None;
            }
            if self.finished {
                return None;
            }
            match self.next_element() {
                Ok(Element::Plain(name)) => return Some(Ok(name)),
                Ok(Element::Bracket(expansion)) => self.pending = Some(expansion),
                Err(error) => return self.fail(error),
            }
        }
    }
}

impl std::iter::FusedIterator for NodeNames {}
