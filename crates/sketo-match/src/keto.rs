//! Keto-style hybrid patterns: literal text interleaved with `<…>`-delimited
//! regular expressions.
//!
//! A pattern is parsed left-to-right into an ordered list of segments.
//! Matching walks the segments against the candidate: a literal segment must
//! equal the next characters exactly; a regex segment must produce a
//! non-empty match anchored at the cursor. After the last segment the whole
//! candidate must be consumed.
use regex::Regex;

use crate::MatchError;

#[derive(Debug)]
enum Segment {
    Literal(String),
    Pattern(Regex),
}

/// A compiled Keto-regex pattern.
#[derive(Debug)]
pub struct KetoPattern {
    segments: Vec<Segment>,
}

impl KetoPattern {
    pub fn compile(pattern: &str) -> Result<Self, MatchError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut expr = String::new();
        let mut in_regex = false;
        for c in pattern.chars() {
            if in_regex {
                if c == '>' {
                    in_regex = false;
                    if !expr.is_empty() {
                        let anchored = format!("^(?:{expr})");
                        let compiled =
                            Regex::new(&anchored).map_err(|source| MatchError::Regex {
                                pattern: pattern.to_string(),
                                source,
                            })?;
                        segments.push(Segment::Pattern(compiled));
                        expr.clear();
                    }
                } else {
                    expr.push(c);
                }
            } else if c == '<' {
                in_regex = true;
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
            } else {
                literal.push(c);
            }
        }
        if in_regex {
            return Err(MatchError::UnterminatedRegex {
                pattern: pattern.to_string(),
            });
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    pub fn is_match(&self, item: &str) -> bool {
        let mut rest = item;
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => match rest.strip_prefix(literal.as_str()) {
                    Some(remaining) => rest = remaining,
                    None => return false,
                },
                Segment::Pattern(regex) => {
                    // Anchored at the cursor; an empty match is a failure.
                    let Some(found) = regex.find(rest) else {
                        return false;
                    };
                    if found.is_empty() {
                        return false;
                    }
                    rest = &rest[found.end()..];
                }
            }
        }
        rest.is_empty()
    }
}
