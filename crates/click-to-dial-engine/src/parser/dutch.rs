use regex::Regex;
use std::sync::OnceLock;

use super::{MatchSpan, ParseError, ParserUnit};
use crate::dom::ElementRef;

/// Service number prefixes that allow a shorter or longer subscriber part.
const SERVICE_PREFIXES: &[&str] = &["0800", "0900", "0906", "0909"];

/// Link schemes that mean the host page already made the number dialable.
const DIALABLE_SCHEMES: &[&str] = &["tel:", "callto:", "sip:"];

/// Grammar for numbers in the Dutch numbering plan.
///
/// Accepts national numbers (`020-123 45 67`, `06 12345678`, `(010) 1234567`),
/// service numbers (`0800 1234`) and international notation for the +31
/// country code (`+31 (0)20 1234567`, `0031 6 12345678`). National numbers
/// normalize to their ten digits, international ones to `+31` followed by
/// the nine subscriber digits.
#[derive(Debug, Clone, Default)]
pub struct DutchParser;

impl DutchParser {
    pub fn new() -> Self {
        Self
    }

    fn candidates() -> &'static Regex {
        static CANDIDATE_REGEX: OnceLock<Regex> = OnceLock::new();
        CANDIDATE_REGEX.get_or_init(|| {
            // Digit groups joined by a single separator, `) ` after an area
            // code, or ` (0)` after a country code.
            Regex::new(
                r"(?:\+|00)?[0-9]+(?:(?:[ \x{A0}\-./]|\)[ \x{A0}]?|[ \x{A0}]?\(0\)[ \x{A0}]?)[0-9]+)*",
            )
            .expect("Invalid number regex")
        })
    }

    /// Dialable form of `candidate`, or `None` if it is not a Dutch number.
    pub fn normalize(candidate: &str) -> Option<String> {
        let plus = candidate.starts_with('+');
        if plus || candidate.starts_with("00") {
            let cleaned = candidate.replacen("(0)", "", 1);
            let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
            let subscriber = if plus {
                digits.strip_prefix("31")?
            } else {
                digits.strip_prefix("0031")?
            };
            if subscriber.len() != 9 || subscriber.starts_with('0') {
                return None;
            }
            return Some(format!("+31{subscriber}"));
        }

        let digits: String = candidate.chars().filter(char::is_ascii_digit).collect();
        if !digits.starts_with('0') {
            return None;
        }
        if SERVICE_PREFIXES.iter().any(|prefix| digits.starts_with(prefix)) {
            return (8..=11).contains(&digits.len()).then_some(digits);
        }
        (digits.len() == 10).then_some(digits)
    }

    /// Numbers inside a candidate that does not normalize as a whole, such
    /// as two numbers separated by a space or a number after a time range.
    ///
    /// The candidate is cut at spaces and the longest run of pieces that
    /// normalizes wins, left to right.
    fn split_candidate(offset: usize, candidate: &str) -> Vec<MatchSpan> {
        let mut pieces: Vec<(usize, usize)> = Vec::new();
        let mut piece_start = None;
        for (index, c) in candidate.char_indices() {
            match (c == ' ' || c == '\u{A0}', piece_start) {
                (true, Some(start)) => {
                    pieces.push((start, index));
                    piece_start = None;
                }
                (false, None) => piece_start = Some(index),
                _ => {}
            }
        }
        if let Some(start) = piece_start {
            pieces.push((start, candidate.len()));
        }

        let mut spans = Vec::new();
        let mut first = 0;
        while first < pieces.len() {
            let found = (first + 1..=pieces.len()).rev().find_map(|last| {
                let (start, end) = (pieces[first].0, pieces[last - 1].1);
                Self::normalize(&candidate[start..end])
                    .map(|number| (last, MatchSpan::new(offset + start, offset + end, number)))
            });
            match found {
                Some((next, span)) => {
                    spans.push(span);
                    first = next;
                }
                None => first += 1,
            }
        }
        spans
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl ParserUnit for DutchParser {
    fn parse(&self, text: &str) -> Result<Vec<MatchSpan>, ParseError> {
        let mut spans = Vec::new();
        for candidate in Self::candidates().find_iter(text) {
            let mut start = candidate.start();
            let end = candidate.end();

            // Pull an opening area-code parenthesis into the match.
            if text[..start].ends_with('(') && candidate.as_str().contains(')') {
                start -= 1;
            }

            let before = text[..start].chars().next_back();
            if before.is_some_and(|c| is_word_char(c) || c == '+') {
                continue;
            }
            if text[end..].chars().next().is_some_and(is_word_char) {
                continue;
            }

            match Self::normalize(candidate.as_str()) {
                Some(number) => spans.push(MatchSpan::new(start, end, number)),
                None => spans.extend(Self::split_candidate(candidate.start(), candidate.as_str())),
            }
        }
        Ok(spans)
    }

    fn is_blocking_node(&self, element: ElementRef<'_>) -> bool {
        if element.has_class(crate::annotator::ANNOTATION_CLASS) {
            return true;
        }
        element.tag() == "a"
            && element.attribute("href").is_some_and(|href| {
                let href = href.trim_start().to_ascii_lowercase();
                DIALABLE_SCHEMES
                    .iter()
                    .any(|scheme| href.starts_with(scheme))
            })
    }
}
