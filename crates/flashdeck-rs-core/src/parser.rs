//! Tolerant extraction of the tagged card block from a model response.

use regex::Regex;
use std::sync::LazyLock;

static FRONT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<FRONT>(.*?)</FRONT>").expect("valid front tag regex"));
static BACK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<BACK>(.*?)</BACK>").expect("valid back tag regex"));

/// Where an extracted field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Taken from the response.
    Extracted,
    /// Missing or empty in the response; the original value was kept.
    Retained,
}

/// Parsed card sides with per-field provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub front: String,
    pub back: String,
    pub front_source: FieldSource,
    pub back_source: FieldSource,
}

impl Extraction {
    /// True when neither side came from the response.
    pub fn is_unchanged(&self) -> bool {
        self.front_source == FieldSource::Retained && self.back_source == FieldSource::Retained
    }
}

/// Pull `<FRONT>` and `<BACK>` out of `response`, falling back to the
/// originals for any side that is absent or blank. Never fails.
pub fn extract_card(response: &str, original_front: &str, original_back: &str) -> Extraction {
    let (front, front_source) = field(response, &FRONT_TAG, original_front);
    let (back, back_source) = field(response, &BACK_TAG, original_back);
    Extraction {
        front,
        back,
        front_source,
        back_source,
    }
}

fn field(response: &str, pattern: &Regex, original: &str) -> (String, FieldSource) {
    match first_tagged(response, pattern) {
        Some(value) => (value, FieldSource::Extracted),
        None => (original.to_string(), FieldSource::Retained),
    }
}

/// First non-empty trimmed tag body, matching across lines.
fn first_tagged(text: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|body| body.as_str().trim())
        .find(|body| !body.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{FieldSource, extract_card};
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_both_sides() {
        let extraction = extract_card("<CARD><FRONT>X</FRONT><BACK>Y</BACK></CARD>", "A", "B");
        assert_eq!((extraction.front.as_str(), extraction.back.as_str()), ("X", "Y"));
        assert_eq!(extraction.front_source, FieldSource::Extracted);
        assert_eq!(extraction.back_source, FieldSource::Extracted);
    }

    #[test]
    fn missing_back_keeps_original() {
        let extraction = extract_card("<CARD><FRONT>New</FRONT></CARD>", "A", "B");
        assert_eq!(extraction.front, "New");
        assert_eq!(extraction.back, "B");
        assert_eq!(extraction.back_source, FieldSource::Retained);
    }

    #[test]
    fn empty_tags_are_skipped() {
        let response = "<FRONT>  </FRONT><FRONT>second</FRONT><BACK>\n</BACK>";
        let extraction = extract_card(response, "A", "B");
        assert_eq!(extraction.front, "second");
        assert_eq!(extraction.back, "B");
    }

    #[test]
    fn multiline_bodies_and_surrounding_text() {
        let response = "Sure! Here you go:\n<CARD>\n<FRONT>\nWhat is $x$?\n</FRONT>\n\
                        <BACK>line one\n$$x^2$$\n</BACK>\n</CARD>\nHope this helps.";
        let extraction = extract_card(response, "A", "B");
        assert_eq!(extraction.front, "What is $x$?");
        assert_eq!(extraction.back, "line one\n$$x^2$$");
    }

    #[test]
    fn no_block_retains_everything() {
        let extraction = extract_card("I cannot do that.", "A", "B");
        assert!(extraction.is_unchanged());
        assert_eq!((extraction.front.as_str(), extraction.back.as_str()), ("A", "B"));
    }
}
