//! Plain-text extraction for HTML descriptions coming from the catalog API.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BLOCK_TAG_REGEX: Regex =
        Regex::new(r"(?i)<\s*(br|/p|/div|/li|/h[1-6])\s*/?\s*>").expect("Invalid regex pattern");
    static ref TAG_REGEX: Regex = Regex::new(r"<[^>]*>").expect("Invalid regex pattern");
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"[ \t\r\f\v]+").expect("Invalid regex pattern");
    static ref BLANK_LINES_REGEX: Regex = Regex::new(r"\n\s*\n+").expect("Invalid regex pattern");
}

/// Strips tags and decodes the common entities, keeping paragraph breaks as
/// newlines.
pub fn strip_html(input: &str) -> String {
    let with_breaks = BLOCK_TAG_REGEX.replace_all(input, "\n");
    let without_tags = TAG_REGEX.replace_all(&with_breaks, "");
    let decoded = decode_entities(&without_tags);
    let collapsed = WHITESPACE_REGEX.replace_all(&decoded, " ");
    let collapsed = BLANK_LINES_REGEX.replace_all(&collapsed, "\n");

    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(input: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;"
    input
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_simple_markup() {
        assert_eq!(
            strip_html("<p>Live at <strong>Bingu</strong> Stadium</p>"),
            "Live at Bingu Stadium"
        );
    }

    #[test]
    fn test_paragraphs_become_lines() {
        assert_eq!(
            strip_html("<p>Doors 6pm</p><p>Show 8pm</p>"),
            "Doors 6pm\nShow 8pm"
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(strip_html("Food &amp; Drinks&nbsp;included"), "Food & Drinks included");
        assert_eq!(strip_html("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(strip_html("No markup here"), "No markup here");
    }
}
