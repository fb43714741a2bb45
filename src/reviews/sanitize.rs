//! Whitelist HTML sanitizer for review/comment text.
//!
//! Only plain formatting tags survive, with their attributes stripped.
//! Everything else, including the tag markup itself, is escaped.

use regex::Regex;
use std::sync::OnceLock;

pub const ALLOWED_TAGS: &[&str] = &[
    "p",
    "br",
    "em",
    "strong",
    "i",
    "b",
    "ul",
    "ol",
    "li",
    "blockquote",
];

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"</?([a-zA-Z][a-zA-Z0-9]*)[^>]*>").unwrap())
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn sanitize_html(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut last_end = 0;
    for captures in tag_regex().captures_iter(input) {
        let whole = captures.get(0).unwrap();
        let tag_name = captures.get(1).unwrap().as_str().to_ascii_lowercase();
        output.push_str(&escape_html(&input[last_end..whole.start()]));
        if ALLOWED_TAGS.contains(&tag_name.as_str()) {
            // Re-emit the tag normalized, attributes dropped
            let closing = whole.as_str().starts_with("</");
            if closing {
                output.push_str(&format!("</{}>", tag_name));
            } else {
                output.push_str(&format!("<{}>", tag_name));
            }
        } else {
            output.push_str(&escape_html(whole.as_str()));
        }
        last_end = whole.end();
    }
    output.push_str(&escape_html(&input[last_end..]));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_tags_pass_through() {
        assert_eq!(
            sanitize_html("<p>hi <em>there</em></p>"),
            "<p>hi <em>there</em></p>"
        );
        assert_eq!(sanitize_html("line<br>break"), "line<br>break");
    }

    #[test]
    fn disallowed_tags_are_escaped() {
        assert_eq!(
            sanitize_html("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
        assert_eq!(sanitize_html("<a href=\"x\">link</a>"), "&lt;a href=\"x\"&gt;link&lt;/a&gt;");
    }

    #[test]
    fn attributes_are_stripped_from_allowed_tags() {
        assert_eq!(
            sanitize_html("<p class=\"big\" onclick=\"evil()\">x</p>"),
            "<p>x</p>"
        );
    }

    #[test]
    fn plain_text_special_chars_are_escaped() {
        assert_eq!(sanitize_html("AC/DC & friends"), "AC/DC &amp; friends");
        assert_eq!(sanitize_html("1 < 2 > 0"), "1 &lt; 2 &gt; 0");
    }

    #[test]
    fn tag_case_is_normalized() {
        assert_eq!(sanitize_html("<P>x</P>"), "<p>x</p>");
        assert_eq!(sanitize_html("<STRONG>x</STRONG>"), "<strong>x</strong>");
    }
}
