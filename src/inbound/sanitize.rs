//! Body sanitization — quote stripping and HTML-to-text.
//!
//! Quote stripping is a single forward pass: the first line that looks
//! like the start of quoted material ends the message. Nothing after it
//! is kept, even if it looks like fresh content.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::inbound::types::NO_CONTENT_PLACEHOLDER;

/// Patterns that mark the start of quoted reply content, tested in order.
fn quote_markers() -> &'static [Regex] {
    static MARKERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MARKERS.get_or_init(|| {
        [
            // "On Mon, Jan 1, 2026 at 10:00 AM Alice <alice@ex.com> wrote:"
            r"^On\s.*wrote:$",
            r"^>",
            r"^(From|Sent|To|Subject|Date):",
            r"(?i)^-{4,}\s*Original Message\s*-{4,}",
            r"^_{10,}",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid quote marker regex"))
        .collect()
    })
}

/// True when `line` (already right-trimmed) opens a quoted block.
pub fn is_quote_marker(line: &str) -> bool {
    quote_markers().iter().any(|re| re.is_match(line))
}

/// Strip quoted-reply content and normalize the result.
///
/// Markers only count at the start of a line. The final trim can bring an
/// indented marker (`"  > y"`) to column 0, so a second pass over the
/// output may cut more than the first one did.
///
/// Returns the placeholder text when nothing is left.
pub fn strip_quoted_reply(body: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for line in body.split('\n') {
        let line = line.trim_end();
        if is_quote_marker(line) {
            break;
        }
        kept.push(line);
    }

    let cleaned = kept.join("\n");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        NO_CONTENT_PLACEHOLDER.to_string()
    } else {
        cleaned.to_string()
    }
}

// ── HTML ────────────────────────────────────────────────────────────

struct HtmlPatterns {
    line_break: Regex,
    paragraph_end: Regex,
    div_end: Regex,
    tag: Regex,
    blank_run: Regex,
    entity: Regex,
}

fn html_patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| HtmlPatterns {
        line_break: Regex::new(r"(?i)<br\s*/?>").expect("valid br regex"),
        paragraph_end: Regex::new(r"(?i)</p>").expect("valid p regex"),
        div_end: Regex::new(r"(?i)</div>").expect("valid div regex"),
        tag: Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"),
        blank_run: Regex::new(r"\n{3,}").expect("valid newline regex"),
        entity: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,31});")
            .expect("valid entity regex"),
    })
}

/// Convert an HTML body to plain text.
///
/// `<br>` becomes a newline, `</p>` a paragraph break, `</div>` a newline.
/// Remaining tags are dropped, entities decoded, and runs of three or more
/// newlines collapsed to two.
pub fn html_to_text(html: &str) -> String {
    let p = html_patterns();
    let text = p.line_break.replace_all(html, "\n");
    let text = p.paragraph_end.replace_all(&text, "\n\n");
    let text = p.div_end.replace_all(&text, "\n");
    let text = p.tag.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = p.blank_run.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Decode numeric and common named HTML entities. Unknown ones are kept.
pub fn decode_entities(text: &str) -> String {
    html_patterns()
        .entity
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            decode_entity(name).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }

    let ch = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "bull" => '•',
        "middot" => '·',
        "euro" => '€',
        "pound" => '£',
        "yen" => '¥',
        "cent" => '¢',
        "deg" => '°',
        "times" => '×',
        "divide" => '÷',
        "sect" => '§',
        "para" => '¶',
        _ => return None,
    };
    Some(ch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Quote stripping ─────────────────────────────────────────

    #[test]
    fn strips_on_wrote_attribution_and_rest() {
        let body = "Hello\nOn Jan 1 John wrote:\n> old text";
        assert_eq!(strip_quoted_reply(body), "Hello");
    }

    #[test]
    fn keeps_blank_lines_before_quote() {
        let body = "Line1\n\nLine2\n> quoted";
        assert_eq!(strip_quoted_reply(body), "Line1\n\nLine2");
    }

    #[test]
    fn content_after_marker_is_dropped() {
        let body = "Top reply\n> quoted\nThis looks new but is gone";
        assert_eq!(strip_quoted_reply(body), "Top reply");
    }

    #[test]
    fn header_block_markers() {
        for marker in ["From: a@b.c", "Sent: Monday", "To: x", "Subject: Re", "Date: today"] {
            let body = format!("Reply text\n{marker}\nold");
            assert_eq!(strip_quoted_reply(&body), "Reply text", "marker {marker:?}");
        }
    }

    #[test]
    fn header_markers_are_case_sensitive() {
        let body = "from: me, obviously\nstill mine";
        assert_eq!(strip_quoted_reply(body), body);
    }

    #[test]
    fn original_message_separator() {
        let body = "My reply\n\n----- Original Message -----\nOld stuff here";
        assert_eq!(strip_quoted_reply(body), "My reply");
    }

    #[test]
    fn short_dash_run_is_not_a_separator() {
        let body = "My reply\n--- Original Message ---\nStill here";
        assert_eq!(strip_quoted_reply(body), body);
    }

    #[test]
    fn underscore_separator() {
        let body = "Thanks\n________________\nFrom Outlook";
        assert_eq!(strip_quoted_reply(body), "Thanks");
        let body = "Fill in: _____";
        assert_eq!(strip_quoted_reply(body), body);
    }

    #[test]
    fn indented_quote_prefix_is_kept() {
        let body = "Code:\n  > not a quote";
        assert_eq!(strip_quoted_reply(body), body);
    }

    #[test]
    fn leading_indented_marker_surfaces_after_trim() {
        let once = strip_quoted_reply("  > y\nz");
        assert_eq!(once, "> y\nz");
        assert_eq!(strip_quoted_reply(&once), NO_CONTENT_PLACEHOLDER);
    }

    #[test]
    fn crlf_line_endings() {
        let body = "Hi there\r\n\r\nBye\r\n> quoted\r\n";
        assert_eq!(strip_quoted_reply(body), "Hi there\n\nBye");
    }

    #[test]
    fn trailing_whitespace_trimmed_per_line() {
        let body = "Hello   \nWorld\t";
        assert_eq!(strip_quoted_reply(body), "Hello\nWorld");
    }

    #[test]
    fn empty_result_gets_placeholder() {
        assert_eq!(strip_quoted_reply(""), NO_CONTENT_PLACEHOLDER);
        assert_eq!(strip_quoted_reply("   \n\n  "), NO_CONTENT_PLACEHOLDER);
        assert_eq!(strip_quoted_reply("> only quoted"), NO_CONTENT_PLACEHOLDER);
    }

    #[test]
    fn sanitizing_is_idempotent() {
        let once = strip_quoted_reply("  First\n\nSecond line  \n\n");
        assert_eq!(strip_quoted_reply(&once), once);
        let placeholder = strip_quoted_reply("");
        assert_eq!(strip_quoted_reply(&placeholder), placeholder);
    }

    // ── HTML ────────────────────────────────────────────────────

    #[test]
    fn html_paragraph_and_break() {
        let text = html_to_text("<p>Hi</p><br>Bye");
        assert_eq!(text, "Hi\n\nBye");
        assert!(!text.contains('<'));
    }

    #[test]
    fn html_self_closing_break_and_div() {
        assert_eq!(html_to_text("a<br/>b<BR />c"), "a\nb\nc");
        assert_eq!(html_to_text("<div>one</div><div>two</div>"), "one\ntwo");
    }

    #[test]
    fn html_strips_tags_with_attributes() {
        assert_eq!(
            html_to_text(r#"<a href="https://example.com">Link</a> and <b>bold</b>"#),
            "Link and bold"
        );
    }

    #[test]
    fn html_collapses_newline_runs() {
        assert_eq!(html_to_text("<p>A</p><p></p><p>B</p>"), "A\n\nB");
    }

    #[test]
    fn html_decodes_entities() {
        assert_eq!(
            html_to_text("&amp; &lt; &gt; &quot; &#39; &#x263A;"),
            "& < > \" ' \u{263a}"
        );
    }

    #[test]
    fn unknown_entity_left_verbatim() {
        assert_eq!(decode_entities("&bogus; &amp;"), "&bogus; &");
    }

    #[test]
    fn invalid_code_point_left_verbatim() {
        assert_eq!(decode_entities("&#xD800;"), "&#xD800;");
    }

    #[test]
    fn html_then_quote_stripping() {
        let html = "<div>Thanks!</div><div>On Tue, Bob wrote:</div><blockquote>old</blockquote>";
        let text = html_to_text(html);
        assert_eq!(strip_quoted_reply(&text), "Thanks!");
    }
}
