//! Message documents exported as UTF-8 text renderings.

use std::path::Path;

use encoding_rs::Encoding;
use tracing::warn;

use crate::error::Result;
use crate::model::document::DocId;
use crate::source::MailboxSource;

use super::write_new_file;

/// Render a message body and write it to `<doc_id>.txt`.
///
/// Returns the file name relative to `output_dir`. An unreadable body is
/// exported as an empty file.
pub fn export_message_text<S: MailboxSource>(
    source: &S,
    message: &S::Message,
    id: DocId,
    output_dir: &Path,
    fallback: &'static Encoding,
) -> Result<String> {
    let text = source.body_text(message).unwrap_or_else(|e| {
        warn!(doc_id = %id, error = %e, "Unreadable message body; exporting empty text");
        Vec::new()
    });
    let html = source.body_html(message).unwrap_or_else(|e| {
        warn!(doc_id = %id, error = %e, "Unreadable HTML body; ignoring");
        None
    });

    let rendered = render_body(&text, html.as_deref(), fallback);
    let file_name = format!("{id}.txt");
    write_new_file(&output_dir.join(&file_name), rendered.as_bytes())?;
    Ok(file_name)
}

/// Plain body if it has content, else the HTML body converted to text.
pub fn render_body(text: &[u8], html: Option<&[u8]>, fallback: &'static Encoding) -> String {
    let plain = decode_text(text, fallback);
    if !plain.trim().is_empty() {
        return plain;
    }
    match html {
        Some(html) => html_to_text(&decode_text(html, fallback)),
        None => plain,
    }
}

/// Decode body bytes: BOM first, then UTF-8, then `fallback`.
pub fn decode_text(bytes: &[u8], fallback: &'static Encoding) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (decoded, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return decoded.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _) = fallback.decode_without_bom_handling(bytes);
            decoded.into_owned()
        }
    }
}

/// Tags that start a new line in the rendering.
const LINE_BREAK_TAGS: &[&str] = &[
    "br", "p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6", "table", "blockquote",
];

/// Tags whose content is never rendered.
const HIDDEN_TAGS: &[&str] = &["script", "style", "head", "title"];

/// Convert an HTML body to plain text in one pass.
///
/// Tag names are matched case-insensitively. Block tags become line breaks,
/// hidden blocks and comments are dropped, entities (named and numeric)
/// are decoded once, and runs of blank lines collapse to one.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(pos) = rest.find(['<', '&']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('&') {
            match decode_entity(rest) {
                Some((ch, len)) => {
                    out.push(ch);
                    rest = &rest[len..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            }
            continue;
        }

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }

        let Some(end) = rest.find('>') else {
            // Unterminated tag: drop the remainder.
            rest = "";
            break;
        };
        let name = tag_name(&rest[1..end]);
        let closing = rest[1..].starts_with('/');
        rest = &rest[end + 1..];

        if !closing && HIDDEN_TAGS.contains(&name.as_str()) {
            rest = skip_past_close(rest, &name);
        } else if LINE_BREAK_TAGS.contains(&name.as_str()) {
            out.push('\n');
        }
    }
    out.push_str(rest);

    collapse_blank_lines(&out)
}

/// Lowercased element name of a tag body such as `/P class="x"`.
fn tag_name(body: &str) -> String {
    body.trim_start_matches('/')
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Skip to just after `</name ...>`, or to the end if it never closes.
fn skip_past_close<'a>(html: &'a str, name: &str) -> &'a str {
    let lower = html.to_ascii_lowercase();
    let close = format!("</{name}");
    match lower.find(&close) {
        Some(start) => html[start..].find('>').map_or("", |end| &html[start + end + 1..]),
        None => "",
    }
}

/// Decode the entity at the start of `s`; returns the character and the
/// number of bytes consumed.
fn decode_entity(s: &str) -> Option<(char, usize)> {
    let semi = s.bytes().take(12).position(|b| b == b';')?;
    let body = &s[1..semi];
    let ch = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let digits = body.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            match char::from_u32(code)? {
                '\u{a0}' => ' ',
                c => c,
            }
        }
    };
    Some((ch, semi + 1))
}

fn collapse_blank_lines(text: &str) -> String {
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("caf\u{e9}".as_bytes(), WINDOWS_1252), "café");
    }

    #[test]
    fn test_decode_utf16le_bom() {
        let bytes = [0xFF, 0xFE, b'h', 0, b'i', 0];
        assert_eq!(decode_text(&bytes, WINDOWS_1252), "hi");
    }

    #[test]
    fn test_decode_falls_back() {
        assert_eq!(decode_text(b"caf\xe9", WINDOWS_1252), "café");
    }

    #[test]
    fn test_render_prefers_plain_body() {
        let out = render_body(b"plain", Some(b"<p>html</p>"), WINDOWS_1252);
        assert_eq!(out, "plain");
    }

    #[test]
    fn test_render_uses_html_when_plain_empty() {
        let out = render_body(b"  \r\n", Some(b"<p>Hello &amp; bye</p>"), WINDOWS_1252);
        assert_eq!(out, "Hello & bye");
        assert_eq!(render_body(b"", None, WINDOWS_1252), "");
    }

    #[test]
    fn test_html_to_text_basic() {
        let html = "<html><body><p>Hello</p><p>World</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_html_to_text_removes_scripts() {
        let html = "<p>Before</p><SCRIPT>alert('x')</SCRIPT><style>p{}</style><p>After</p>";
        let text = html_to_text(html);
        assert!(!text.contains("alert"));
        assert!(!text.contains("p{}"));
        assert!(text.contains("Before"));
        assert!(text.contains("After"));
    }

    #[test]
    fn test_html_entities_not_double_decoded() {
        assert_eq!(html_to_text("a &amp;lt; b"), "a &lt; b");
    }

    #[test]
    fn test_html_numeric_entities_and_stray_ampersand() {
        assert_eq!(html_to_text("caf&#233; &#x263A; &#160;x"), "café \u{263a}  x");
        assert_eq!(html_to_text("R&D & more &bogus;"), "R&D & more &bogus;");
    }

    #[test]
    fn test_html_mixed_case_tags_and_attributes() {
        let html = "<Div class=\"a\">One</DIV><P ALIGN=left>Two<Br/>Three</p><!-- <p>hidden</p> -->";
        assert_eq!(html_to_text(html), "One\n\nTwo\nThree");
    }

    #[test]
    fn test_html_unterminated_hidden_block_drops_rest() {
        assert_eq!(html_to_text("Shown<script>var x = '<p>';"), "Shown");
    }
}
