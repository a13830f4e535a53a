//! Content sanitizing for user-supplied message text.
//!
//! Chat content is free-form text that may arrive carrying HTML. The
//! pipeline truncates first (bounding sanitizer work on hostile input)
//! and then strips every tag and attribute, keeping only visible text.

/// Maximum message content length in characters
pub const MAX_CONTENT_LENGTH: usize = 5000;

/// Truncate to `max_len` characters, then strip all HTML markup.
///
/// Tags and their attributes are removed entirely; the text inside
/// `<script>` and `<style>` elements is dropped since it was never
/// visible. Basic named entities are decoded so stripped text reads the
/// way the client rendered it.
pub fn sanitize_content(text: &str, max_len: usize) -> String {
    let truncated = truncate_chars(text, max_len);
    let stripped = strip_tags(&truncated);
    decode_entities(&stripped)
}

/// Truncate to at most `max_len` characters, never splitting a code point
fn truncate_chars(text: &str, max_len: usize) -> &str {
    match text.char_indices().nth(max_len) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Remove all `<...>` tag spans, dropping script/style element bodies
fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];

        let Some(close) = rest.find('>') else {
            // Unterminated tag: treat the remainder as markup and drop it
            return out;
        };

        let tag = &rest[1..close];
        rest = &rest[close + 1..];

        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        // Invisible element bodies are skipped up to their closing tag
        if (name == "script" || name == "style") && !tag.starts_with('/') {
            let closing = format!("</{name}");
            if let Some(end) = rest.to_ascii_lowercase().find(&closing) {
                rest = &rest[end..];
                if let Some(close) = rest.find('>') {
                    rest = &rest[close + 1..];
                } else {
                    return out;
                }
            } else {
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode the basic named/numeric entities HTML-encoded clients emit
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
