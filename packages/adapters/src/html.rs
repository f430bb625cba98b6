//! Minimal HTML helpers for the edit wrapper.

/// Escape text for use in element content and double-quoted attributes.
pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// ` name="value"`, escaped.
pub(crate) fn attr(name: &str, value: &str) -> String {
    format!(" {}=\"{}\"", name, escape(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_quotes() {
        assert_eq!(escape(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;");
        assert_eq!(escape("plain"), "plain");
        assert_eq!(attr("id", "a\"b"), " id=\"a&quot;b\"");
    }
}
