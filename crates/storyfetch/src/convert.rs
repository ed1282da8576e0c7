//! HTML stripping utilities

/// Elements whose content is never text
const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "svg"];

/// Elements that end a line of text
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "hr", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "center",
];

/// Strip markup from an HTML fragment, leaving plain text
///
/// Block elements become line breaks, entities are decoded and whitespace
/// runs are collapsed. Paragraph breaks survive as a single blank line.
pub fn strip_html(html: &str) -> String {
    let mut output = String::new();
    let mut skip_elements: Vec<String> = Vec::new();

    let mut chars = html.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            // Only `<` followed by a name, `/` or `!` opens a tag
            let opens_tag = chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!'));
            if !opens_tag {
                if skip_elements.is_empty() {
                    output.push('<');
                }
                continue;
            }

            let mut tag = String::new();
            let mut closed = false;
            for next in chars.by_ref() {
                if next == '>' {
                    closed = true;
                    break;
                }
                tag.push(next);
            }

            if !closed {
                if skip_elements.is_empty() {
                    output.push('<');
                    output.push_str(&tag);
                }
                break;
            }

            let tag_lower = tag.to_lowercase();
            let is_closing = tag_lower.starts_with('/');
            let tag_name = tag_lower
                .trim_start_matches('/')
                .split(|ch: char| ch.is_whitespace() || ch == '/')
                .next()
                .unwrap_or("");

            if SKIP_TAGS.contains(&tag_name) {
                if is_closing {
                    if let Some(pos) = skip_elements.iter().rposition(|t| t == tag_name) {
                        skip_elements.remove(pos);
                    }
                } else if !tag.ends_with('/') {
                    skip_elements.push(tag_name.to_string());
                }
                continue;
            }

            if !skip_elements.is_empty() {
                continue;
            }

            if BLOCK_TAGS.contains(&tag_name) {
                // Opening <p> too, so paragraphs end up a blank line apart
                if is_closing || matches!(tag_name, "br" | "hr" | "p") {
                    output.push('\n');
                }
            }
        } else if skip_elements.is_empty() {
            output.push(decode_entity(c, &mut chars));
        }
    }

    clean_whitespace(&output)
}

/// Decode HTML entity starting from ampersand
fn decode_entity(c: char, chars: &mut std::iter::Peekable<std::str::Chars>) -> char {
    if c != '&' {
        return c;
    }

    // Only consume up to the terminating ';' when the entity is well formed
    let lookahead: String = chars.clone().take(12).collect();
    let Some(end) = lookahead.find(';') else {
        return '&';
    };
    let entity = &lookahead[..end];
    if entity.is_empty() || entity.chars().any(char::is_whitespace) {
        return '&';
    }

    let decoded = match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        "hellip" => Some('…'),
        "lsquo" => Some('‘'),
        "rsquo" => Some('’'),
        "ldquo" => Some('“'),
        "rdquo" => Some('”'),
        _ => entity.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };

    match decoded {
        Some(ch) => {
            // Skip the entity body and the ';'
            for _ in 0..=entity.chars().count() {
                chars.next();
            }
            ch
        }
        None => '&',
    }
}

/// Clean whitespace: collapse runs, trim, keep max 2 newlines
pub fn clean_whitespace(s: &str) -> String {
    let mut result = String::new();
    let mut last_was_space = false;
    let mut newline_count = 0;

    for c in s.chars() {
        if c == '\n' {
            if last_was_space && result.ends_with(' ') {
                result.pop();
            }
            newline_count += 1;
            last_was_space = true;
            if newline_count <= 2 {
                result.push(c);
            }
        } else if c.is_whitespace() {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            newline_count = 0;
            last_was_space = false;
            result.push(c);
        }
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html_paragraphs() {
        let text = strip_html("<p>Hello</p><p>World</p>");
        assert_eq!(text, "Hello\n\nWorld");
    }

    #[test]
    fn test_strip_html_inline_markup() {
        let text = strip_html("A <em>very</em> <strong>bold</strong> claim");
        assert_eq!(text, "A very bold claim");
    }

    #[test]
    fn test_strip_html_skips_script() {
        let html = "<p>Before</p><script>alert('bad');</script><p>After</p>";
        let text = strip_html(html);
        assert!(text.contains("Before"));
        assert!(text.contains("After"));
        assert!(!text.contains("alert"));
    }

    #[test]
    fn test_entity_decoding() {
        let text = strip_html("<p>&amp; &lt; &gt; &quot; &#39; &mdash; &#x41;</p>");
        assert_eq!(text, "& < > \" ' — A");
    }

    #[test]
    fn test_bare_ampersand_kept() {
        assert_eq!(strip_html("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(strip_html("R&D;"), "R&D;");
    }

    #[test]
    fn test_stray_angle_brackets_kept() {
        assert_eq!(strip_html("I <3 this pairing"), "I <3 this pairing");
        assert_eq!(strip_html("<p>a < b and c > d</p>"), "a < b and c > d");
        assert_eq!(strip_html("Cliffhanger <grin"), "Cliffhanger <grin");
        assert_eq!(strip_html("<p>Kept</p><!-- note -->"), "Kept");
    }

    #[test]
    fn test_clean_whitespace() {
        let input = "  hello   world  \n\n\n\n  test  ";
        assert_eq!(clean_whitespace(input), "hello world\n\ntest");
    }
}
