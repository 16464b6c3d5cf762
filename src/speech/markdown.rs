//! Markdown → plain text for the speech synthesizer.
//!
//! Advice arrives as Markdown; read aloud, `##` and `**` come out as noise.
//! Only the inline and line-level markup the model actually emits is handled.

/// Remove headings, emphasis, code ticks, link targets and list bullets,
/// keeping the words and line structure.
///
/// ```rust
/// use kisan_mitra::speech::speakable_text;
///
/// let md = "## Neem oil\n- Spray **every 7 days**\n- See [guide](https://example.org)";
/// assert_eq!(speakable_text(md), "Neem oil\nSpray every 7 days\nSee guide");
/// ```
pub fn speakable_text(markdown: &str) -> String {
    markdown
        .lines()
        .map(strip_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_line(line: &str) -> String {
    let mut line = line.trim();

    if line.chars().all(|c| matches!(c, '-' | '*' | '_' | ' ')) {
        return String::new(); // horizontal rule or blank
    }

    line = line.trim_start_matches('#').trim_start();
    line = line.trim_start_matches('>').trim_start();
    for bullet in ["- ", "* ", "+ ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            line = rest;
            break;
        }
    }

    strip_inline(line).trim().to_string()
}

/// Drop `*`, `_` and backticks, and turn `[text](url)` into `text`.
fn strip_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' | '`' => {}
            // Underscores inside words (snake_case, file names) are kept.
            '_' if out.chars().last().map_or(true, |p| !p.is_alphanumeric())
                || chars.peek().map_or(true, |n| !n.is_alphanumeric()) => {}
            ']' if chars.peek() == Some(&'(') => {
                for skipped in chars.by_ref() {
                    if skipped == ')' {
                        break;
                    }
                }
            }
            '[' => {}
            _ => out.push(c),
        }
    }
    out
}
