//! Cleanup of node body text before it is displayed.
//!
//! Body text is read off a buffer that may end mid-tag, and upstream
//! generators tend to indent it uniformly. Every function here is total and
//! idempotent over arbitrary input.

/// Removes a trailing partial-tag fragment.
///
/// A fragment is `<`, `</`, `<` followed by ASCII letters, or `</` followed by
/// ASCII letters, at the very end of the text. Stripping repeats until no
/// fragment remains. A `<` followed by anything else (`"a < b"`, `"x<5"`) is
/// content and stays.
///
/// # Examples
///
/// ```
/// # use trellis_parser::content::sanitize_content;
/// assert_eq!(sanitize_content("Hello </no"), "Hello ");
/// assert_eq!(sanitize_content("a < b"), "a < b");
/// ```
pub fn sanitize_content(text: &str) -> &str {
    let mut text = text;
    while let Some(stripped) = strip_partial_tag(text) {
        text = stripped;
    }
    text
}

fn strip_partial_tag(text: &str) -> Option<&str> {
    let open = text.rfind('<')?;
    let tail = &text[open + 1..];
    let name = tail.strip_prefix('/').unwrap_or(tail);
    name.bytes()
        .all(|byte| byte.is_ascii_alphabetic())
        .then(|| &text[..open])
}

/// Removes the common leading indentation from every non-blank line.
///
/// Spaces and tabs each count as one unit. Whitespace-only lines neither
/// contribute to the common width nor get modified.
///
/// # Examples
///
/// ```
/// # use trellis_parser::content::dedent_content;
/// assert_eq!(dedent_content("      a\n    b"), "  a\nb");
/// ```
pub fn dedent_content(text: &str) -> String {
    let common = text
        .split('\n')
        .filter(|line| !is_blank(line))
        .map(indent_width)
        .min();

    match common {
        None | Some(0) => text.to_string(),
        Some(width) => text
            .split('\n')
            .map(|line| if is_blank(line) { line } else { &line[width..] })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Drops leading whitespace-only lines and trailing whitespace.
pub fn trim_blank_edges(text: &str) -> &str {
    let mut start = 0;
    for line in text.split_inclusive('\n') {
        if !is_blank(line) {
            break;
        }
        start += line.len();
    }
    text[start..].trim_end()
}

/// Full cleanup applied to body text before display.
///
/// Partial-tag fragments and trailing whitespace are stripped until neither
/// remains, then blank leading lines are dropped and the text is dedented.
pub fn prepare_content(raw: &str) -> String {
    let mut text = raw;
    loop {
        let stripped = sanitize_content(text.trim_end());
        if stripped.len() == text.len() {
            break;
        }
        text = stripped;
    }
    dedent_content(trim_blank_edges(text))
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn indent_width(line: &str) -> usize {
    line.bytes()
        .take_while(|byte| matches!(byte, b' ' | b'\t'))
        .count()
}
