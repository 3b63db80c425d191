//! Terminal output sanitization
//!
//! Titles and summaries come straight from log files. Before they are printed by the CLI
//! they pass through [`sanitize_line`] so escape sequences embedded in a conversation
//! cannot move the cursor, recolor the terminal or break the one-line-per-entry layout.

/// Strips ANSI escape sequences and control characters, folding line breaks into spaces
///
/// # Examples
///
/// ```
/// use conversation_scanner::utils::terminal::sanitize_line;
///
/// assert_eq!(sanitize_line("\x1b[31mFix\x1b[0m\nlogin"), "Fix login");
/// ```
pub fn sanitize_line(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        // CSI sequence: ESC [ params final-letter
        if ch == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(next_ch) = chars.next() {
                    if next_ch.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }

        if matches!(ch, '\n' | '\r' | '\t') {
            if !result.ends_with(' ') {
                result.push(' ');
            }
            continue;
        }

        if ch.is_control() {
            continue;
        }

        result.push(ch);
    }

    result.trim().to_string()
}
