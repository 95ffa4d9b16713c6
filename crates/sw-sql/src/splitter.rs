//! Splitting script text into individually executable commands.
//!
//! Two styles exist across engines: a batch separator that must sit alone on
//! its own line (`GO` for SQL Server, a lone `;` for SQLite), and a statement
//! terminator that can appear anywhere (`;` for PostgreSQL and DuckDB). Both
//! scanners ignore separators inside string literals, quoted identifiers and
//! comments. Returned commands are trimmed and never empty.
//!
//! All delimiters are ASCII, so scanning bytes never lands inside a
//! multi-byte character and every slice boundary is a char boundary.

/// Split on a separator that occupies a whole line (case-insensitive).
pub fn split_on_batch_separator(text: &str, separator: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut commands = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if i == 0 || bytes[i - 1] == b'\n' {
            let line_end = find_line_end(bytes, i);
            if text[i..line_end].trim().eq_ignore_ascii_case(separator) {
                push_command(&mut commands, &text[start..i]);
                start = line_end;
                i = line_end;
                continue;
            }
        }

        i = match bytes[i] {
            b'\'' | b'"' | b'`' => skip_quoted(bytes, i, bytes[i]),
            b'[' => skip_quoted(bytes, i, b']'),
            b'-' if bytes.get(i + 1) == Some(&b'-') => find_line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_block_comment(bytes, i),
            _ => i + 1,
        };
    }

    push_command(&mut commands, &text[start..]);
    commands
}

/// Split on `;` wherever it appears outside literals and comments.
///
/// With `dollar_quotes` set, PostgreSQL `$tag$ ... $tag$` bodies are treated
/// as literals so function definitions stay in one piece.
pub fn split_on_terminator(text: &str, dollar_quotes: bool) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut commands = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        i = match bytes[i] {
            b';' => {
                push_command(&mut commands, &text[start..i]);
                start = i + 1;
                i + 1
            }
            b'\'' | b'"' => skip_quoted(bytes, i, bytes[i]),
            b'-' if bytes.get(i + 1) == Some(&b'-') => find_line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => skip_block_comment(bytes, i),
            b'$' if dollar_quotes => skip_dollar_quoted(bytes, i),
            _ => i + 1,
        };
    }

    push_command(&mut commands, &text[start..]);
    commands
}

fn push_command(commands: &mut Vec<String>, command: &str) {
    let trimmed = command.trim();
    if !trimmed.is_empty() {
        commands.push(trimmed.to_string());
    }
}

/// Index of the next `\n` at or after `from`, or the end of input.
fn find_line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

/// Skip a literal opened at `open`; a doubled closing byte is an escape.
fn skip_quoted(bytes: &[u8], open: usize, close: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        if bytes[i] == close {
            if bytes.get(i + 1) == Some(&close) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Skip a `/* */` comment, honoring nesting.
fn skip_block_comment(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut i = open;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Skip a `$tag$ ... $tag$` literal; a `$` that does not open one is plain text.
fn skip_dollar_quoted(bytes: &[u8], open: usize) -> usize {
    let mut tag_end = open + 1;
    while tag_end < bytes.len() && (bytes[tag_end].is_ascii_alphanumeric() || bytes[tag_end] == b'_')
    {
        tag_end += 1;
    }
    let opens_literal = tag_end < bytes.len()
        && bytes[tag_end] == b'$'
        && !bytes.get(open + 1).is_some_and(|b| b.is_ascii_digit());
    if !opens_literal {
        return open + 1;
    }

    let tag = &bytes[open..=tag_end];
    let body = tag_end + 1;
    bytes[body..]
        .windows(tag.len())
        .position(|w| w == tag)
        .map_or(bytes.len(), |p| body + p + tag.len())
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod tests;
