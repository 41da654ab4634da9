//! Lexical guard that rejects non-read-only SQL before it reaches the
//! engine.
//!
//! The scan works on a scrubbed copy of the statement: comments, string
//! literals, and quoted identifiers are blanked first, so `SELECT
//! created_at FROM t` or `SELECT 'drop table'` never trip the keyword
//! checks, while `WITH x AS (...) INSERT INTO ...` still does.

use crate::error::ToolError;

/// Statement heads accepted as read-only query forms.
const QUERY_HEADS: &[&str] = &["select", "with", "values"];

/// Tokens that mark data- or schema-modification. Checked as whole words
/// anywhere in the statement; `WITH` can prefix DML in SQLite, so a head
/// check alone is not enough.
const WRITE_VERBS: &[&str] = &[
    "insert", "into", "update", "delete", "drop", "alter", "create", "attach", "detach", "pragma",
    "vacuum", "reindex", "analyze", "begin", "commit", "rollback", "savepoint",
];

/// Reject anything that is not a single read-only statement.
pub fn ensure_read_only(sql: &str) -> Result<(), ToolError> {
    let scrubbed = scrub(sql);
    let tokens = tokenize(&scrubbed);

    let Some(first) = tokens.first() else {
        return Err(ToolError::DisallowedOperation(
            "no SQL statement found".into(),
        ));
    };

    if !QUERY_HEADS.contains(&first.as_str()) {
        return Err(ToolError::DisallowedOperation(format!(
            "only read-only SELECT queries are permitted (statement starts with '{first}')"
        )));
    }

    // One trailing semicolon is tolerated; anything after it is chaining.
    if let Some(idx) = scrubbed.find(';') {
        if !scrubbed[idx + 1..].trim().is_empty() {
            return Err(ToolError::MultipleStatements);
        }
    }

    if let Some(verb) = tokens.iter().find(|t| WRITE_VERBS.contains(&t.as_str())) {
        return Err(ToolError::DisallowedOperation(format!(
            "write operations are not permitted (found '{verb}')"
        )));
    }

    Ok(())
}

/// Blank out comments, string literals, and quoted identifiers.
fn scrub(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
                out.push(' ');
            }
            '\'' | '"' | '`' => {
                skip_quoted(&mut chars, c);
                out.push(' ');
            }
            '[' => {
                for n in chars.by_ref() {
                    if n == ']' {
                        break;
                    }
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Consume a quoted region; a doubled quote is an escaped quote.
fn skip_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) {
    while let Some(c) = chars.next() {
        if c == quote {
            if chars.peek() == Some(&quote) {
                chars.next();
            } else {
                break;
            }
        }
    }
}

/// Lowercased word tokens of a scrubbed statement.
fn tokenize(scrubbed: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in scrubbed.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            current.push(c.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
