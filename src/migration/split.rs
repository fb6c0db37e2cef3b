//! SQL statement splitting
//!
//! Migration files hold several semicolon-terminated statements, but the
//! warehouse's query endpoint runs one statement per request. Splitting is a
//! character-level state machine so a `;` inside a string literal or a `--`
//! line comment never ends a statement.

/// Split SQL text into individual executable statements.
///
/// Semicolons inside single- or double-quoted runs (with backslash escapes)
/// and inside `--` line comments are not boundaries. A trailing statement
/// without a terminating semicolon is kept. Statement text is trimmed;
/// empty fragments are dropped.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut string_char = '\0';
    let mut in_comment = false;

    let chars: Vec<char> = sql.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];

        if (c == '\'' || c == '"') && !in_comment {
            if !in_string {
                in_string = true;
                string_char = c;
            } else if c == string_char && (i == 0 || chars[i - 1] != '\\') {
                in_string = false;
                string_char = '\0';
            }
        } else if !in_string {
            if !in_comment && c == '-' && chars.get(i + 1) == Some(&'-') {
                in_comment = true;
            } else if in_comment && c == '\n' {
                in_comment = false;
            }
        }

        if c == ';' && !in_string && !in_comment {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }

        i += 1;
    }

    let trailing = current.trim();
    if !trailing.is_empty() {
        statements.push(trailing.to_string());
    }

    statements
}
