//! DDL object extraction
//!
//! Recovers the tables and views a migration creates, in creation order, so
//! rollback can drop them without a hand-maintained object list. The scanner
//! is a small character-level state machine (normal / line comment / string
//! literal / quoted identifier) rather than a regex, so `CREATE TABLE` text
//! inside a comment or a string literal is never mistaken for a real
//! statement.

use std::fmt;

/// Kind of schema object a migration can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    /// The DDL keyword for this kind, as used in `CREATE`/`DROP` statements.
    #[must_use]
    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One object recovered from DDL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedObject {
    pub kind: ObjectKind,
    /// Qualified name exactly as written (quoted identifiers keep quotes)
    pub name: String,
    /// Position among the objects found in the text, first statement first
    pub position: usize,
}

enum Mode {
    Normal,
    LineComment,
    StringLiteral,
    QuotedIdentifier,
}

/// Extract every object the given SQL text creates, in order of appearance.
///
/// Recognizes `CREATE [OR REPLACE] TABLE|VIEW [IF NOT EXISTS] <name>` with
/// case-insensitive keywords, only when `CREATE` opens a statement.
/// Statements of any other shape (INSERT, ALTER, COMMENT, ...) contribute
/// nothing and are not errors.
#[must_use]
pub fn extract_objects(sql: &str) -> Vec<ExtractedObject> {
    let mut objects = Vec::new();
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;

    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match mode {
            Mode::Normal => match c {
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    end_token(&mut current, &mut tokens);
                    mode = Mode::LineComment;
                }
                '\'' => {
                    end_token(&mut current, &mut tokens);
                    mode = Mode::StringLiteral;
                }
                '"' => {
                    current.push(c);
                    mode = Mode::QuotedIdentifier;
                }
                ';' => {
                    end_token(&mut current, &mut tokens);
                    finish_statement(&mut tokens, &mut objects);
                }
                c if c.is_whitespace() || matches!(c, '(' | ')' | ',') => {
                    end_token(&mut current, &mut tokens);
                }
                c => current.push(c),
            },
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Normal;
                }
            }
            Mode::StringLiteral => match c {
                // Consume the escaped character, whichever escape style
                '\\' => {
                    chars.next();
                }
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                }
                '\'' => mode = Mode::Normal,
                _ => {}
            },
            Mode::QuotedIdentifier => {
                current.push(c);
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        mode = Mode::Normal;
                    }
                }
            }
        }
    }

    end_token(&mut current, &mut tokens);
    finish_statement(&mut tokens, &mut objects);

    objects
}

fn end_token(current: &mut String, tokens: &mut Vec<String>) {
    if !current.is_empty() {
        tokens.push(std::mem::take(current));
    }
}

fn finish_statement(tokens: &mut Vec<String>, objects: &mut Vec<ExtractedObject>) {
    if let Some((kind, name)) = match_create(tokens) {
        objects.push(ExtractedObject {
            kind,
            name,
            position: objects.len(),
        });
    }
    tokens.clear();
}

/// Match `CREATE [OR REPLACE] TABLE|VIEW [IF NOT EXISTS] <name>` at the head
/// of a statement's token list.
fn match_create(tokens: &[String]) -> Option<(ObjectKind, String)> {
    let keyword_at = |i: usize, word: &str| {
        tokens
            .get(i)
            .map_or(false, |t| t.eq_ignore_ascii_case(word))
    };

    if !keyword_at(0, "CREATE") {
        return None;
    }

    let mut i = 1;
    if keyword_at(i, "OR") && keyword_at(i + 1, "REPLACE") {
        i += 2;
    }

    let kind = if keyword_at(i, "TABLE") {
        ObjectKind::Table
    } else if keyword_at(i, "VIEW") {
        ObjectKind::View
    } else {
        return None;
    };
    i += 1;

    if keyword_at(i, "IF") && keyword_at(i + 1, "NOT") && keyword_at(i + 2, "EXISTS") {
        i += 3;
    }

    tokens.get(i).map(|name| (kind, name.clone()))
}
