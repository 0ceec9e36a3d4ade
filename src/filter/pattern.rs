//! Filename glob patterns.
//!
//! # Supported syntax
//!
//! - `*`: any run of characters, including none
//! - `?`: exactly one character
//! - `[abc]`, `[a-z]`: one character from the set
//! - `[!abc]`: one character not in the set
//! - `pdf` / `.pdf`: a bare extension, same as `*.pdf`
//!
//! Matching is case-insensitive and applies to the whole filename. There are
//! no path semantics: `*` also matches `/`.

/// One element of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

impl Token {
    /// Whether this single-character token accepts `c`.
    fn accepts(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnyRun => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match *item {
                    ClassItem::Char(x) => x == c,
                    ClassItem::Range(lo, hi) => lo <= c && c <= hi,
                });
                hit != *negated
            }
        }
    }
}

/// A compiled, case-insensitive filename pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compile a pattern. Never fails: malformed classes degrade to literals.
    pub fn new(source: &str) -> Self {
        let trimmed = source.trim();
        let lowered = trimmed.to_lowercase();
        let expanded = if is_bare_extension(&lowered) {
            if lowered.starts_with('.') {
                format!("*{lowered}")
            } else {
                format!("*.{lowered}")
            }
        } else {
            lowered
        };

        Self {
            source: trimmed.to_string(),
            tokens: compile(&expanded),
        }
    }

    /// The pattern as written by the user.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// `true` for the lone `*` pattern.
    pub fn matches_everything(&self) -> bool {
        self.tokens.iter().all(|t| *t == Token::AnyRun) && !self.tokens.is_empty()
    }

    /// Whether `filename` matches this pattern, ignoring case.
    pub fn matches(&self, filename: &str) -> bool {
        let text: Vec<char> = filename.to_lowercase().chars().collect();
        glob_match(&self.tokens, &text)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// A pattern without any wildcard character is read as an extension.
pub fn is_bare_extension(pattern: &str) -> bool {
    !pattern.contains(['*', '?', '[', ']'])
}

/// Human-readable description of what a pattern selects.
pub fn describe(pattern: &str) -> String {
    let p = pattern.trim();
    if p == "*" {
        return "Matches all files".to_string();
    }
    if is_bare_extension(p) {
        let ext = p.strip_prefix('.').unwrap_or(p);
        return format!("Files ending with .{ext}");
    }
    if let Some(ext) = p.strip_prefix("*.") {
        if is_bare_extension(ext) {
            return format!("All files with .{ext} extension");
        }
    }
    if let Some(prefix) = p.strip_suffix('*') {
        if is_bare_extension(prefix) {
            return format!("Files starting with \"{prefix}\"");
        }
    }
    format!("Files matching pattern \"{p}\"")
}

fn compile(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                // Consecutive stars are equivalent to one
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
                i += 1;
            }
            '?' => {
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '[' => match parse_class(&chars, i + 1) {
                Some((token, next)) => {
                    tokens.push(token);
                    i = next;
                }
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }

    tokens
}

/// Parse a character class starting right after `[`.
///
/// Returns the token and the index after the closing `]`, or `None` when the
/// class is never closed. A `]` directly after `[` or `[!` is a member.
fn parse_class(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start;
    let negated = chars.get(i) == Some(&'!');
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    let first = i;
    loop {
        let c = *chars.get(i)?;
        if c == ']' && i > first {
            return Some((Token::Class { negated, items }, i + 1));
        }
        if chars.get(i + 1) == Some(&'-') && chars.get(i + 2).is_some_and(|&e| e != ']') {
            items.push(ClassItem::Range(c, chars[i + 2]));
            i += 3;
        } else {
            items.push(ClassItem::Char(c));
            i += 1;
        }
    }
}

/// Iterative wildcard matching with single-star backtracking.
fn glob_match(tokens: &[Token], text: &[char]) -> bool {
    let (mut t, mut s) = (0usize, 0usize);
    // Position of the last `*` and the text index it is currently absorbing up to
    let mut star: Option<(usize, usize)> = None;

    while s < text.len() {
        match tokens.get(t) {
            Some(Token::AnyRun) => {
                star = Some((t, s));
                t += 1;
                continue;
            }
            Some(token) if token.accepts(text[s]) => {
                t += 1;
                s += 1;
                continue;
            }
            _ => {}
        }

        match star {
            Some((star_t, star_s)) => {
                t = star_t + 1;
                s = star_s + 1;
                star = Some((star_t, star_s + 1));
            }
            None => return false,
        }
    }

    tokens[t..].iter().all(|tok| *tok == Token::AnyRun)
}
