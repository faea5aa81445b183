//! Best-effort repair of near-JSON text emitted by template engines.
//!
//! Handles comments, single-quoted strings, bare keys, trailing commas,
//! `undefined`, and stray control characters (replaced by a space outside
//! strings, escaped inside them). `NaN` and `Infinity` are left
//! alone so they fail at parse time instead of silently turning into numbers.
//!
//! [`sanitize`] never fails and is idempotent. It does not parse JSON.

/// Repair `raw` so a strict JSON parser has a chance of accepting it.
pub fn sanitize(raw: &str) -> String {
    let input = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '"' => i = copy_string(&chars, i, '"', &mut out),
            '\'' => i = copy_string(&chars, i, '\'', &mut out),
            '/' if next == Some('/') => {
                // Keep the newline itself.
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
                out.push(' ');
            }
            '}' | ']' => {
                strip_trailing_commas(&mut out);
                out.push(c);
                i += 1;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                if in_key_position(&out) && followed_by_colon(&chars, i) {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else if ident == "undefined" {
                    out.push_str("null");
                } else {
                    out.push_str(&ident);
                }
            }
            c if is_stray(c) => {
                // A space keeps neighbouring tokens apart.
                out.push(' ');
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy a string literal starting at `chars[start] == quote`, emitting it
/// double-quoted. Returns the index just past the closing quote, or the end
/// of input for an unterminated literal.
fn copy_string(chars: &[char], start: usize, quote: char, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => match chars.get(i + 1).copied() {
                Some('\'') => {
                    out.push('\'');
                    i += 2;
                }
                Some(esc) if (esc as u32) < 0x20 => {
                    push_escaped_control(esc, out);
                    i += 2;
                }
                Some(esc) => {
                    out.push('\\');
                    out.push(esc);
                    i += 2;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            },
            c if c == quote => {
                out.push('"');
                return i + 1;
            }
            '"' => {
                // Only reachable inside a single-quoted literal.
                out.push_str("\\\"");
                i += 1;
            }
            c if (c as u32) < 0x20 => {
                push_escaped_control(c, out);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    i
}

fn push_escaped_control(c: char, out: &mut String) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{8}' => out.push_str("\\b"),
        '\u{c}' => out.push_str("\\f"),
        other => out.push_str(&format!("\\u{:04x}", other as u32)),
    }
}

/// Drop commas from the trailing run of whitespace and commas.
fn strip_trailing_commas(out: &mut String) {
    let keep = out
        .trim_end_matches(|c: char| c.is_whitespace() || c == ',')
        .len();
    if keep == out.len() {
        return;
    }
    let tail: String = out[keep..].chars().filter(|c| *c != ',').collect();
    out.truncate(keep);
    out.push_str(&tail);
}

fn in_key_position(out: &str) -> bool {
    matches!(out.trim_end().chars().last(), Some('{') | Some(','))
}

fn followed_by_colon(chars: &[char], from: usize) -> bool {
    chars.get(skip_insignificant(chars, from)) == Some(&':')
}

/// Index of the next char that survives sanitization as a token.
fn skip_insignificant(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || is_stray(c) {
            i += 1;
        } else if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i = (i + 2).min(chars.len());
        } else {
            break;
        }
    }
    i
}

/// Control characters (other than JSON whitespace) and byte-order marks.
fn is_stray(c: char) -> bool {
    (c.is_control() && !matches!(c, '\n' | '\r' | '\t')) || c == '\u{feff}'
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
