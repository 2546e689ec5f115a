//! Turning typed or pasted text into file paths.
//!
//! Terminals hand dropped files over as pasted text: sometimes quoted,
//! sometimes with backslash-escaped spaces, sometimes as `file://` URIs.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

static FILE_URI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^file://(?:localhost)?(/.*)$").expect("valid regex"));

/// Extracts candidate file paths from raw input text.
///
/// Tokens are split on whitespace unless quoted (`'...'` or `"..."`) or the
/// whitespace is escaped with a backslash. `file://` URIs are percent-decoded
/// and a leading `~/` expands to the home directory. Repeated paths are
/// returned once, in first-seen order.
#[must_use]
pub fn extract_paths(input: &str) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    split_tokens(input)
        .into_iter()
        .filter_map(|token| token_to_path(&token))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

fn token_to_path(token: &str) -> Option<PathBuf> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if let Some(caps) = FILE_URI_RE.captures(token) {
        return Some(PathBuf::from(percent_decode(&caps[1])));
    }
    if let Some(rest) = token.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Some(home.join(rest));
    }
    Some(PathBuf::from(token))
}

/// Splits `input` into shell-like words.
fn split_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    in_token = true;
                }
                // Only whitespace and quotes are escapable so Windows paths survive.
                '\\' if chars
                    .peek()
                    .is_some_and(|n| n.is_whitespace() || matches!(n, '\'' | '"')) =>
                {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// Decodes `%XX` escapes. Invalid escapes are kept verbatim.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = bytes.get(i + 1..i + 3)
            && hex.iter().all(u8::is_ascii_hexdigit)
            && let Ok(hex) = std::str::from_utf8(hex)
            && let Ok(value) = u8::from_str_radix(hex, 16)
        {
            out.push(value);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
