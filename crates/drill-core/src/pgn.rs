//! Movetext helpers. Regex-based, no full PGN parsing.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("header regex"));
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^}]*\}").expect("comment regex"));
static VARIATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("variation regex"));
static SAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[KQRBN]?[a-h]?[1-8]?x?[a-h][1-8](?:=[QRBN])?[+#]?|O-O-O|O-O|0-0-0|0-0")
        .expect("san regex")
});

/// Numbered movetext, e.g. `1. e4 e5 2. Nf3`.
pub fn format_movetext<S: AsRef<str>>(notations: &[S]) -> String {
    let mut text = String::new();
    for (ply, notation) in notations.iter().enumerate() {
        if ply % 2 == 0 {
            text.push_str(&format!("{}. ", ply / 2 + 1));
        }
        text.push_str(notation.as_ref());
        text.push(' ');
    }
    text.trim_end().to_string()
}

/// Pull SAN tokens out of movetext, dropping headers, comments and variations.
pub fn extract_san_tokens(text: &str) -> Vec<String> {
    let no_headers = HEADER_RE.replace_all(text, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, "");
    let no_variations = VARIATION_RE.replace_all(&no_comments, "");

    SAN_RE
        .find_iter(&no_variations)
        .map(|m| m.as_str().to_string())
        .collect()
}
