use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("hardcoded HTML tag regex is valid"));
static STRAY_ANGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]").expect("hardcoded angle bracket regex is valid"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded whitespace regex is valid"));

/// Reduces the inner markup of one cell to a single line of visible text.
///
/// Tags are removed without interpretation, leftover `<`/`>` are dropped and
/// whitespace runs collapse to one space. Character entities are left as-is.
pub fn normalize_cell(fragment: &str) -> String {
    let without_tags = TAG_RE.replace_all(fragment, "");
    let without_stray = STRAY_ANGLE_RE.replace_all(&without_tags, "");
    WHITESPACE_RE
        .replace_all(&without_stray, " ")
        .trim()
        .to_string()
}
