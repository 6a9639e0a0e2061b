use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static INTERN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bintern(?:s|ship|ships)?\b").expect("intern pattern is valid"));

/// Tag name → keywords that trigger it when found in a description.
const TAG_PATTERNS: &[(&str, &[&str])] = &[
    ("remote", &["remote", "work from home", "wfh"]),
    ("hybrid", &["hybrid"]),
    ("onsite", &["on-site", "onsite", "on site"]),
    ("stipend", &["₹", "stipend", "per month", "per week", "per day"]),
    ("tech", &["software", "developer", "programming", "coding", "tech"]),
    (
        "data-science",
        &["data science", "machine learning", "analytics", "data analyst"],
    ),
    (
        "web-dev",
        &["web development", "frontend", "backend", "full stack", "react", "javascript"],
    ),
    ("mobile", &["mobile app", "android", "ios", "flutter", "react native"]),
    ("internship", &["internship", "intern", "trainee"]),
];

/// Terms too generic to narrow a search.
const GENERIC_TERMS: &[&str] = &["internship", "internships", "intern", "interns", "trainee", "job"];

pub fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Truncates on a char boundary.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub fn looks_like_internship(text: &str) -> bool {
    INTERN_WORD.is_match(text) || text.to_lowercase().contains("trainee")
}

pub fn auto_tags(description: &str) -> Vec<String> {
    let lowered = description.to_lowercase();
    TAG_PATTERNS
        .iter()
        .filter(|(_, keys)| keys.iter().any(|k| lowered.contains(k)))
        .map(|(tag, _)| tag.to_string())
        .collect()
}

/// Lowercased query tokens minus the generic internship words.
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| !GENERIC_TERMS.contains(&t.as_str()))
        .collect()
}

/// True when the text mentions any meaningful query term, or when the query has none.
pub fn matches_query(terms: &[String], text: &str) -> bool {
    if terms.is_empty() {
        return true;
    }
    let lowered = text.to_lowercase();
    terms.iter().any(|t| lowered.contains(t.as_str()))
}

pub fn element_text(element: &ElementRef<'_>) -> String {
    normalize(&element.text().collect::<Vec<_>>().join(" "))
}

/// Strips markup from ATS descriptions; plain text passes through.
pub fn html_to_text(text: &str) -> String {
    if !(text.contains('<') || text.contains('&')) {
        return normalize(text);
    }
    let fragment = Html::parse_fragment(text);
    let decoded = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    // 有些 API 回傳跳脫過的 HTML，需再解析一次
    if !text.contains('<') && decoded.contains('<') && decoded.contains('>') {
        return html_to_text(&decoded);
    }
    normalize(&decoded)
}

/// First match of a CSS selector group in document order. Bad selectors match nothing.
pub fn select_first<'a>(root: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    root.select(&selector).next()
}

pub fn select_all<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => root.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Tries selector variants in order and returns the first non-empty match set.
pub fn select_variants<'a>(root: ElementRef<'a>, variants: &[&str]) -> Vec<ElementRef<'a>> {
    variants
        .iter()
        .map(|css| select_all(root, css))
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

pub fn slugify(text: &str, separator: &str) -> String {
    text.split_whitespace()
        .map(|t| t.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}
