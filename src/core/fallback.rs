use crate::core::expander::FALLBACK_QUERY;
use crate::domain::model::{sources, CandidateQuery, Listing, SAMPLE_TAG};
use crate::utils::text::slugify;

const SAMPLE_URL_BASE: &str = "https://example.invalid/sample";

/// Placeholder listings for when every source came back empty.
/// Each one is tagged so callers can tell degraded mode from a genuinely empty market.
pub fn synthesize(queries: &[CandidateQuery], location: &str, n: usize) -> Vec<Listing> {
    let fallback = [CandidateQuery::new(FALLBACK_QUERY)];
    let queries = if queries.is_empty() { &fallback[..] } else { queries };

    let location = if location.trim().is_empty() { "Remote" } else { location.trim() };

    queries
        .iter()
        .take(n)
        .enumerate()
        .map(|(idx, query)| {
            let slug = slugify(query.as_str(), "-");
            Listing::new(sources::SAMPLE, format!("{} (sample)", title_case(query.as_str())), "Sample Company")
                .with_location(location)
                .with_apply_url(format!("{}/{}-{}", SAMPLE_URL_BASE, idx + 1, slug))
                .with_description(format!(
                    "Placeholder for \"{}\". Live sources were unreachable, so this is not a real opening.",
                    query
                ))
                .with_tags([SAMPLE_TAG])
                .with_score((50.0 - idx as f64).max(0.0))
        })
        .collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
