use crate::domain::model::{Listing, ResumeProfile, HOT_TAG};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*days?\b").expect("days pattern is valid"));

pub const MIN_RAW_SCORE: f64 = 5.0;
pub const MAX_SCORE: f64 = 100.0;

/// Heuristic weights. Defaults are the historically tuned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base: f64,
    pub coverage_max: f64,
    pub richness_max: f64,
    pub richness_per_term: f64,
    pub role_bonus: f64,
    pub location_bonus: f64,
    pub paid_bonus: f64,
    pub max_skills: usize,
    pub max_roles: usize,
    pub hot_threshold: f64,
    pub new_within_days: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 40.0,
            coverage_max: 25.0,
            richness_max: 20.0,
            richness_per_term: 3.0,
            role_bonus: 10.0,
            location_bonus: 5.0,
            paid_bonus: 3.0,
            max_skills: 25,
            max_roles: 8,
            hot_threshold: 85.0,
            new_within_days: 7,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Raw relevance in [5, 100].
    pub fn score(&self, listing: &Listing, profile: &ResumeProfile) -> f64 {
        let w = &self.weights;
        let text = listing.search_text();

        let skills: Vec<&String> = profile.skills().iter().take(w.max_skills).collect();
        let hits: HashSet<&str> = skills
            .iter()
            .filter(|s| text.contains(s.as_str()))
            .map(|s| s.as_str())
            .collect();

        let mut score = w.base;
        if !skills.is_empty() {
            let coverage = hits.len() as f64 / skills.len() as f64;
            score += (coverage * w.coverage_max).min(w.coverage_max);
        }
        score += (hits.len() as f64 * w.richness_per_term).min(w.richness_max);

        if profile
            .roles()
            .iter()
            .take(w.max_roles)
            .any(|role| text.contains(role.as_str()))
        {
            score += w.role_bonus;
        }

        if let Some(location) = profile.location() {
            if listing.location.to_lowercase().contains(location) {
                score += w.location_bonus;
            }
        }

        if listing
            .stipend
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
        {
            score += w.paid_bonus;
        }

        score.clamp(MIN_RAW_SCORE, MAX_SCORE)
    }

    /// Scores, normalizes per source and tags every listing in place.
    pub fn score_all(&self, listings: &mut [Listing], profile: &ResumeProfile) {
        for listing in listings.iter_mut() {
            listing.score = self.score(listing, profile);
            listing.is_new = listing.is_new || self.is_new(listing.posted.as_deref());
        }

        normalize_by_source(listings);

        for listing in listings.iter_mut() {
            if listing.score >= self.weights.hot_threshold {
                listing.add_tag(HOT_TAG);
            }
        }
    }

    /// "today", "just now", or "<N> day(s)" with N within the freshness window.
    pub fn is_new(&self, posted: Option<&str>) -> bool {
        let Some(posted) = posted else {
            return false;
        };
        let lowered = posted.to_lowercase();
        if lowered.contains("today") || lowered.contains("just now") {
            return true;
        }
        DAYS_AGO
            .captures(&lowered)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .is_some_and(|days| days <= self.weights.new_within_days)
    }
}

/// Rescales each source bucket so its best listing scores 100.
pub fn normalize_by_source(listings: &mut [Listing]) {
    let mut bucket_max: BTreeMap<String, f64> = BTreeMap::new();
    for listing in listings.iter() {
        let entry = bucket_max.entry(listing.source.to_lowercase()).or_insert(0.0);
        *entry = entry.max(listing.score);
    }

    for listing in listings.iter_mut() {
        let max = bucket_max
            .get(&listing.source.to_lowercase())
            .copied()
            .filter(|m| *m > 0.0)
            .unwrap_or(1.0);
        let scaled = (listing.score / max) * MAX_SCORE;
        listing.score = ((scaled * 100.0).round() / 100.0).clamp(0.0, MAX_SCORE);
    }
}
