use crate::domain::model::Listing;
use std::collections::HashSet;

/// Drops repeats by identity key; the first occurrence wins and order is kept.
pub fn dedupe(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen: HashSet<String> = HashSet::with_capacity(listings.len());
    let before = listings.len();

    let unique: Vec<Listing> = listings
        .into_iter()
        .filter(|listing| seen.insert(listing.identity_key()))
        .collect();

    if unique.len() < before {
        tracing::debug!("🧹 Removed {} duplicate listings", before - unique.len());
    }
    unique
}
