use crate::domain::model::Listing;
use crate::utils::error::{RadarError, Result};
use serde::Serialize;

/// Flat CSV row; tags are joined with `;`.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    source: &'a str,
    title: &'a str,
    company: &'a str,
    location: &'a str,
    stipend: &'a str,
    apply_url: &'a str,
    score: f64,
    is_new: bool,
    tags: String,
    posted: &'a str,
    description: &'a str,
}

impl<'a> From<&'a Listing> for CsvRow<'a> {
    fn from(listing: &'a Listing) -> Self {
        Self {
            source: &listing.source,
            title: &listing.title,
            company: &listing.company,
            location: &listing.location,
            stipend: listing.stipend.as_deref().unwrap_or_default(),
            apply_url: listing.apply_url.as_deref().unwrap_or_default(),
            score: listing.score,
            is_new: listing.is_new,
            tags: listing.tags.join(";"),
            posted: listing.posted.as_deref().unwrap_or_default(),
            description: &listing.description,
        }
    }
}

pub fn render_json(listings: &[Listing]) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec_pretty(listings)?;
    body.push(b'\n');
    Ok(body)
}

pub fn render_csv(listings: &[Listing]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for listing in listings {
        writer.serialize(CsvRow::from(listing))?;
    }
    writer
        .into_inner()
        .map_err(|e| RadarError::IoError(std::io::Error::new(e.error().kind(), e.error().to_string())))
}
