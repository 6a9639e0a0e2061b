use crate::domain::model::Listing;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Groups listings by lowercased source, each bucket sorted by score descending.
pub fn bucket_by_source(listings: Vec<Listing>) -> BTreeMap<String, Vec<Listing>> {
    let mut buckets: BTreeMap<String, Vec<Listing>> = BTreeMap::new();
    for listing in listings {
        buckets
            .entry(listing.source.to_lowercase())
            .or_default()
            .push(listing);
    }
    for bucket in buckets.values_mut() {
        // 穩定排序：同分時維持抓取順序
        bucket.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
    buckets
}

/// Round robin over source buckets in key order until all are drained or `cap` is reached.
pub fn interleave(buckets: BTreeMap<String, Vec<Listing>>, cap: usize) -> Vec<Listing> {
    let mut queues: Vec<VecDeque<Listing>> = buckets
        .into_values()
        .map(VecDeque::from)
        .filter(|q| !q.is_empty())
        .collect();

    let mut out = Vec::with_capacity(cap.min(queues.iter().map(VecDeque::len).sum()));
    while out.len() < cap && !queues.is_empty() {
        for queue in queues.iter_mut() {
            if out.len() >= cap {
                break;
            }
            if let Some(listing) = queue.pop_front() {
                out.push(listing);
            }
        }
        queues.retain(|q| !q.is_empty());
    }
    out
}

/// Soft variety budget for the head of the result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleDiversityGuard {
    /// Guard is active only until this many listings have been admitted.
    pub window: usize,
    /// Admissions allowed per title signature inside the window.
    pub max_per_signature: usize,
    /// Upper bound on listings dropped by the guard.
    pub max_suppressed: usize,
}

impl Default for RoleDiversityGuard {
    fn default() -> Self {
        Self {
            window: 20,
            max_per_signature: 1,
            max_suppressed: 30,
        }
    }
}

impl RoleDiversityGuard {
    pub fn apply(&self, listings: Vec<Listing>) -> Vec<Listing> {
        let mut admitted: HashMap<String, usize> = HashMap::new();
        let mut suppressed = 0usize;
        let mut out = Vec::with_capacity(listings.len());

        for listing in listings {
            let signature = title_signature(&listing.title);
            let seen = admitted.get(&signature).copied().unwrap_or(0);

            let in_window = out.len() < self.window;
            if in_window && seen >= self.max_per_signature && suppressed < self.max_suppressed {
                suppressed += 1;
                continue;
            }

            *admitted.entry(signature).or_insert(0) += 1;
            out.push(listing);
        }

        if suppressed > 0 {
            tracing::debug!("🎨 Role diversity guard suppressed {} repeats", suppressed);
        }
        out
    }
}

/// First whitespace token of the lowercased title.
pub fn title_signature(title: &str) -> String {
    title
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(source: &str, n: usize) -> Vec<Listing> {
        (1..=n)
            .map(|i| Listing {
                score: 100.0 - i as f64,
                ..Listing::new(source, format!("{}{}", source, i), "c")
            })
            .collect()
    }

    fn titles(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.title.as_str()).collect()
    }

    #[test]
    fn test_interleave_fairness() {
        let mut buckets = BTreeMap::new();
        buckets.insert("a".to_string(), bucket("a", 10));
        buckets.insert("b".to_string(), bucket("b", 2));
        let out = interleave(buckets, 4);
        assert_eq!(titles(&out), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn test_interleave_drains_after_short_bucket_exhausts() {
        let mut buckets = BTreeMap::new();
        buckets.insert("a".to_string(), bucket("a", 4));
        buckets.insert("b".to_string(), bucket("b", 1));
        buckets.insert("c".to_string(), Vec::new());
        let out = interleave(buckets, 50);
        assert_eq!(titles(&out), vec!["a1", "b1", "a2", "a3", "a4"]);
    }

    #[test]
    fn test_interleave_zero_cap() {
        let mut buckets = BTreeMap::new();
        buckets.insert("a".to_string(), bucket("a", 3));
        assert!(interleave(buckets, 0).is_empty());
    }

    #[test]
    fn test_bucket_by_source_sorts_desc() {
        let listings = vec![
            Listing { score: 10.0, ..Listing::new("Lever", "low", "c") },
            Listing { score: 90.0, ..Listing::new("lever", "high", "c") },
            Listing { score: 50.0, ..Listing::new("gov", "mid", "c") },
        ];
        let buckets = bucket_by_source(listings);
        assert_eq!(buckets.keys().collect::<Vec<_>>(), vec!["gov", "lever"]);
        assert_eq!(titles(&buckets["lever"]), vec!["high", "low"]);
    }

    #[test]
    fn test_guard_suppresses_repeats_inside_window() {
        let listings: Vec<Listing> = [
            "Software Engineer Intern",
            "Software Developer Intern",
            "Data Analyst Intern",
            "software tester",
        ]
        .iter()
        .map(|t| Listing::new("a", *t, "c"))
        .collect();

        let out = RoleDiversityGuard::default().apply(listings);
        assert_eq!(titles(&out), vec!["Software Engineer Intern", "Data Analyst Intern"]);
    }

    #[test]
    fn test_guard_admits_everything_after_window() {
        let listings: Vec<Listing> = ["Web A", "Data B", "Web C", "Web D"]
            .iter()
            .map(|t| Listing::new("a", *t, "c"))
            .collect();
        let guard = RoleDiversityGuard {
            window: 2,
            ..RoleDiversityGuard::default()
        };
        let out = guard.apply(listings);
        assert_eq!(titles(&out), vec!["Web A", "Data B", "Web C", "Web D"]);
    }

    #[test]
    fn test_guard_suppression_budget_is_bounded() {
        let listings: Vec<Listing> = (0..5).map(|i| Listing::new("a", format!("Web {}", i), "c")).collect();
        let guard = RoleDiversityGuard {
            window: 20,
            max_per_signature: 1,
            max_suppressed: 2,
        };
        let out = guard.apply(listings);
        assert_eq!(titles(&out), vec!["Web 0", "Web 3", "Web 4"]);
    }

    #[test]
    fn test_title_signature() {
        assert_eq!(title_signature("  Backend Intern"), "backend");
        assert_eq!(title_signature(""), "");
    }
}
