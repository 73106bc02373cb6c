//! Fusion of provider hits into one classification
//!
//! Each hit is mapped to a venue type and energy through an ordered rule
//! table. When several providers answer, the most energetic venue wins; ties
//! fall back to the closer hit and then to provider preference.

use std::cmp::Ordering;

use crate::types::{Provider, ProviderHit, VenueClassification, VenueType};

pub struct CategoryRule {
    pub venue_type: VenueType,
    pub energy: f64,
    pub keywords: &'static [&'static str],
}

/// Checked top to bottom; the first rule with a matching keyword wins.
pub const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule {
        venue_type: VenueType::Nightclub,
        energy: 0.95,
        keywords: &["nightclub", "club", "disco", "discotheque"],
    },
    CategoryRule {
        venue_type: VenueType::Bar,
        energy: 0.7,
        keywords: &["bar", "pub", "lounge", "brewery", "taproom", "speakeasy"],
    },
    CategoryRule {
        venue_type: VenueType::Coffee,
        energy: 0.4,
        keywords: &["coffee", "cafe", "café", "coffeehouse", "espresso"],
    },
    CategoryRule {
        venue_type: VenueType::Gym,
        energy: 0.8,
        keywords: &["gym", "fitness", "crossfit"],
    },
    CategoryRule {
        venue_type: VenueType::Park,
        energy: 0.45,
        keywords: &["park", "outdoor", "outdoors", "recreation", "playground"],
    },
    CategoryRule {
        venue_type: VenueType::Office,
        energy: 0.3,
        keywords: &["office", "cowork", "coworking", "company", "corporate"],
    },
    CategoryRule {
        venue_type: VenueType::Restaurant,
        energy: 0.55,
        keywords: &["restaurant", "diner", "bistro", "eatery"],
    },
];

pub const DEFAULT_VENUE: (VenueType, f64) = (VenueType::General, 0.5);

/// Maps free-form category labels to a venue type and energy.
pub fn categorize(categories: &[String]) -> (VenueType, f64) {
    let tokens: Vec<String> = categories
        .iter()
        .flat_map(|category| {
            category
                .split(|c: char| !c.is_alphanumeric())
                .filter(|token| !token.is_empty())
                .map(str::to_lowercase)
                .collect::<Vec<_>>()
        })
        .collect();

    CATEGORY_RULES
        .iter()
        .find(|rule| {
            tokens
                .iter()
                .any(|token| rule.keywords.contains(&token.as_str()))
        })
        .map(|rule| (rule.venue_type, rule.energy))
        .unwrap_or(DEFAULT_VENUE)
}

pub fn classify_hit(hit: &ProviderHit) -> VenueClassification {
    let (venue_type, energy) = categorize(&hit.categories);
    VenueClassification {
        venue_type,
        energy,
        name: hit.name.clone(),
        provider: hit.provider,
        distance_m: hit.distance_m,
    }
}

fn preference_rank(provider: Provider, preference: &[Provider]) -> usize {
    preference
        .iter()
        .position(|p| *p == provider)
        .unwrap_or(usize::MAX)
}

/// Ordering where `Greater` means `a` should be chosen over `b`.
fn compare(a: &VenueClassification, b: &VenueClassification, preference: &[Provider]) -> Ordering {
    a.energy
        .partial_cmp(&b.energy)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (a.distance_m, b.distance_m) {
            (Some(da), Some(db)) => db.partial_cmp(&da).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        })
        .then_with(|| {
            preference_rank(b.provider, preference).cmp(&preference_rank(a.provider, preference))
        })
}

/// Combines the hits of one resolution. Returns `None` when no provider answered.
pub fn fuse(hits: &[ProviderHit], preference: &[Provider]) -> Option<VenueClassification> {
    debug_assert!(
        hits.iter()
            .enumerate()
            .all(|(i, hit)| hits[..i].iter().all(|other| other.provider != hit.provider)),
        "at most one hit per provider"
    );

    hits.iter()
        .map(classify_hit)
        .reduce(|best, candidate| {
            if compare(&candidate, &best, preference) == Ordering::Greater {
                candidate
            } else {
                best
            }
        })
}
