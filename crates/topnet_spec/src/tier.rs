//! Tier classification: free-text intent to an architecture preset.
//!
//! A deliberately simple keyword scan, kept behind this module boundary so
//! a richer classifier can replace it without touching the builder's
//! structural logic. Classification is pure: the same text always yields
//! the same tier, and nothing is recorded on the graph.

use crate::models::{ComponentRole, TopologySpec};

/// Architecture preset trading cost against availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Single AZ, public subnets only, no NAT gateway, no load balancer.
    One,
    /// Two AZs, public + private subnets, NAT gateway, load balancer,
    /// database in private subnets.
    Two,
}

impl Tier {
    pub fn value(&self) -> u8 {
        match self {
            Tier::One => 1,
            Tier::Two => 2,
        }
    }
}

/// Keywords that force the production/HA tier.
pub const TIER2_KEYWORDS: &[&str] = &[
    "production",
    "prod",
    "high availability",
    "highly available",
    "ha",
    "multi-az",
    "multi az",
    "fault tolerant",
    "redundant",
    "enterprise",
    "mission critical",
    "99.9",
    "uptime",
    "load balancer",
    "load balanced",
    "alb",
    "scaling",
];

/// Keywords that signal explicit simplicity.
pub const TIER1_KEYWORDS: &[&str] = &[
    "simple",
    "cheap",
    "budget",
    "small",
    "test",
    "testing",
    "mvp",
    "prototype",
    "hobby",
    "learning",
    "student",
    "practice",
    "minimal",
    "basic",
    "single",
    "one instance",
    "just one",
];

/// Whether the text contains the keyword. Single words must match on word
/// boundaries so that e.g. "ha" does not fire inside "chat"; multi-word
/// phrases match as substrings.
fn contains_keyword(text: &str, keyword: &str) -> bool {
    if keyword.contains(' ') {
        return text.contains(keyword);
    }
    text.split(|c: char| !c.is_alphanumeric() && c != '.' && c != '-')
        .any(|word| word == keyword)
}

fn has_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| contains_keyword(text, kw))
}

/// Classify free text. Tier 2 wins when both keyword classes appear; absent
/// any signal the default is Tier 1, keeping default cost low.
pub fn classify_text(text: &str) -> Tier {
    let text = text.to_lowercase();
    if has_any(&text, TIER2_KEYWORDS) {
        return Tier::Two;
    }
    if has_any(&text, TIER1_KEYWORDS) {
        return Tier::One;
    }
    Tier::One
}

/// Whether the text carries any explicit HA/production signal at all.
pub fn signals_high_availability(text: &str) -> bool {
    has_any(&text.to_lowercase(), TIER2_KEYWORDS)
}

/// Classify a whole spec: description text first, then an upgrade when the
/// caller explicitly sized the web fleet for redundancy.
pub fn classify_spec(spec: &TopologySpec) -> Tier {
    let text = spec.description_text();
    if has_any(&text, TIER2_KEYWORDS) {
        return Tier::Two;
    }
    if has_any(&text, TIER1_KEYWORDS) {
        return Tier::One;
    }
    let web_wants_fleet = spec
        .components_with_role(ComponentRole::WebTier)
        .any(|c| c.quantity.map(|q| q >= 2).unwrap_or(false));
    if web_wants_fleet {
        return Tier::Two;
    }
    Tier::One
}
