//! Rule-based AI-proof classification.
//!
//! Deterministic, total: every (title, description) pair maps to exactly
//! one result, with `(false, EXCLUDED)` as the default. No model, no
//! network, no state — identical input classifies identically across
//! calls and process restarts.

use crate::rules::{
    AI_PROOF_RULES, EXCLUDED, EXCLUDED_RULES, SENIORITY_MARKERS, TECH_TITLE_MARKERS,
};

/// Result of classifying one posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_ai_proof: bool,
    pub category: &'static str,
}

impl Classification {
    fn excluded() -> Self {
        Self {
            is_ai_proof: false,
            category: EXCLUDED,
        }
    }
}

/// Classify a posting as AI-proof (with its category) or excluded.
///
/// Ordered stages, first match wins at each stage:
///
/// 1. Tech-title override: an engineering title is excluded outright,
///    even if the description mentions trading or structuring.
/// 2. Excluded-category scan over title+description, in declared order.
///    A seniority-escalation marker ("head of", "chief", ...) anywhere in
///    the text bypasses the match and lets scanning continue — senior
///    leadership roles escape automatic exclusion.
/// 3. AI-proof scan against the title only (strongest signal).
/// 4. AI-proof scan against title+description.
/// 5. Default: excluded.
///
/// Note the bypass in stage 2 is only an exemption from that category: a
/// bypassed posting that matches no AI-proof keyword still lands on the
/// stage-5 default, so "Head of Compliance Reporting" ends up `EXCLUDED`
/// like any other unmatched title. Intentionally left as-is.
pub fn classify(title: &str, description: &str) -> Classification {
    if title.is_empty() {
        return Classification::excluded();
    }

    let title_lower = title.to_lowercase();
    let text = format!("{} {}", title_lower, description.to_lowercase());

    // 1. Tech-title override, title only.
    if TECH_TITLE_MARKERS.iter().any(|m| title_lower.contains(m)) {
        return Classification::excluded();
    }

    // 2. Excluded categories, with the seniority-escalation bypass.
    let escalated = SENIORITY_MARKERS.iter().any(|m| text.contains(m));
    for rule in EXCLUDED_RULES {
        if rule.keywords.iter().any(|kw| text.contains(kw)) {
            if escalated {
                continue;
            }
            return Classification::excluded();
        }
    }

    // 3. AI-proof, title only.
    for rule in AI_PROOF_RULES {
        if rule.keywords.iter().any(|kw| title_lower.contains(kw)) {
            return Classification {
                is_ai_proof: true,
                category: rule.name,
            };
        }
    }

    // 4. AI-proof, full text.
    for rule in AI_PROOF_RULES {
        if rule.keywords.iter().any(|kw| text.contains(kw)) {
            return Classification {
                is_ai_proof: true,
                category: rule.name,
            };
        }
    }

    // 5. Default.
    Classification::excluded()
}
