//! Keyword rule tables for the classification engine.
//!
//! Tables are ordered slices, not maps: keyword sets overlap across
//! categories (e.g. "structuring" is its own category and also appears in
//! Sales & Trading phrasing), so scan order decides the winner. Changing
//! declaration order changes classification results.
//!
//! All keywords are lowercase; matching is case-insensitive substring
//! containment against lowercased text.

/// One named category with its keyword set.
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// Category label for postings that fall outside the AI-proof catalog.
pub const EXCLUDED: &str = "EXCLUDED";

/// Roles requiring human judgment and decision-making. Scanned in order;
/// first match wins.
pub const AI_PROOF_RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "Investment Banking",
        keywords: &[
            "investment banking",
            "m&a",
            "mergers and acquisitions",
            "capital markets",
            "equity capital markets",
            "debt capital markets",
            "corporate finance",
            "financial advisory",
            "restructuring advisory",
            "leveraged finance",
            "sponsor coverage",
            "industry coverage",
        ],
    },
    CategoryRule {
        name: "Sales & Trading",
        keywords: &[
            "sales and trading",
            "trading",
            "trader",
            "sales trader",
            "equity sales",
            "fixed income sales",
            "fx sales",
            "forex sales",
            "commodities sales",
            "derivatives sales",
            "structured products",
            "market maker",
            "market making",
            "flow trading",
            "prop trading",
            "proprietary trading",
            "execution services",
            "agency trading",
        ],
    },
    CategoryRule {
        name: "Portfolio Management",
        keywords: &[
            "portfolio management",
            "portfolio manager",
            "investment management",
            "fund manager",
            "asset management",
            "wealth management",
            "private wealth",
            "family office",
            "alternative investments",
            "hedge fund",
            "private equity investment",
            "venture capital investment",
            "multi-asset",
            "equity portfolio",
            "fixed income portfolio",
        ],
    },
    CategoryRule {
        name: "Risk Management",
        keywords: &[
            "risk management",
            "market risk",
            "credit risk",
            "operational risk",
            "enterprise risk",
            "risk analytics",
            "stress testing",
            "scenario analysis",
            "value at risk",
            "credit valuation adjustment",
            "counterparty risk",
            "liquidity risk",
            "model risk",
            "trading risk",
        ],
    },
    CategoryRule {
        name: "M&A Advisory",
        keywords: &[
            "m&a advisory",
            "merger advisory",
            "acquisition advisory",
            "strategic advisory",
            "corporate development",
            "deal execution",
            "buy-side advisory",
            "sell-side advisory",
            "fairness opinion",
            "valuation advisory",
        ],
    },
    CategoryRule {
        name: "Private Equity",
        keywords: &[
            "private equity",
            "buyout",
            "growth equity",
            "venture capital",
            "principal investing",
            "direct investment",
            "fund investing",
        ],
    },
    CategoryRule {
        name: "Structuring",
        keywords: &[
            "structuring",
            "structured products",
            "derivatives structuring",
            "solutions",
            "bespoke solutions",
            "quantitative structuring",
        ],
    },
];

/// Roles susceptible to AI automation. Scanned before the AI-proof tables;
/// a match here short-circuits to `EXCLUDED` unless a seniority-escalation
/// marker is present anywhere in the text.
pub const EXCLUDED_RULES: &[CategoryRule] = &[
    CategoryRule {
        name: "Accounting",
        keywords: &[
            "accountant",
            "accounting",
            "bookkeeping",
            "accounts payable",
            "accounts receivable",
            "general ledger",
            "financial reporting analyst",
            "statutory reporting",
            "tax reporting",
            "gaap",
            "ifrs reporting",
        ],
    },
    CategoryRule {
        name: "Audit",
        keywords: &[
            "audit",
            "auditor",
            "internal audit",
            "external audit",
            "sox compliance",
            "sarbanes-oxley",
            "audit associate",
            "audit senior",
            "assurance",
        ],
    },
    CategoryRule {
        name: "Back Office Operations",
        keywords: &[
            "back office",
            "settlement",
            "reconciliation",
            "trade support",
            "operations analyst",
            "transaction processing",
            "clearing",
            "custody",
            "fund administration",
            "transfer agency",
        ],
    },
    CategoryRule {
        name: "Basic Data Science",
        keywords: &[
            "data entry",
            "data analyst",
            "reporting analyst",
            "management information systems",
            "dashboard",
            "business intelligence analyst",
            "data visualization",
            "reporting coordinator",
        ],
    },
    CategoryRule {
        name: "Compliance Reporting",
        keywords: &[
            "compliance reporting",
            "regulatory reporting",
            "kyc analyst",
            "aml analyst",
            "sanctions screening",
            "transaction monitoring analyst",
            "compliance associate",
            "compliance analyst",
        ],
    },
    CategoryRule {
        name: "Administrative Support",
        keywords: &[
            "administrative",
            "coordinator",
            "executive assistant",
            "office manager",
            "receptionist",
            "clerk",
        ],
    },
];

/// Technology/engineering title markers. Checked against the title only,
/// before anything else: a tech title short-circuits to `EXCLUDED` even
/// when the description mentions trading or structuring.
pub const TECH_TITLE_MARKERS: &[&str] = &[
    "software engineer",
    "software developer",
    "engineer",
    "engineering",
    "developer",
    "devops",
    "site reliability",
    "full stack",
    "full-stack",
    "frontend",
    "front end",
    "backend",
    "back end",
    "data engineer",
    "machine learning",
    "technology analyst",
    "programmer",
    "application support",
    "cybersecurity",
    "cyber security",
    "infrastructure",
    "qa engineer",
    "solutions architect",
];

/// Seniority-escalation markers: leadership phrasing that exempts a role
/// from an otherwise-matching excluded category.
pub const SENIORITY_MARKERS: &[&str] = &["head of", "chief", "director of", "vp of"];

/// Internship/campus-program markers for the job-type classifier.
pub const INTERNSHIP_MARKERS: &[&str] = &[
    "intern",
    "internship",
    "summer analyst",
    "summer associate",
    "graduate program",
    "grad program",
    "trainee",
    "campus",
    "rotational program",
    "off-cycle",
    "spring week",
    "spring intern",
    "winter intern",
    "insight program",
    "insight week",
    "co-op",
    "coop program",
    "placement year",
    "industrial placement",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_tables_nonempty_and_lowercase() {
        for rule in AI_PROOF_RULES.iter().chain(EXCLUDED_RULES) {
            assert!(!rule.keywords.is_empty(), "empty keyword set: {}", rule.name);
            for kw in rule.keywords {
                assert_eq!(*kw, kw.to_lowercase(), "keyword not lowercase: {kw}");
            }
        }
    }

    #[test]
    fn test_declared_category_order() {
        // Scan order is part of the contract.
        let ai: Vec<_> = AI_PROOF_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            ai,
            vec![
                "Investment Banking",
                "Sales & Trading",
                "Portfolio Management",
                "Risk Management",
                "M&A Advisory",
                "Private Equity",
                "Structuring",
            ]
        );
        let excluded: Vec<_> = EXCLUDED_RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            excluded,
            vec![
                "Accounting",
                "Audit",
                "Back Office Operations",
                "Basic Data Science",
                "Compliance Reporting",
                "Administrative Support",
            ]
        );
    }
}
