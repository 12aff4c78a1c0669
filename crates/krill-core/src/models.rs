use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A posting as returned by a site scraper, before classification,
/// normalization or deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPosting {
    pub company: String,
    pub title: String,
    /// Free-text location exactly as the career site renders it.
    /// Discarded after normalization; only the canonical form is stored.
    pub location: String,
    pub description: String,
    pub source_website: String,
    pub job_url: String,
    pub post_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Lifecycle status of a stored posting. The core only ever creates
/// postings as `Active`; archival belongs to the surrounding code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingStatus {
    Active,
    Inactive,
}

impl PostingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostingStatus::Active => "active",
            PostingStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for PostingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(PostingStatus::Active),
            "inactive" => Ok(PostingStatus::Inactive),
            _ => Err(format!("Unknown posting status: {s}")),
        }
    }
}

/// A stored, classified job posting.
///
/// Identity is `job_hash`, not `job_url`: some career sites rotate URLs
/// between scrapes of the same posting.
#[derive(Debug, Clone, Serialize)]
pub struct JobPosting {
    pub id: Uuid,
    /// SHA-256 over (company, title, normalized location), lowercased/trimmed.
    pub job_hash: String,
    pub company: String,
    pub title: String,
    /// Canonical "Country - City" location (or "Global").
    pub location: String,
    pub description: String,
    pub description_hash: Option<String>,
    pub source_website: String,
    pub job_url: String,
    pub is_ai_proof: bool,
    pub ai_proof_category: String,
    pub job_type: String,
    pub post_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: PostingStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// DTO for inserting a new posting into the database.
#[derive(Debug, Clone, Serialize)]
pub struct NewJobPosting {
    pub job_hash: String,
    pub company: String,
    pub title: String,
    pub location: String,
    pub description: String,
    pub description_hash: Option<String>,
    pub source_website: String,
    pub job_url: String,
    pub is_ai_proof: bool,
    pub ai_proof_category: String,
    pub job_type: String,
    pub post_date: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
}

/// Compute the deduplication hash for a posting.
///
/// SHA-256 hex over the lowercased, trimmed concatenation of company,
/// title, and normalized location. Stable across calls and restarts;
/// case-insensitive on letter case, sensitive to content.
pub fn job_hash(company: &str, title: &str, location: &str) -> String {
    let data = format!("{}{}{}", company, title, location)
        .to_lowercase()
        .trim()
        .to_string();
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SHA-256 hex of a posting description, for change detection by
/// surrounding code. `None` for empty descriptions.
pub fn description_hash(description: &str) -> Option<String> {
    if description.is_empty() {
        return None;
    }
    let mut hasher = Sha256::new();
    hasher.update(description.as_bytes());
    Some(format!("{:x}", hasher.finalize()))
}
