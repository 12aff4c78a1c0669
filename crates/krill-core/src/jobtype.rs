//! Internship vs full-time classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::INTERNSHIP_MARKERS;

/// Job type of a posting. Everything that is not recognizably an
/// internship or campus program is full-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    Internship,
    FullTime,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Internship => "Internship",
            JobType::FullTime => "Full Time",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Internship" => Ok(JobType::Internship),
            "Full Time" => Ok(JobType::FullTime),
            _ => Err(format!("Unknown job type: {s}")),
        }
    }
}

/// Classify a posting as internship or full-time.
///
/// Case-insensitive first-match scan of title+description against a fixed
/// marker set. No override logic.
pub fn classify_job_type(title: &str, description: &str) -> JobType {
    let text = format!("{} {}", title, description).to_lowercase();
    if INTERNSHIP_MARKERS.iter().any(|kw| text.contains(kw)) {
        JobType::Internship
    } else {
        JobType::FullTime
    }
}
