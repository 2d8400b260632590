use serde::{Deserialize, Serialize};

/// Structured view of a job description, produced by the parser and handed
/// to the caller untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedJobData {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary: Option<SalaryRange>,
    pub remote: bool,
    pub skills: Vec<String>,
    pub requirements: Vec<String>,
    pub responsibilities: Vec<String>,
    pub benefits: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: Option<f64>,
    pub currency: String,
    /// "year", "month" or "hour"
    pub period: String,
}
