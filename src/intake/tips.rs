// src/intake/tips.rs
use crate::utils::{host_matches, url_host};

/// The panel never shows more than this many tips.
pub const MAX_TIPS_SHOWN: usize = 4;

const ATS_DOMAINS: [&str; 3] = ["myworkdayjobs.com", "greenhouse.io", "lever.co"];

const GENERIC_TIPS: [&str; 5] = [
    "Open the job posting in a new tab and select the full description text",
    "Copy it with Ctrl+C (Cmd+C on macOS) and paste it into the text box",
    "Include the job title, company name and requirements for the best results",
    "If the page needs a login, sign in first and then copy the text",
    "Save the page as PDF and upload the file instead",
];

/// Advice for getting a job description out of a site that refuses automated requests.
pub fn extraction_tips(url: Option<&str>) -> Vec<String> {
    let host = url.and_then(url_host).unwrap_or_default();
    let on_ats = ATS_DOMAINS.iter().any(|domain| host_matches(&host, domain));

    let specific: &[&str] = if host_matches(&host, "linkedin.com") {
        &[
            "LinkedIn blocks automated access to job postings",
            "Click \"See more\" under About the job before copying",
        ]
    } else if host_matches(&host, "indeed.com") {
        &["Indeed blocks automated requests; open the full job page, not the search results pane"]
    } else if host_matches(&host, "glassdoor.com") {
        &["Glassdoor may require signing in before the full description is visible"]
    } else if on_ats {
        &["Applicant tracking systems load descriptions with scripts; wait for the page to finish loading"]
    } else {
        &[]
    };

    specific
        .iter()
        .chain(GENERIC_TIPS.iter())
        .map(|tip| tip.to_string())
        .collect()
}
