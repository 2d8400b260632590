// src/intake/parser.rs
//! Rule-based job description parser: labelled fields, section headings,
//! a salary pattern and a skills vocabulary.

use crate::error::IntakeError;
use crate::types::{ParsedJobData, SalaryRange};
use crate::utils::clean_text;
use regex::{Regex, RegexBuilder};

pub trait JobDescriptionParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParsedJobData, IntakeError>;
}

const SKILLS: [&str; 40] = [
    "Rust", "Python", "Java", "JavaScript", "TypeScript", "Golang", "C++", "C#", "Ruby", "PHP",
    "Kotlin", "Swift", "Scala", "SQL", "PostgreSQL", "MySQL", "MongoDB", "Redis", "Kafka",
    "Docker", "Kubernetes", "AWS", "GCP", "Azure", "Terraform", "React", "Angular", "Vue",
    "Node.js", "GraphQL", "REST", "gRPC", "Git", "Linux", "CI/CD", "Machine Learning",
    "TensorFlow", "PyTorch", "Spark", "Airflow",
];

const MIN_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Requirements,
    Responsibilities,
    Benefits,
    Skills,
    Other,
}

pub struct HeuristicParser {
    labeled: Regex,
    title_at: Regex,
    bullet: Regex,
    salary: Regex,
    remote: Regex,
    employment: Regex,
    seniority: Regex,
    skills: Vec<(&'static str, Regex)>,
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

fn build(pattern: &str) -> Regex {
    // Patterns are compile-time constants covered by the unit tests.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
}

impl HeuristicParser {
    pub fn new() -> Self {
        let skills = SKILLS
            .iter()
            .map(|skill| {
                let acronym = skill.len() <= 4 && skill.chars().all(|c| c.is_ascii_uppercase());
                let pattern = format!(
                    r"(?:^|[^A-Za-z0-9])({})(?:$|[^A-Za-z0-9+#])",
                    regex::escape(skill)
                );
                let regex = RegexBuilder::new(&pattern)
                    .case_insensitive(!acronym)
                    .build()
                    .unwrap_or_else(|e| panic!("invalid skill pattern {}: {}", skill, e));
                (*skill, regex)
            })
            .collect();

        Self {
            labeled: build(
                r"(?im)^\s*(job title|title|position|role|company name|company|employer|location|based in)\s*[:\-–]\s*(.+?)\s*$",
            ),
            title_at: build(r"(?i)^(.+?)\s+(?:at|@)\s+(.+)$"),
            bullet: build(r"^\s*(?:[-•*▪◦●]|\d+[.)])\s*"),
            salary: build(
                r"(?i)(?P<cur>[$€£]|usd|eur|gbp|chf)\s?(?P<min>\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s?(?:(?P<mink>k)\b)?(?:\s*(?:-|–|—|to)\s*(?:[$€£]|usd|eur|gbp|chf)?\s?(?P<max>\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)\s?(?:(?P<maxk>k)\b)?)?(?:\s*(?:/|per|an|a)\s*(?P<period>year|yr|annum|hour|hr|month|mo)\b)?",
            ),
            remote: build(r"(?i)\b(remote|work from home|wfh)\b"),
            employment: build(
                r"(?i)\b(full[- ]time|part[- ]time|contractor|contract|temporary|internship|freelance)\b",
            ),
            seniority: build(
                r"(?i)\b(senior|sr|lead|principal|staff|junior|jr|entry[- ]level|graduate|mid[- ]level|intermediate|internship|intern)\b",
            ),
            skills,
        }
    }

    fn strip_bullet<'a>(&self, line: &'a str) -> &'a str {
        match self.bullet.find(line) {
            Some(m) => line[m.end()..].trim(),
            None => line.trim(),
        }
    }

    fn is_bullet(&self, line: &str) -> bool {
        self.bullet.is_match(line) && !line.trim_start().starts_with("**")
    }

    fn classify_heading(&self, line: &str) -> Option<Section> {
        if self.is_bullet(line) {
            return None;
        }
        let trimmed = line.trim().trim_start_matches('#').trim();
        let ends_with_colon = trimmed.ends_with(':');
        let heading = trimmed.trim_end_matches(':').trim().to_lowercase();
        if heading.is_empty() || heading.split_whitespace().count() > 6 {
            return None;
        }

        let has = |needles: &[&str]| needles.iter().any(|n| heading.contains(n));

        if has(&[
            "requirement",
            "qualification",
            "what you'll need",
            "what you will need",
            "what we're looking for",
            "what you bring",
            "must have",
            "who you are",
        ]) {
            Some(Section::Requirements)
        } else if has(&[
            "responsibilit",
            "what you'll do",
            "what you will do",
            "your role",
            "duties",
            "day to day",
        ]) {
            Some(Section::Responsibilities)
        } else if has(&["benefit", "perks", "what we offer", "why join"]) {
            Some(Section::Benefits)
        } else if has(&["skills", "tech stack", "technologies"]) {
            Some(Section::Skills)
        } else if ends_with_colon && !self.labeled.is_match(line) {
            Some(Section::Other)
        } else {
            None
        }
    }

    fn parse_salary(&self, text: &str) -> Option<SalaryRange> {
        let caps = self.salary.captures(text)?;

        let amount = |value: &str, thousands: bool| -> Option<f64> {
            let number: f64 = value.replace(',', "").parse().ok()?;
            Some(if thousands { number * 1000.0 } else { number })
        };

        let max_k = caps.name("maxk").is_some();
        // "$90-120k": a bare lower bound shares the upper bound's multiplier.
        let min_k = caps.name("mink").is_some() || max_k;
        let min = amount(caps.name("min")?.as_str(), min_k)?;
        let max = caps
            .name("max")
            .and_then(|m| amount(m.as_str(), max_k));

        let currency = match caps.name("cur")?.as_str().to_lowercase().as_str() {
            "$" => "USD".to_string(),
            "€" => "EUR".to_string(),
            "£" => "GBP".to_string(),
            other => other.to_uppercase(),
        };

        let period = match caps.name("period").map(|p| p.as_str().to_lowercase()) {
            Some(p) if p == "hour" || p == "hr" => "hour",
            Some(p) if p == "month" || p == "mo" => "month",
            _ => "year",
        };

        Some(SalaryRange {
            min,
            max,
            currency,
            period: period.to_string(),
        })
    }

    fn employment_type(&self, text: &str) -> Option<String> {
        let found = self.employment.captures(text)?.get(1)?.as_str().to_lowercase();
        let normalized = match found.replace(' ', "-").as_str() {
            "full-time" => "full-time",
            "part-time" => "part-time",
            "contract" | "contractor" => "contract",
            "temporary" => "temporary",
            "internship" => "internship",
            _ => "freelance",
        };
        Some(normalized.to_string())
    }

    fn experience_level(&self, haystack: &str) -> Option<String> {
        let found = self.seniority.captures(haystack)?.get(1)?.as_str().to_lowercase();
        let level = match found.replace(' ', "-").as_str() {
            "senior" | "sr" => "senior",
            "lead" | "principal" | "staff" => "lead",
            "junior" | "jr" | "entry-level" | "graduate" => "junior",
            "mid-level" | "intermediate" => "mid",
            _ => "intern",
        };
        Some(level.to_string())
    }
}

impl JobDescriptionParser for HeuristicParser {
    fn parse(&self, text: &str) -> Result<ParsedJobData, IntakeError> {
        let description = clean_text(text);
        if description.is_empty() {
            return Err(IntakeError::EmptyInput);
        }
        if description.split_whitespace().count() < MIN_WORDS {
            return Err(IntakeError::Unrecognized);
        }

        let mut data = ParsedJobData::default();

        for caps in self.labeled.captures_iter(&description) {
            let value = caps[2].to_string();
            let slot = match caps[1].to_lowercase().as_str() {
                "job title" | "title" | "position" | "role" => &mut data.title,
                "company name" | "company" | "employer" => &mut data.company,
                _ => &mut data.location,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        if let Some(first) = description.lines().next() {
            let candidate = self.strip_bullet(first);
            let usable = candidate.len() <= 100
                && self.classify_heading(first).is_none()
                && !self.labeled.is_match(first);
            if usable {
                match self.title_at.captures(candidate) {
                    Some(caps) => {
                        data.title.get_or_insert_with(|| caps[1].trim().to_string());
                        data.company.get_or_insert_with(|| caps[2].trim().to_string());
                    }
                    None => {
                        data.title.get_or_insert_with(|| candidate.to_string());
                    }
                }
            }
        }

        let mut section = Section::Other;
        for line in description.lines() {
            if let Some(next) = self.classify_heading(line) {
                section = next;
                continue;
            }
            let item = self.strip_bullet(line);
            if item.is_empty() || self.labeled.is_match(line) {
                continue;
            }
            match section {
                Section::Requirements => data.requirements.push(item.to_string()),
                Section::Responsibilities => data.responsibilities.push(item.to_string()),
                Section::Benefits => data.benefits.push(item.to_string()),
                Section::Skills | Section::Other => {}
            }
        }

        data.skills = self
            .skills
            .iter()
            .filter(|(_, regex)| regex.is_match(&description))
            .map(|(name, _)| name.to_string())
            .collect();

        data.salary = self.parse_salary(&description);
        data.remote = self.remote.is_match(&description);
        data.employment_type = self.employment_type(&description);
        data.experience_level = data
            .title
            .as_deref()
            .and_then(|title| self.experience_level(title))
            .or_else(|| self.experience_level(&description));
        data.description = description;

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTING: &str = r#"
        Senior Rust Engineer at Acme Robotics
        Location: Berlin, Germany
        Full-time, hybrid or remote within the EU. $120,000 - $150,000 per year

        About the job:
        We build control software for warehouse robots.

        Responsibilities:
        - Design and build services in Rust and Python
        - Own deployments on Kubernetes

        Requirements:
        • 5+ years of backend experience
        • Experience with PostgreSQL and Kafka
        • Familiarity with CI/CD pipelines

        Benefits:
        1. 30 days of paid vacation
        2. Learning budget
    "#;

    #[test]
    fn test_parses_full_posting() {
        let parsed = HeuristicParser::new().parse(POSTING).unwrap();

        assert_eq!(parsed.title.as_deref(), Some("Senior Rust Engineer"));
        assert_eq!(parsed.company.as_deref(), Some("Acme Robotics"));
        assert_eq!(parsed.location.as_deref(), Some("Berlin, Germany"));
        assert_eq!(parsed.employment_type.as_deref(), Some("full-time"));
        assert_eq!(parsed.experience_level.as_deref(), Some("senior"));
        assert!(parsed.remote);

        assert_eq!(
            parsed.responsibilities,
            vec![
                "Design and build services in Rust and Python",
                "Own deployments on Kubernetes"
            ]
        );
        assert_eq!(parsed.requirements.len(), 3);
        assert_eq!(parsed.requirements[0], "5+ years of backend experience");
        assert_eq!(parsed.benefits, vec!["30 days of paid vacation", "Learning budget"]);

        for skill in ["Rust", "Python", "Kubernetes", "PostgreSQL", "Kafka", "CI/CD"] {
            assert!(parsed.skills.contains(&skill.to_string()), "missing {}", skill);
        }
        assert!(!parsed.skills.contains(&"Java".to_string()));

        let salary = parsed.salary.unwrap();
        assert_eq!(salary.min, 120_000.0);
        assert_eq!(salary.max, Some(150_000.0));
        assert_eq!(salary.currency, "USD");
        assert_eq!(salary.period, "year");
    }

    #[test]
    fn test_labelled_fields_win_over_first_line() {
        let text = "We are hiring!\nJob Title: Data Analyst\nCompany: Globex\nWork with SQL daily.";
        let parsed = HeuristicParser::new().parse(text).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Data Analyst"));
        assert_eq!(parsed.company.as_deref(), Some("Globex"));
        assert_eq!(parsed.skills, vec!["SQL"]);
    }

    #[test]
    fn test_salary_shorthand() {
        let parser = HeuristicParser::new();
        let salary = parser.parse_salary("Pay: €90-110k").unwrap();
        assert_eq!(salary.min, 90_000.0);
        assert_eq!(salary.max, Some(110_000.0));
        assert_eq!(salary.currency, "EUR");

        let hourly = parser.parse_salary("£25 per hour").unwrap();
        assert_eq!(hourly.min, 25.0);
        assert_eq!(hourly.max, None);
        assert_eq!(hourly.period, "hour");
    }

    #[test]
    fn test_javascript_is_not_java() {
        let parsed = HeuristicParser::new()
            .parse("Frontend developer\nWe use JavaScript and TypeScript with React.")
            .unwrap();
        assert!(parsed.skills.contains(&"JavaScript".to_string()));
        assert!(!parsed.skills.contains(&"Java".to_string()));
        assert!(parsed.skills.contains(&"React".to_string()));
    }

    #[test]
    fn test_empty_and_too_short_input() {
        let parser = HeuristicParser::new();
        assert!(matches!(parser.parse("   \n\t"), Err(IntakeError::EmptyInput)));
        assert!(matches!(parser.parse("hello"), Err(IntakeError::Unrecognized)));
    }
}
