use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One tracked application, as found in an exported applications template.
///
/// Every field is optional and unknown fields are ignored, so templates from
/// older exports still load. A field of the wrong type reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationData {
    #[serde(deserialize_with = "lenient_text")]
    pub company_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub position: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub location: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub job_url: Option<String>,
    #[serde(deserialize_with = "lenient_amount")]
    pub salary_min: Option<f64>,
    #[serde(deserialize_with = "lenient_amount")]
    pub salary_max: Option<f64>,
    #[serde(deserialize_with = "lenient_text")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub date_applied: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub deadline: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub follow_up_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub contact_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub contact_email: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub notes: Option<String>,
}

impl ApplicationData {
    /// "Engineer at Acme", with placeholders for missing fields.
    pub fn headline(&self) -> String {
        format!(
            "{} at {}",
            self.position.as_deref().unwrap_or("Unknown position"),
            self.company_name.as_deref().unwrap_or("Unknown company")
        )
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Numbers, or strings such as "120000" and "$120,000".
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            digits.parse().ok()
        }
        _ => None,
    })
}

/// Pulls `applications[0]` out of a template document.
///
/// `None` when `applications` is missing, not an array, or empty. An entry
/// that is not an object comes back as an empty record.
pub fn first_application(document: &Value) -> Option<ApplicationData> {
    document
        .get("applications")
        .and_then(Value::as_array)
        .and_then(|apps| apps.first())
        .map(|first| ApplicationData::deserialize(first).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_headline_uses_position_and_company() {
        let app = ApplicationData {
            position: Some("Engineer".to_string()),
            company_name: Some("Acme".to_string()),
            ..Default::default()
        };
        assert_eq!(app.headline(), "Engineer at Acme");
    }

    #[test]
    fn test_headline_placeholders() {
        assert_eq!(
            ApplicationData::default().headline(),
            "Unknown position at Unknown company"
        );
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let doc = json!({"version": 2, "applications": [{"position": "Dev", "priority": "high"}]});
        let first = first_application(&doc).unwrap();
        assert_eq!(first.position.as_deref(), Some("Dev"));
        assert!(first.company_name.is_none());
    }

    #[test]
    fn test_only_first_application_is_taken() {
        let doc = json!({"applications": [{"position": "A"}, {"position": "B"}]});
        let first = first_application(&doc).unwrap();
        assert_eq!(first.position.as_deref(), Some("A"));
    }

    #[test]
    fn test_missing_or_empty_applications() {
        assert!(first_application(&json!({"jobs": []})).is_none());
        assert!(first_application(&json!({"applications": []})).is_none());
        assert!(first_application(&json!({"applications": "none"})).is_none());
    }

    #[test]
    fn test_wrongly_typed_fields_are_dropped() {
        let doc = json!({"applications": [{
            "position": "Engineer",
            "company_name": "Acme",
            "salary_min": "120000",
            "salary_max": "lots",
            "location": ["Berlin"],
            "notes": 42
        }]});
        let first = first_application(&doc).unwrap();
        assert_eq!(first.headline(), "Engineer at Acme");
        assert_eq!(first.salary_min, Some(120000.0));
        assert!(first.salary_max.is_none());
        assert!(first.location.is_none());
        assert_eq!(first.notes.as_deref(), Some("42"));
    }

    #[test]
    fn test_non_object_entry_is_an_empty_record() {
        let doc = json!({"applications": ["Engineer at Acme", {"position": "B"}]});
        assert_eq!(first_application(&doc), Some(ApplicationData::default()));
    }
}
