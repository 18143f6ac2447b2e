pub mod client;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use {once_cell::sync::Lazy, regex::Regex};

/// Column metadata as the record store reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumnMeta {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One column value on a record: raw text plus the store's structured value
/// where one exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnValue {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub column_values: Vec<ColumnValue>,
}

/// Flat snapshot of the external board: column metadata plus all records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub columns: Vec<BoardColumnMeta>,
    #[serde(default)]
    pub records: Vec<BoardRecord>,
}

impl Board {
    pub fn column_meta(&self, id: &str) -> Option<&BoardColumnMeta> {
        self.columns.iter().find(|col| col.id == id)
    }

    pub fn record(&self, id: &str) -> Option<&BoardRecord> {
        self.records.iter().find(|rec| rec.id == id)
    }
}

impl BoardRecord {
    pub fn display_name(&self) -> String {
        self.name.as_deref().unwrap_or_default().trim().to_string()
    }

    pub fn column(&self, id: &str) -> Option<&ColumnValue> {
        self.column_values.iter().find(|col| col.id == id)
    }

    /// Trimmed display text of a column, empty when absent.
    pub fn column_text(&self, id: &str) -> String {
        self.column(id)
            .and_then(|col| col.text.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }

    /// Tri-state checkbox read: the structured `checked` field wins, then a
    /// lenient parse of the display text, then unset.
    pub fn checkbox_state(&self, id: &str) -> Option<bool> {
        let col = self.column(id)?;
        if let Some(value) = &col.value
            && let Some(checked) = parse_checked_field(value)
        {
            return Some(checked);
        }
        match self
            .column_text(id)
            .to_lowercase()
            .as_str()
        {
            "v" | "true" | "yes" | "checked" => Some(true),
            "false" | "no" | "unchecked" => Some(false),
            _ => None,
        }
    }
}

fn parse_checked_field(value: &Value) -> Option<bool> {
    // Structured values sometimes arrive double-encoded as JSON strings.
    let parsed;
    let object = match value {
        Value::String(raw) => {
            parsed = serde_json::from_str::<Value>(raw).ok()?;
            &parsed
        }
        other => other,
    };
    match object.get("checked")? {
        Value::Bool(flag) => Some(*flag),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

/// True when a record's scope status column marks it for reconciliation:
/// either the display text equals the scope label, or the structured status
/// index is 1.
pub fn scope_status_matches(scope_label: &str, text: Option<&str>, value: Option<&Value>) -> bool {
    if text
        .map(str::trim)
        .is_some_and(|t| t.eq_ignore_ascii_case(scope_label))
    {
        return true;
    }
    let Some(value) = value else { return false };
    let parsed;
    let object = match value {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(_) => return false,
        },
        other => other,
    };
    object
        .get("index")
        .and_then(Value::as_i64)
        .is_some_and(|idx| idx == 1)
}

static COLLECTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i) collection$").unwrap());

/// Names excluded from reconciliation even when in scope: branding rows and
/// whole-collection rollups are curated by hand.
pub fn name_is_excluded(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.to_lowercase().contains("branding") || COLLECTION_RE.is_match(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(id: &str, text: Option<&str>, value: Option<Value>) -> BoardRecord {
        BoardRecord {
            id: "1".into(),
            name: Some("Example".into()),
            column_values: vec![ColumnValue {
                id: id.into(),
                text: text.map(String::from),
                value,
            }],
        }
    }

    #[test]
    fn checkbox_prefers_structured_value_over_text() {
        let rec = record_with("flag", Some("no"), Some(json!({"checked": "true"})));
        assert_eq!(rec.checkbox_state("flag"), Some(true));

        let rec = record_with("flag", Some("v"), None);
        assert_eq!(rec.checkbox_state("flag"), Some(true));

        let rec = record_with("flag", Some("unchecked"), None);
        assert_eq!(rec.checkbox_state("flag"), Some(false));

        let rec = record_with("flag", Some("maybe"), None);
        assert_eq!(rec.checkbox_state("flag"), None);
    }

    #[test]
    fn double_encoded_checkbox_values_parse() {
        let rec = record_with("flag", None, Some(json!("{\"checked\":false}")));
        assert_eq!(rec.checkbox_state("flag"), Some(false));
    }

    #[test]
    fn scope_matches_by_label_or_status_index() {
        assert!(scope_status_matches("In Marcomms", Some(" in marcomms "), None));
        assert!(scope_status_matches("In Marcomms", None, Some(&json!({"index": 1}))));
        assert!(scope_status_matches("In Marcomms", None, Some(&json!("{\"index\":1}"))));
        assert!(!scope_status_matches("In Marcomms", Some("Done"), Some(&json!({"index": 3}))));
        assert!(!scope_status_matches("In Marcomms", None, None));
    }

    #[test]
    fn branding_and_collection_names_are_excluded() {
        assert!(name_is_excluded("Emirates Branding Loop"));
        assert!(name_is_excluded("Mr Bean Collection"));
        assert!(name_is_excluded("best of COLLECTION"));
        assert!(!name_is_excluded("Collection Day"));
        assert!(!name_is_excluded("The Recollection"));
    }
}
