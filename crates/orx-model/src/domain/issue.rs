use serde::{Deserialize, Deserializer, Serialize};

/// Issue record as supplied by the issue store.
///
/// Missing and `null` fields deserialize as empty strings; validation happens when a spec is
/// built from the record, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub acceptance_criteria: String,
}

impl Issue {
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            acceptance_criteria: String::new(),
        }
    }

    pub fn with_acceptance_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.acceptance_criteria = criteria.into();
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::Issue;

    #[test]
    fn null_and_missing_fields_are_empty() {
        let issue: Issue =
            serde_json::from_str(r#"{"id":"orx-12","title":null,"description":"do it"}"#).unwrap();
        assert_eq!(issue.id, "orx-12");
        assert_eq!(issue.title, "");
        assert_eq!(issue.description, "do it");
        assert_eq!(issue.acceptance_criteria, "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let issue: Issue = serde_json::from_str(
            r#"{"id":"orx-1","status":"open","priority":2,"acceptance_criteria":"tests pass"}"#,
        )
        .unwrap();
        assert_eq!(issue.acceptance_criteria, "tests pass");
    }
}
