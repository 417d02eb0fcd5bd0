use crate::model::{Comment, Issue};
use crate::sla::SlaTarget;
use serde::Serialize;

/// Issue with its comments for `show`.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: Issue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

/// Result of `create`: the stored issue and the SLA target behind its due date.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub sla: SlaTarget,
}

/// One resolved config entry for `config`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    /// Layer the winning value came from.
    pub source: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Severity};
    use crate::sla::calculate_target;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn test_details_flatten_issue() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let issue = Issue::new("Crash", Uuid::nil(), Uuid::nil(), now);
        let details = IssueDetails {
            issue: issue.clone(),
            comments: vec![],
        };
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["title"], "Crash");
        assert_eq!(json["status"], "NEW");
        assert!(json.get("comments").is_none());

        let created = CreatedIssue {
            sla: calculate_target(&Priority::P0, &Severity::S2, now),
            issue,
        };
        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["sla"]["hours"], 4);
        assert_eq!(json["priority"], "P2");
    }
}
