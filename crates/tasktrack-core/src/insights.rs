use serde::{Deserialize, Serialize};

use crate::task::Priority;

/// One row of the grouped-by-priority aggregate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: i64,
}

/// Read-only aggregate over the full task set, with a derived
/// natural-language summary. Field names follow the wire payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsReport {
    pub total_tasks: i64,
    pub by_priority: Vec<PriorityCount>,
    pub due_soon: i64,
    pub summary: String,
}

impl InsightsReport {
    pub fn new(total_tasks: i64, by_priority: Vec<PriorityCount>, due_soon: i64) -> Self {
        let summary = compose_summary(total_tasks, &by_priority, due_soon);
        Self {
            total_tasks,
            by_priority,
            due_soon,
            summary,
        }
    }
}

/// "You have N tasks." then either "Most are High priority." or "Keep it
/// up!", then "N task(s) are due soon."
///
/// The middle sentence fires on the mere presence of a High bucket, not on
/// High holding the largest count. That is the shipped behavior and callers
/// depend on the literal wording, so it stays.
fn compose_summary(total: i64, by_priority: &[PriorityCount], due_soon: i64) -> String {
    let middle = match by_priority.iter().find(|g| g.priority == Priority::High) {
        Some(group) => format!("Most are {} priority.", group.priority),
        None => "Keep it up!".to_string(),
    };
    format!("You have {total} tasks. {middle} {due_soon} task(s) are due soon.")
}
