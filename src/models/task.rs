use clap::ValueEnum;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// UUID to identify the task
    pub id: Uuid,
    /// Title of the task
    pub title: String,
    /// Free-form notes of the task
    pub description: Option<String>,
    /// Category label used for grouping and search
    pub category: Option<String>,
    pub completed: bool,
    /// Archived tasks are hidden from every view but the archive
    pub archived: bool,
    pub priority: Priority,
    /// Deadline; a local midnight means "that day, no specific time"
    pub due_date: Option<Timestamp>,
    pub start_date_time: Option<Timestamp>,
    pub end_date_time: Option<Timestamp>,
    /// Duration in minutes, whichever value was set last
    pub duration: Option<i64>,
    /// Owning task, set on subtasks only
    pub parent_id: Option<Uuid>,
    /// Owning project, set on root tasks only
    pub project_id: Option<Uuid>,
    pub subtasks: Vec<Task>,
    pub is_expanded: bool,
    /// Manual ordering among siblings
    pub order: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort weight, higher is more urgent.
    pub fn weight(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl Task {
    /// Builds a fresh node; `order` and `parent_id` are assigned by the caller.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            category: None,
            completed: false,
            archived: false,
            priority: Priority::default(),
            due_date: None,
            start_date_time: None,
            end_date_time: None,
            duration: None,
            parent_id: None,
            project_id: None,
            subtasks: vec![],
            is_expanded: false,
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.due_date.is_some() || self.start_date_time.is_some() || self.end_date_time.is_some()
    }

    /// Minutes between start and end, when both are set and end comes after start.
    pub fn span_minutes(&self) -> Option<i64> {
        minutes_between(self.start_date_time?, self.end_date_time?)
    }

    pub fn is_overdue(&self, now: Timestamp) -> bool {
        !self.completed && !self.archived && self.due_date.is_some_and(|due| due < now)
    }

    pub fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }
}

/// Caller-supplied fields of a new task. Identity, timestamps, order and
/// parent link are assigned by the tree operations.
#[derive(Debug, Default, Clone)]
pub struct AddTaskParameters {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Priority,
    pub completed: bool,
    pub due_date: Option<Timestamp>,
    pub start_date_time: Option<Timestamp>,
    pub end_date_time: Option<Timestamp>,
    pub duration: Option<i64>,
    pub project_id: Option<Uuid>,
}

impl AddTaskParameters {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub(crate) fn into_task(self) -> Task {
        let mut task = Task::new(self.title);
        task.description = self.description;
        task.category = self.category;
        task.priority = self.priority;
        task.completed = self.completed;
        task.due_date = self.due_date;
        task.start_date_time = self.start_date_time;
        task.end_date_time = self.end_date_time;
        task.duration = self.duration;
        task.project_id = self.project_id;
        task
    }
}

/// Partial update merged into a task. `None` leaves a field alone; for
/// optional fields `Some(None)` clears the value.
#[derive(Debug, Default, Clone)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub completed: Option<bool>,
    pub archived: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<Timestamp>>,
    pub start_date_time: Option<Option<Timestamp>>,
    pub end_date_time: Option<Option<Timestamp>>,
    pub duration: Option<Option<i64>>,
    pub project_id: Option<Option<Uuid>>,
    pub is_expanded: Option<bool>,
    pub order: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.completed.is_none()
            && self.archived.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.start_date_time.is_none()
            && self.end_date_time.is_none()
            && self.duration.is_none()
            && self.project_id.is_none()
            && self.is_expanded.is_none()
            && self.order.is_none()
    }

    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(archived) = self.archived {
            task.archived = archived;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(start) = self.start_date_time {
            task.start_date_time = start;
        }
        if let Some(end) = self.end_date_time {
            task.end_date_time = end;
        }
        if let Some(duration) = self.duration {
            task.duration = duration;
        }
        if let Some(project_id) = self.project_id {
            task.project_id = project_id;
        }
        if let Some(is_expanded) = self.is_expanded {
            task.is_expanded = is_expanded;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        task.touch();
    }
}

/// Whole minutes from `start` to `end`, or `None` unless `end` is later.
pub fn minutes_between(start: Timestamp, end: Timestamp) -> Option<i64> {
    if end <= start {
        return None;
    }
    Some(end.duration_since(start).as_secs() / 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_minutes() {
        let mut task = Task::new("Workshop");
        task.start_date_time = Some("2024-06-10T09:00:00Z".parse().unwrap());
        task.end_date_time = Some("2024-06-10T10:30:00Z".parse().unwrap());
        assert_eq!(task.span_minutes(), Some(90));

        task.end_date_time = Some("2024-06-10T08:00:00Z".parse().unwrap());
        assert_eq!(task.span_minutes(), None);
    }

    #[test]
    fn test_minutes_between_truncates_partial_minutes() {
        let start: Timestamp = "2024-06-10T09:00:00Z".parse().unwrap();
        let end: Timestamp = "2024-06-10T09:02:59.5Z".parse().unwrap();
        assert_eq!(minutes_between(start, end), Some(2));
        assert_eq!(minutes_between(start, start), None);
        assert_eq!(minutes_between(end, start), None);
    }

    #[test]
    fn test_patch_clears_optional_fields() {
        let mut task = Task::new("Write report");
        task.category = Some(String::from("work"));

        TaskPatch {
            category: Some(None),
            priority: Some(Priority::High),
            ..TaskPatch::default()
        }
        .apply(&mut task);

        assert_eq!(task.category, None);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.title, "Write report");
    }

    #[test]
    fn test_priority_serializes_lowercase() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
