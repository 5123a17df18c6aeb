//! Derived task lists and counters.
//!
//! Everything here is a pure projection of the forest plus the current view
//! state and is recomputed from scratch on every read.

use std::cmp::Ordering;

use clap::ValueEnum;
use jiff::Timestamp;
use uuid::Uuid;

use crate::models::{
    task::{Priority, Task},
    tree,
};

/// Status dimension of the task list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Filter {
    /// Everything except archived tasks
    #[default]
    All,
    Active,
    Completed,
    Archived,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Manual order
    #[default]
    Created,
    Priority,
    DueDate,
    Alphabetical,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub filter: Filter,
    pub sort: SortKey,
    pub search: String,
    /// Restricts the list to root tasks of one project
    pub project: Option<Uuid>,
}

impl Filter {
    pub fn admits(self, task: &Task) -> bool {
        match self {
            Filter::All => !task.archived,
            Filter::Active => !task.completed && !task.archived,
            Filter::Completed => task.completed && !task.archived,
            Filter::Archived => task.archived,
        }
    }
}

/// Root tasks ready for display. Subtasks travel with their parent.
pub fn visible_tasks<'a>(tasks: &'a [Task], view: &ViewState) -> Vec<&'a Task> {
    let needle = view.search.trim().to_lowercase();

    let mut visible: Vec<&Task> = tasks
        .iter()
        .filter(|t| view.project.is_none_or(|project| t.project_id == Some(project)))
        .filter(|t| needle.is_empty() || matches_search(t, &needle))
        .filter(|t| view.filter.admits(t))
        .collect();

    sort_tasks(&mut visible, view.sort);
    visible
}

/// Case-insensitive match on title, description or category of the task or
/// any of its descendants. `needle` must already be lowercase.
pub fn matches_search(task: &Task, needle: &str) -> bool {
    let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(needle));

    hit(Some(&task.title))
        || hit(task.description.as_deref())
        || hit(task.category.as_deref())
        || task.subtasks.iter().any(|s| matches_search(s, needle))
}

/// Ties fall back to manual order.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    tasks.sort_by_key(|t| t.order);
    match key {
        SortKey::Created => {}
        SortKey::Priority => tasks.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight())),
        SortKey::DueDate => tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortKey::Alphabetical => tasks.sort_by(|a, b| compare_titles(&a.title, &b.title)),
    }
}

/// Case-insensitive first; on a tie lowercase comes before uppercase.
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskStats {
    /// Non-archived tasks; always `active + completed`
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub archived: usize,
    pub high_priority: usize,
    pub overdue: usize,
}

/// Counters over the whole forest, subtasks included.
pub fn stats(tasks: &[Task], now: Timestamp) -> TaskStats {
    stats_over(tree::flatten(tasks), now)
}

/// Same counters restricted to one project's root tasks and their subtrees.
pub fn project_stats(tasks: &[Task], project_id: Uuid, now: Timestamp) -> TaskStats {
    let owned: Vec<&Task> = tasks
        .iter()
        .filter(|t| t.project_id == Some(project_id))
        .flat_map(|t| tree::flatten(std::slice::from_ref(t)))
        .collect();
    stats_over(owned, now)
}

fn stats_over(all: Vec<&Task>, now: Timestamp) -> TaskStats {
    let mut stats = TaskStats::default();
    for task in all {
        if task.archived {
            stats.archived += 1;
            continue;
        }
        stats.total += 1;
        if task.completed {
            stats.completed += 1;
        } else {
            stats.active += 1;
            if task.priority == Priority::High {
                stats.high_priority += 1;
            }
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, order: i64) -> Task {
        let mut task = Task::new(title);
        task.order = order;
        task
    }

    fn titles(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_filters_partition_archived() {
        let mut open = task("open", 0);
        open.completed = false;
        let mut done = task("done", 1);
        done.completed = true;
        let mut shelved = task("shelved", 2);
        shelved.completed = true;
        shelved.archived = true;
        let forest = vec![open, done, shelved];

        let view = |filter| ViewState {
            filter,
            ..ViewState::default()
        };
        assert_eq!(titles(&visible_tasks(&forest, &view(Filter::All))), ["open", "done"]);
        assert_eq!(titles(&visible_tasks(&forest, &view(Filter::Active))), ["open"]);
        assert_eq!(titles(&visible_tasks(&forest, &view(Filter::Completed))), ["done"]);
        assert_eq!(titles(&visible_tasks(&forest, &view(Filter::Archived))), ["shelved"]);
    }

    #[test]
    fn test_search_keeps_ancestor_of_matching_subtask() {
        let mut parent = task("Plan trip", 0);
        let mut child = task("Book hotel", 0);
        child.description = Some(String::from("Near the BEACH"));
        parent.subtasks.push(child);
        let mut other = task("Groceries", 1);
        other.category = Some(String::from("home"));
        let forest = vec![parent, other];

        let view = ViewState {
            search: String::from("beach"),
            ..ViewState::default()
        };
        assert_eq!(titles(&visible_tasks(&forest, &view)), ["Plan trip"]);

        let view = ViewState {
            search: String::from("HOME"),
            ..ViewState::default()
        };
        assert_eq!(titles(&visible_tasks(&forest, &view)), ["Groceries"]);
    }

    #[test]
    fn test_sort_by_due_date_puts_undated_last() {
        let a = task("A", 0);
        let mut b = task("B", 1);
        b.due_date = Some("2030-01-02T14:00:00Z".parse().unwrap());
        let c = task("C", 2);
        let mut d = task("D", 3);
        d.due_date = Some("2030-01-01T09:00:00Z".parse().unwrap());
        let forest = vec![a, b, c, d];

        let view = ViewState {
            sort: SortKey::DueDate,
            ..ViewState::default()
        };
        assert_eq!(titles(&visible_tasks(&forest, &view)), ["D", "B", "A", "C"]);
    }

    #[test]
    fn test_sort_by_priority_and_title() {
        let mut low = task("beta", 0);
        low.priority = Priority::Low;
        let mut high = task("Alpha", 1);
        high.priority = Priority::High;
        let medium = task("alpha", 2);
        let forest = vec![low, high, medium];

        let by = |sort| ViewState {
            sort,
            ..ViewState::default()
        };
        assert_eq!(
            titles(&visible_tasks(&forest, &by(SortKey::Priority))),
            ["Alpha", "alpha", "beta"]
        );
        assert_eq!(
            titles(&visible_tasks(&forest, &by(SortKey::Alphabetical))),
            ["alpha", "Alpha", "beta"]
        );
        assert_eq!(
            titles(&visible_tasks(&forest, &by(SortKey::Created))),
            ["beta", "Alpha", "alpha"]
        );
    }

    #[test]
    fn test_project_scope() {
        let project = Uuid::new_v4();
        let mut owned = task("owned", 0);
        owned.project_id = Some(project);
        let loose = task("loose", 1);
        let forest = vec![owned, loose];

        let view = ViewState {
            project: Some(project),
            ..ViewState::default()
        };
        assert_eq!(titles(&visible_tasks(&forest, &view)), ["owned"]);
    }

    #[test]
    fn test_stats_over_nested_forest() {
        let now: Timestamp = "2030-06-01T00:00:00Z".parse().unwrap();

        let mut root = task("root", 0);
        root.priority = Priority::High;
        root.due_date = Some("2030-05-01T00:00:00Z".parse().unwrap());
        let mut done_child = task("done child", 0);
        done_child.completed = true;
        done_child.priority = Priority::High;
        let mut archived_child = task("archived child", 1);
        archived_child.archived = true;
        archived_child.due_date = Some("2030-05-01T00:00:00Z".parse().unwrap());
        root.subtasks = vec![done_child, archived_child];
        let mut future = task("future", 1);
        future.due_date = Some("2030-07-01T00:00:00Z".parse().unwrap());

        let stats = stats(&[root, future], now);
        assert_eq!(
            stats,
            TaskStats {
                total: 3,
                completed: 1,
                active: 2,
                archived: 1,
                high_priority: 1,
                overdue: 1,
            }
        );
        assert_eq!(stats.total, stats.active + stats.completed);
    }

    #[test]
    fn test_project_stats() {
        let now = Timestamp::now();
        let project = Uuid::new_v4();
        let mut owned = task("owned", 0);
        owned.project_id = Some(project);
        owned.subtasks.push(task("child", 0));
        let loose = task("loose", 1);

        let stats = project_stats(&[owned, loose], project, now);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 2);
    }
}
