//! Traversals over the task forest.
//!
//! Every tree operation locates nodes through these helpers, so a missing id
//! is reported the same way everywhere: `None` / `false`, never a panic.

use uuid::Uuid;

use crate::models::task::Task;

pub fn find(tasks: &[Task], id: Uuid) -> Option<&Task> {
    for task in tasks {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find(&task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

pub fn find_mut(tasks: &mut [Task], id: Uuid) -> Option<&mut Task> {
    for task in tasks.iter_mut() {
        if task.id == id {
            return Some(task);
        }
        if let Some(found) = find_mut(&mut task.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Runs `transform` on the node with the given id, wherever it sits.
/// Returns whatever the transform returned, or `None` on a miss.
pub fn update<R>(tasks: &mut [Task], id: Uuid, transform: impl FnOnce(&mut Task) -> R) -> Option<R> {
    find_mut(tasks, id).map(transform)
}

/// Detaches the node (and its whole subtree) from the forest.
pub fn remove(tasks: &mut Vec<Task>, id: Uuid) -> Option<Task> {
    if let Some(position) = tasks.iter().position(|t| t.id == id) {
        return Some(tasks.remove(position));
    }
    for task in tasks.iter_mut() {
        if let Some(removed) = remove(&mut task.subtasks, id) {
            return Some(removed);
        }
    }
    None
}

/// Drops every node, at any depth, for which `keep` is false. A dropped node
/// takes its subtree with it. Returns how many nodes left the forest.
pub fn retain(tasks: &mut Vec<Task>, keep: &impl Fn(&Task) -> bool) -> usize {
    let mut removed = 0;
    tasks.retain(|task| {
        if keep(task) {
            true
        } else {
            removed += count(std::slice::from_ref(task));
            false
        }
    });
    for task in tasks.iter_mut() {
        removed += retain(&mut task.subtasks, keep);
    }
    removed
}

/// Visits every node, parents before subtasks.
pub fn for_each_mut(tasks: &mut [Task], visit: &mut impl FnMut(&mut Task)) {
    for task in tasks.iter_mut() {
        visit(task);
        for_each_mut(&mut task.subtasks, visit);
    }
}

pub fn flatten(tasks: &[Task]) -> Vec<&Task> {
    let mut out = Vec::new();
    collect(tasks, &mut out);
    out
}

fn collect<'a>(tasks: &'a [Task], out: &mut Vec<&'a Task>) {
    for task in tasks {
        out.push(task);
        collect(&task.subtasks, out);
    }
}

pub fn count(tasks: &[Task]) -> usize {
    tasks.iter().map(|t| 1 + count(&t.subtasks)).sum()
}

/// The sibling group under `parent`, or the root list when `parent` is `None`.
pub fn siblings_mut(tasks: &mut Vec<Task>, parent: Option<Uuid>) -> Option<&mut Vec<Task>> {
    match parent {
        None => Some(tasks),
        Some(parent_id) => find_mut(tasks, parent_id).map(|p| &mut p.subtasks),
    }
}

pub fn siblings(tasks: &[Task], parent: Option<Uuid>) -> Option<&[Task]> {
    match parent {
        None => Some(tasks),
        Some(parent_id) => find(tasks, parent_id).map(|p| p.subtasks.as_slice()),
    }
}

/// Next free `order` value in a sibling group (0 for an empty group).
pub fn next_order(siblings: &[Task]) -> i64 {
    siblings.iter().map(|t| t.order).max().map_or(0, |max| max + 1)
}

/// A sibling group in ascending manual order.
pub fn ordered(siblings: &[Task]) -> Vec<&Task> {
    let mut ordered: Vec<&Task> = siblings.iter().collect();
    ordered.sort_by_key(|t| t.order);
    ordered
}

/// Whether `id` sits somewhere below `ancestor`.
pub fn is_descendant(tasks: &[Task], ancestor: Uuid, id: Uuid) -> bool {
    find(tasks, ancestor).is_some_and(|node| find(&node.subtasks, id).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(title: &str, subtasks: Vec<Task>) -> Task {
        let mut task = Task::new(title);
        task.subtasks = subtasks;
        task
    }

    #[test]
    fn test_find_at_depth() {
        let forest = vec![node("a", vec![node("b", vec![node("c", vec![])])])];
        let c = forest[0].subtasks[0].subtasks[0].id;
        assert_eq!(find(&forest, c).map(|t| t.title.as_str()), Some("c"));
        assert!(find(&forest, Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_update_reports_miss() {
        let mut forest = vec![node("a", vec![])];
        assert_eq!(update(&mut forest, Uuid::new_v4(), |t| t.completed = true), None);
        assert!(!forest[0].completed);
    }

    #[test]
    fn test_retain_counts_dropped_subtrees() {
        let mut forest = vec![
            node("keep", vec![node("drop", vec![node("child", vec![])])]),
            node("drop", vec![]),
        ];
        let removed = retain(&mut forest, &|t| t.title != "drop");
        assert_eq!(removed, 3);
        assert_eq!(count(&forest), 1);
    }

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(&[]), 0);
        let mut a = Task::new("a");
        a.order = 4;
        let b = Task::new("b");
        assert_eq!(next_order(&[a, b]), 5);
    }

    #[test]
    fn test_ordered_borrows_from_the_group() {
        let mut parent = node("parent", vec![node("a", vec![]), node("b", vec![]), node("c", vec![])]);
        parent.subtasks[0].order = 2;
        parent.subtasks[1].order = 0;
        parent.subtasks[2].order = 1;

        let titles: Vec<&str> = ordered(&parent.subtasks).iter().map(|t| t.title.as_str()).collect();

        assert_eq!(titles, ["b", "c", "a"]);
    }

    #[test]
    fn test_is_descendant() {
        let forest = vec![node("a", vec![node("b", vec![node("c", vec![])])])];
        let a = forest[0].id;
        let c = forest[0].subtasks[0].subtasks[0].id;
        assert!(is_descendant(&forest, a, c));
        assert!(!is_descendant(&forest, c, a));
        assert!(!is_descendant(&forest, a, a));
    }
}
