use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::lenient;

/// A task as returned by `GET /tasks?minimal=1`, keyed by its id.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(deserialize_with = "lenient::int")]
    pub task_id: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub parent_id: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub assigned_by: i64,
    pub name: String,
    #[serde(deserialize_with = "lenient::int")]
    pub level: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub budget_unit: String,
    #[serde(deserialize_with = "lenient::int")]
    pub root_group_id: i64,
}

impl Task {
    pub fn is_top_level(&self) -> bool {
        self.parent_id == 0
    }
}

pub type Tasks = BTreeMap<String, Task>;

pub fn find_task(tasks: &Tasks, task_id: i64) -> Option<&Task> {
    tasks.values().find(|task| task.task_id == task_id)
}

fn by_name(a: &&Task, b: &&Task) -> std::cmp::Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then(a.task_id.cmp(&b.task_id))
}

/// First top-level task, in case-insensitive name order, whose name starts
/// with `prefix`.
pub fn parent_task_by_prefix<'a>(tasks: &'a Tasks, prefix: &str) -> Option<&'a Task> {
    let prefix = prefix.to_lowercase();
    let mut parents: Vec<&Task> = tasks.values().filter(|t| t.is_top_level()).collect();
    parents.sort_by(by_name);
    parents
        .into_iter()
        .find(|task| task.name.to_lowercase().starts_with(&prefix))
}

/// Tasks in display order: each top-level task followed by its direct
/// children, both sorted by name. Returns `(depth, task)` pairs; tasks
/// whose parent is unknown are not listed.
pub fn task_tree(tasks: &Tasks) -> Vec<(usize, &Task)> {
    let mut children: HashMap<i64, Vec<&Task>> = HashMap::new();
    let mut parents = Vec::new();
    for task in tasks.values() {
        if task.is_top_level() {
            parents.push(task);
        } else {
            children.entry(task.parent_id).or_default().push(task);
        }
    }
    parents.sort_by(by_name);

    let mut ordered = Vec::with_capacity(tasks.len());
    for parent in parents {
        ordered.push((0, parent));
        if let Some(kids) = children.get_mut(&parent.task_id) {
            kids.sort_by(by_name);
            ordered.extend(kids.iter().map(|kid| (1, *kid)));
        }
    }
    ordered
}
