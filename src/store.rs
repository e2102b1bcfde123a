use crate::models::{NewTask, Task, TaskId, UserId};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Typed filter over a user's tasks. Every query is scoped to one owner.
#[derive(Debug, Clone, Copy)]
pub struct TaskQuery {
    pub owner: UserId,
    pub date: Option<NaiveDate>,
    pub month: Option<(i32, u32)>,
    pub completed: Option<bool>,
}

impl TaskQuery {
    pub fn owner(owner: UserId) -> Self {
        Self {
            owner,
            date: None,
            month: None,
            completed: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn in_month(mut self, year: i32, month: u32) -> Self {
        self.month = Some((year, month));
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        if task.user != self.owner {
            return false;
        }
        if let Some(date) = self.date {
            if task.date != date {
                return false;
            }
        }
        if let Some((year, month)) = self.month {
            if task.date.year() != year || task.date.month() != month {
                return false;
            }
        }
        if let Some(completed) = self.completed {
            if task.is_completed != completed {
                return false;
            }
        }
        true
    }
}

/// Repository interface for task records.
pub trait TaskStore {
    /// Tasks matching `query`, ordered by id.
    fn find(&self, query: &TaskQuery) -> Vec<Task>;
    fn create(&mut self, task: NewTask) -> Task;
    /// Flips `is_completed`; `None` when the task is missing or owned by someone else.
    fn toggle(&mut self, owner: UserId, id: TaskId) -> Option<Task>;
    fn delete(&mut self, owner: UserId, id: TaskId) -> Option<Task>;

    fn count(&self, query: &TaskQuery) -> usize {
        self.find(query).len()
    }

    fn tasks_on(&self, owner: UserId, date: NaiveDate) -> Vec<Task> {
        self.find(&TaskQuery::owner(owner).on(date))
    }

    fn tasks_in_month(&self, owner: UserId, year: i32, month: u32) -> Vec<Task> {
        self.find(&TaskQuery::owner(owner).in_month(year, month))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskBook {
    next_id: u64,
    tasks: Vec<Task>,
}

impl TaskBook {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Puts a removed task back in id order.
    pub fn restore(&mut self, task: Task) {
        let index = self.tasks.partition_point(|t| t.id.0 < task.id.0);
        self.tasks.insert(index, task);
    }
}

impl TaskStore for TaskBook {
    fn find(&self, query: &TaskQuery) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| query.matches(task))
            .cloned()
            .collect()
    }

    fn create(&mut self, task: NewTask) -> Task {
        // ids stay unique even if a hand-edited file left next_id behind
        let floor = self.tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.next_id = self.next_id.max(floor).saturating_add(1);
        let task = Task {
            id: TaskId(self.next_id),
            user: task.user,
            title: task.title,
            date: task.date,
            is_completed: false,
        };
        self.tasks.push(task.clone());
        task
    }

    fn toggle(&mut self, owner: UserId, id: TaskId) -> Option<Task> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id && task.user == owner)?;
        task.is_completed = !task.is_completed;
        Some(task.clone())
    }

    fn delete(&mut self, owner: UserId, id: TaskId) -> Option<Task> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id && task.user == owner)?;
        Some(self.tasks.remove(index))
    }
}
