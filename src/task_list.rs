//! Task lists: ordered collections of tasks, backed by one data source

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use csscolorparser::Color;
use tokio::sync::broadcast;

use crate::task::{Task, TaskId};
use crate::traits::Object;

/// How many events a slow subscriber may lag behind before it misses some
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The identity of a task list. This is the UID of its source
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskListId {
    content: String,
}

impl TaskListId {
    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl From<String> for TaskListId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for TaskListId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}

impl Display for TaskListId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}


/// A change in the content of a [`TaskList`]
#[derive(Clone, Debug, PartialEq)]
pub enum TaskListEvent {
    TaskAdded(TaskId),
    TaskRemoved(TaskId),
    TaskUpdated(TaskId),
}

/// See [`TaskList::subscribe`]
pub type TaskListReceiver = broadcast::Receiver<TaskListEvent>;


/// A list of tasks
#[derive(Debug)]
pub struct TaskList {
    id: TaskListId,
    name: String,
    /// Display name of the account (or any parent source) this list comes from
    origin: String,
    color: Option<Color>,

    tasks: Vec<Task>,
    ready: bool,

    events: broadcast::Sender<TaskListEvent>,
}

impl TaskList {
    /// Create an empty list
    pub fn new(id: TaskListId, name: String, origin: String, color: Option<Color>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            id, name, origin, color,
            tasks: Vec::new(),
            ready: true,
            events,
        }
    }

    pub fn id(&self) -> &TaskListId        { &self.id }
    pub fn name(&self) -> &str             { &self.name }
    pub fn origin(&self) -> &str           { &self.origin }
    pub fn color(&self) -> Option<&Color>  { self.color.as_ref() }

    pub fn set_name(&mut self, name: String)          { self.name = name; }
    pub fn set_origin(&mut self, origin: String)      { self.origin = origin; }
    pub fn set_color(&mut self, color: Option<Color>) { self.color = color; }

    /// Get notified about tasks being added, removed or updated
    pub fn subscribe(&self) -> TaskListReceiver {
        self.events.subscribe()
    }

    fn emit(&self, event: TaskListEvent) {
        // Nobody listening is not an error
        let _ = self.events.send(event);
    }

    /// The tasks of this list, in insertion order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.position(id).is_some()
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Returns a mutable reference to a task.
    /// Changes made this way are not notified, see [`TaskList::save_task`]
    pub fn task_mut(&mut self, id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id() == id)
    }

    /// Add a task to this list, or replace the member that has the same [`TaskId`].
    ///
    /// This emits [`TaskListEvent::TaskAdded`] or [`TaskListEvent::TaskUpdated`] accordingly.
    pub fn save_task(&mut self, mut task: Task) {
        task.set_list(Some(self.id.clone()));
        let id = task.id().clone();

        match self.position(&id) {
            Some(index) => {
                self.tasks[index] = task;
                self.emit(TaskListEvent::TaskUpdated(id));
            },
            None => {
                self.tasks.push(task);
                self.emit(TaskListEvent::TaskAdded(id));
            },
        }
    }

    /// Remove a task from this list.
    ///
    /// This does nothing (and notifies nothing) in case it is not a member
    pub fn remove_task(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.position(id)?;
        let task = self.tasks.remove(index);
        self.emit(TaskListEvent::TaskRemoved(id.clone()));
        Some(task)
    }

    /// The tasks, in display order (see [`crate::task::compare`])
    pub fn sorted_tasks(&self) -> Vec<&Task> {
        let mut sorted: Vec<&Task> = self.tasks.iter().collect();
        sorted.sort_by(|a, b| crate::task::compare(a, b));
        sorted
    }

    /// The tasks to display, in display order.
    pub fn visible_tasks(&self, show_completed: bool) -> Vec<&Task> {
        self.sorted_tasks()
            .into_iter()
            .filter(|t| show_completed || t.completed() == false)
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed()).count()
    }
}

impl Object for TaskList {
    fn uid(&self) -> &str {
        self.id.as_str()
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}
