//! To-do tasks (iCal `VTODO` item)

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use ical::property::Property;

use crate::task_list::TaskListId;
use crate::traits::Object;

/// The identity of a task inside this crate.
///
/// It is picked when the [`Task`] instance is created and never changes, even when the backend assigns a new `UID` to the underlying component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    content: String,
}

impl TaskId {
    /// Generate a random TaskId.
    pub fn random() -> Self {
        Self { content: Uuid::new_v4().to_hyphenated().to_string() }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// RFC5545 defines the completion as several optional fields, yet some combinations make no sense.
/// This enum provides an API that forbids such impossible combinations.
///
/// * `COMPLETED` is an optional timestamp that tells whether this task is completed
/// * `STATUS` is an optional field, that can be set to `NEEDS-ACTION`, `COMPLETED`, or others.
/// Even though having a `COMPLETED` date but a `STATUS:NEEDS-ACTION` is theorically possible, it obviously makes no sense. This API ensures this cannot happen
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CompletionStatus {
    Completed(Option<DateTime<Utc>>),
    Uncompleted,
}
impl CompletionStatus {
    pub fn is_completed(&self) -> bool {
        match self {
            CompletionStatus::Completed(_) => true,
            _ => false,
        }
    }

    pub fn completion_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            CompletionStatus::Completed(date) => date.as_ref(),
            CompletionStatus::Uncompleted => None,
        }
    }
}

/// The part of a task that can be edited, then either saved or aborted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Fields {
    title: Option<String>,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
    completion_status: CompletionStatus,
    priority: u32,
}

fn default_ready() -> bool { true }

/// A to-do task
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,

    /// Persistent, globally unique identifier for the calendar component.
    /// This is defined by the backend, that may change it when the task is created there
    uid: String,

    /// The list this task belongs to
    list: Option<TaskListId>,

    /// Current values, including the edits that have not been saved yet
    fields: Fields,
    /// Values as of the last call to [`Task::save`]
    saved_fields: Fields,
    /// The iCal `SEQUENCE` number, bumped every time edits are saved
    sequence: u32,

    /// Whether no backend operation is in flight for this task
    #[serde(skip, default = "default_ready")]
    ready: bool,

    /// The PRODID, as defined in iCal files
    ical_prod_id: String,

    /// Extra parameters that have not been parsed from the iCal file (because they're not supported (yet) by this crate).
    /// They are needed to serialize this item into an equivalent iCal file
    extra_parameters: Vec<Property>,
}


impl Task {
    /// Create a brand new Task that is not in any backend yet.
    /// This will pick a new (random) task ID and UID.
    pub fn new(title: String) -> Self {
        let new_uid = Uuid::new_v4().to_hyphenated().to_string();
        let ical_prod_id = crate::ical::default_prod_id();
        Self::new_with_parameters(
            new_uid, Some(title), None, None,
            CompletionStatus::Uncompleted, 0, 0,
            ical_prod_id, Vec::new(),
        )
    }

    /// Create a new Task instance from an existing calendar component
    pub fn new_with_parameters(uid: String, title: Option<String>, description: Option<String>,
                               due_date: Option<DateTime<Utc>>, completion_status: CompletionStatus,
                               priority: u32, sequence: u32,
                               ical_prod_id: String, extra_parameters: Vec<Property>,
                            ) -> Self
    {
        let fields = Fields { title, description, due_date, completion_status, priority };
        Self {
            id: TaskId::random(),
            uid,
            list: None,
            saved_fields: fields.clone(),
            fields,
            sequence,
            ready: true,
            ical_prod_id,
            extra_parameters,
        }
    }

    pub fn id(&self) -> &TaskId               { &self.id }
    pub fn uid(&self) -> &str                 { &self.uid }
    pub fn list(&self) -> Option<&TaskListId> { self.list.as_ref() }
    pub fn title(&self) -> Option<&str>       { self.fields.title.as_deref() }
    /// The description of the task, or an empty string
    pub fn description(&self) -> &str         { self.fields.description.as_deref().unwrap_or("") }
    pub fn due_date(&self) -> Option<&DateTime<Utc>> { self.fields.due_date.as_ref() }
    pub fn completed(&self) -> bool           { self.fields.completion_status.is_completed() }
    pub fn completion_status(&self) -> &CompletionStatus { &self.fields.completion_status }
    /// The priority of the task, `0` when not set
    pub fn priority(&self) -> u32             { self.fields.priority }
    pub fn sequence(&self) -> u32             { self.sequence }
    pub fn ical_prod_id(&self) -> &str        { &self.ical_prod_id }
    pub fn extra_parameters(&self) -> &[Property] { &self.extra_parameters }

    pub fn set_uid(&mut self, uid: String) {
        self.uid = uid;
    }

    pub fn set_list(&mut self, list: Option<TaskListId>) {
        self.list = list;
    }

    pub fn set_title(&mut self, new_title: String) {
        self.fields.title = Some(new_title);
    }

    /// Set the description. An empty string removes it
    pub fn set_description(&mut self, new_description: String) {
        self.fields.description = match new_description.is_empty() {
            true => None,
            false => Some(new_description),
        };
    }

    pub fn set_due_date(&mut self, new_due_date: Option<DateTime<Utc>>) {
        self.fields.due_date = new_due_date;
    }

    pub fn set_priority(&mut self, new_priority: u32) {
        self.fields.priority = new_priority;
    }

    /// Set the completion status
    pub fn set_completion_status(&mut self, new_completion_status: CompletionStatus) {
        self.fields.completion_status = new_completion_status;
    }

    /// Mark as completed (now) or uncompleted.
    /// This does nothing if the task already is in the requested state, so that an existing completion date is kept
    pub fn set_completed(&mut self, completed: bool) {
        if self.completed() == completed {
            return;
        }
        self.fields.completion_status = match completed {
            true => CompletionStatus::Completed(Some(Utc::now())),
            false => CompletionStatus::Uncompleted,
        };
    }

    /// Whether some edits have been made since the last [`Task::save`] or [`Task::abort`]
    pub fn has_pending_changes(&self) -> bool {
        self.fields != self.saved_fields
    }

    /// Commit the pending edits.
    /// This bumps the sequence number in case anything has changed
    pub fn save(&mut self) {
        if self.has_pending_changes() == false {
            return;
        }
        self.sequence += 1;
        self.saved_fields = self.fields.clone();
    }

    /// Discard every edit made since the last [`Task::save`]
    pub fn abort(&mut self) {
        self.fields = self.saved_fields.clone();
    }
}

impl Object for Task {
    fn uid(&self) -> &str {
        &self.uid
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }
}


/// Order tasks the way they are displayed:
/// uncompleted tasks first, then by decreasing priority, then by increasing due date (tasks without due dates come last), and finally by title.
pub fn compare(a: &Task, b: &Task) -> Ordering {
    a.completed().cmp(&b.completed())
        .then_with(|| b.priority().cmp(&a.priority()))
        .then_with(|| compare_due_dates(a.due_date(), b.due_date()))
        .then_with(|| a.title().cmp(&b.title()))
}

fn compare_due_dates(a: Option<&DateTime<Utc>>, b: Option<&DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

/// Sort tasks with [`compare`]. The sort is stable.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare);
}
