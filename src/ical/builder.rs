//! A module to build ICal files

use chrono::Utc;
use ics::properties::{Completed, Description, Due, LastModified, PercentComplete, Priority, Sequence, Status, Summary};
use ics::components::{Parameter, Property};
use ics::{ICalendar, ToDo};

use crate::error::Result;
use crate::task::Task;
use super::{default_prod_id, escape_text, format_date_time};


/// Create an iCal item from a [`Task`]
pub fn build_from(task: &Task) -> Result<String> {
    let s_now = format_date_time(&Utc::now());

    let mut todo = ToDo::new(task.uid(), s_now.clone());
    todo.push(LastModified::new(s_now));
    todo.push(Sequence::new(task.sequence().to_string()));

    if let Some(title) = task.title() {
        todo.push(Summary::new(escape_text(title)));
    }
    if task.description().is_empty() == false {
        todo.push(Description::new(escape_text(task.description())));
    }
    if let Some(due) = task.due_date() {
        todo.push(Due::new(format_date_time(due)));
    }
    if task.priority() > 0 {
        todo.push(Priority::new(task.priority().to_string()));
    }

    if let Some(dt) = task.completion_status().completion_date() {
        todo.push(Completed::new(format_date_time(dt)));
    }
    match task.completed() {
        true => {
            todo.push(Status::completed());
            todo.push(PercentComplete::new("100"));
        },
        false => {
            todo.push(Status::needs_action());
            todo.push(PercentComplete::new("0"));
        },
    }

    for extra in task.extra_parameters() {
        let mut property = Property::new(extra.name.as_str(), extra.value.as_deref().unwrap_or(""));
        for (key, values) in extra.params.iter().flatten() {
            property.add(Parameter::new(key.as_str(), values.join(",")));
        }
        todo.push(property);
    }

    let mut calendar = ICalendar::new("2.0", default_prod_id());
    calendar.add_todo(todo);

    Ok(calendar.to_string())
}
