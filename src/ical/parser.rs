//! A module to parse ICal files

use ical::parser::ical::component::{IcalCalendar, IcalTodo};

use crate::error::{Error, Result};
use crate::task::{CompletionStatus, Task};
use super::{parse_date_time, unescape_text};


/// Parse an iCal file that contains a single `VTODO` into a [`Task`].
///
/// The task does not belong to any list yet.
pub fn parse(content: &str) -> Result<Task> {
    let mut reader = ical::IcalParser::new(content.as_bytes());
    let parsed_item = match reader.next() {
        None => return Err(Error::Ical("Nothing to parse".into())),
        Some(item) => match item {
            Err(err) => return Err(Error::Ical(format!("Unable to parse iCal data: {}", err))),
            Ok(item) => item,
        }
    };

    let todo = assert_single_todo(&parsed_item)?;

    // What to do with multiple items?
    if reader.next().map(|r| r.is_ok()) == Some(true) {
        return Err(Error::Ical("Parsing multiple items are not supported".into()));
    }

    let prod_id = parsed_item.properties.iter()
        .find(|prop| prop.name == "PRODID")
        .and_then(|prop| prop.value.clone())
        .unwrap_or_default();

    task_from_todo(todo, prod_id)
}

fn task_from_todo(todo: &IcalTodo, prod_id: String) -> Result<Task> {
    let mut uid = None;
    let mut title = None;
    let mut descriptions = Vec::new();
    let mut due = None;
    let mut dtend = None;
    let mut priority = 0;
    let mut completed_on = None;
    let mut status_completed = false;
    let mut sequence = 0;
    let mut extra_parameters = Vec::new();

    for prop in &todo.properties {
        let value = match &prop.value {
            Some(value) => value,
            None => {
                extra_parameters.push(prop.clone());
                continue;
            },
        };

        match prop.name.as_str() {
            "UID" => uid = Some(value.clone()),
            "SUMMARY" => title = Some(unescape_text(value)),
            "DESCRIPTION" => descriptions.push(unescape_text(value)),
            "DUE" => due = parse_date_time(value),
            "DTEND" => dtend = parse_date_time(value),
            "COMPLETED" => completed_on = parse_date_time(value),
            "STATUS" => status_completed = value == "COMPLETED",
            "PRIORITY" => match value.trim().parse() {
                Ok(p) => priority = p,
                Err(_) => log::warn!("Ignoring invalid priority {:?}", value),
            },
            "SEQUENCE" => sequence = value.trim().parse().unwrap_or(0),
            // These are re-generated every time a task is written
            "DTSTAMP" | "LAST-MODIFIED" | "PERCENT-COMPLETE" => continue,
            _ => extra_parameters.push(prop.clone()),
        }
    }

    let uid = match uid {
        Some(uid) => uid,
        None => return Err(Error::Ical("Missing UID".into())),
    };

    let completion_status = match (completed_on, status_completed) {
        (Some(date), _) => CompletionStatus::Completed(Some(date)),
        (None, true) => CompletionStatus::Completed(None),
        (None, false) => CompletionStatus::Uncompleted,
    };

    // A task may have several descriptions, they are presented as a single one
    let description = match descriptions.is_empty() {
        true => None,
        false => Some(descriptions.join("\n")),
    };

    Ok(Task::new_with_parameters(
        uid, title, description, due.or(dtend),
        completion_status, priority, sequence,
        prod_id, extra_parameters,
    ))
}

fn assert_single_todo(item: &IcalCalendar) -> Result<&IcalTodo> {
    if item.todos.len() == 1 && item.events.is_empty() && item.journals.is_empty() {
        return Ok(&item.todos[0]);
    }
    Err(Error::Ical("Only a single TODO is supported".into()))
}
