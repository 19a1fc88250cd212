//! Some utility functions

use crate::manager::Manager;
use crate::storage::Storage;
use crate::task::Task;
use crate::task_list::TaskList;

/// A debug utility that pretty-prints every list of a manager, and its storages
pub fn print_manager(manager: &Manager, show_completed: bool) {
    println!("Storages:");
    for storage in manager.storages() {
        print_storage(storage);
    }
    for list in manager.task_lists() {
        print_task_list(list, show_completed);
    }
}

pub fn print_storage(storage: &Storage) {
    let default = if storage.is_default() { "*" } else { " " };
    let enabled = if storage.enabled() { "" } else { " (disabled)" };
    println!("  {} {}\t{} [{}]{}", default, storage.name(), storage.provider_name(), storage.icon_name(), enabled);
}

/// Print the tasks of a list, in display order
pub fn print_task_list(list: &TaskList, show_completed: bool) {
    match list.origin().is_empty() {
        true => println!("LIST {}", list.name()),
        false => println!("LIST {} ({})", list.name(), list.origin()),
    }
    for task in list.visible_tasks(show_completed) {
        print_task(task);
    }
    let hidden = list.len() - list.visible_tasks(show_completed).len();
    if hidden > 0 {
        println!("    ... and {} completed tasks", hidden);
    }
}

pub fn print_task(task: &Task) {
    let completion = if task.completed() { "✓" } else { " " };
    let priority = match task.priority() {
        0 => String::new(),
        p => format!(" !{}", p),
    };
    let due = match task.due_date() {
        None => String::new(),
        Some(due) => format!(" (due {})", due.format("%Y-%m-%d")),
    };
    println!("    {} {}{}{}\t{}", completion, task.title().unwrap_or("<untitled>"), priority, due, task.id());
}
