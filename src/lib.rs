//! This crate provides the model of a to-do application whose task lists are stored in calendar sources.
//!
//! A [`Task`] wraps one calendar to-do component, and a [`TaskList`] holds the tasks of one source. \
//! The [`Manager`] connects to the [`SourceRegistry`](traits::SourceRegistry) and to a calendar client per source,
//! keeps every list and [`Storage`] up to date, and reports when the initial load is done. \
//! The [`Application`](application::Application) is the context a front-end is given.
//!
//! Backends are described by traits (see the [`traits`] module). This crate provides a [`LocalBackend`](local::LocalBackend),
//! that stores sources in a local folder.

pub mod traits;
pub mod error;
pub use error::{Error, Result};

pub mod task;
pub use task::Task;
pub mod task_list;
pub use task_list::TaskList;
pub mod storage;
pub use storage::Storage;
pub mod source;
pub mod ical;

pub mod manager;
pub use manager::Manager;
pub mod application;
pub mod local;

pub mod config;
pub mod settings;
pub mod mock_behaviour;
pub mod utils;
