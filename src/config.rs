//! Support for library configuration options

use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;

/// Part of the ProdID string that describes the organization (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static ORG_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("My organization".to_string())));

/// Part of the ProdID string that describes the product name (example of a ProdID string: `-//ABC Corporation//My Product//EN`).
/// Feel free to override it when initing this library.
pub static PRODUCT_NAME: Lazy<Arc<Mutex<String>>> = Lazy::new(|| Arc::new(Mutex::new("TodoLarder".to_string())));

/// How long a calendar client may take to connect to its source.
///
/// This is handed over to the [`SourceRegistry`](crate::traits::SourceRegistry) as is, this crate never enforces it.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The query that matches every object of a task list
pub const ALL_TASKS_QUERY: &str = r#"contains? "any" """#;

/// Online account providers that are able to store task lists
pub const SUPPORTED_PROVIDERS: &[&str] = &["exchange", "google", "owncloud"];

/// Identifier of the storage that lives on this computer
pub const LOCAL_STORAGE_ID: &str = "local";

/// Parent of every source created on the local storage
pub const LOCAL_SOURCE_PARENT: &str = "local-stub";

/// Read one of the configuration strings above, even if a previous holder of the lock panicked
pub(crate) fn read(value: &Lazy<Arc<Mutex<String>>>) -> String {
    match value.lock() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
