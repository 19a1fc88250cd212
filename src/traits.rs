//! Traits used by the task model, and traits that describe the external services it relies on

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::source::{Account, Source, SourceExtensions, TrustResponse};

/// Something that has a unique identifier, and that may be busy for a while (e.g. waiting for a backend)
pub trait Object {
    /// The unique identifier of this object, usually defined by a backend
    fn uid(&self) -> &str;
    /// Whether this object is done loading or updating
    fn is_ready(&self) -> bool;
    fn set_ready(&mut self, ready: bool);
}

/// The registry that enumerates and persists data source definitions
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// Returns the sources that have every extension of `extensions`.
    /// `None` returns every source
    async fn list_sources(&self, extensions: Option<SourceExtensions>) -> Result<Vec<Source>>;
    /// Returns the source that has this UID
    async fn ref_source(&self, uid: &str) -> Option<Source>;
    /// Create or update a source definition
    async fn commit_source(&self, source: &Source) -> Result<()>;
    /// Remove a source definition, and the data it contains
    async fn remove_source(&self, source: &Source) -> Result<()>;
    /// Connect a client to the tasks of this source.
    /// `timeout` is how long the backend is allowed to wait for the source to come online
    async fn connect(&self, source: &Source, timeout: Duration) -> Result<Arc<dyn CalClient>>;
    /// Ask the source to authenticate again, re-using the credentials it has been given last time
    async fn invoke_authenticate(&self, source: &Source) -> Result<()>;
}

/// A client connected to one source, that manipulates its calendar components (as iCal text)
#[async_trait]
pub trait CalClient: Send + Sync {
    /// Returns every component that matches `query`
    async fn get_object_list(&self, query: &str) -> Result<Vec<String>>;
    /// Create a component. The backend may assign a new UID to it, in which case it is returned
    async fn create_object(&self, ical: &str) -> Result<Option<String>>;
    /// Replace an existing component
    async fn modify_object(&self, ical: &str) -> Result<()>;
    /// Remove a component (or only one of its recurrences, if `rid` is given)
    async fn remove_object(&self, uid: &str, rid: Option<&str>) -> Result<()>;
}

/// The service that knows the online accounts of the user
#[async_trait]
pub trait AccountsService: Send + Sync {
    async fn accounts(&self) -> Result<Vec<Account>>;
}

/// Asks the user about credentials and certificates
#[async_trait]
pub trait CredentialsPrompter: Send + Sync {
    /// Whether prompts are disabled for this source
    fn auto_prompt_disabled_for(&self, source: &Source) -> bool;
    fn set_auto_prompt_disabled_for(&self, source: &Source, disabled: bool);
    /// Ask the user whether an invalid certificate should be trusted
    async fn trust_prompt(&self, source: &Source, certificate_pem: Option<&str>, error: Option<&str>) -> Result<TrustResponse>;
}
