//! Storage locations new task lists can be created in

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::{LOCAL_SOURCE_PARENT, LOCAL_STORAGE_ID};
use crate::source::{Account, Source, SourceExtensions};

/// A place task lists can be saved to: this computer, or an online account
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    id: String,
    /// Provider type, e.g. `local` or `google`
    provider: String,
    /// User-visible name of the provider, e.g. `Google`
    provider_name: String,
    /// User-visible name of this storage
    name: String,
    enabled: bool,
    is_default: bool,
}

impl Storage {
    pub fn new(id: String, provider: String, provider_name: String, name: String) -> Self {
        Self {
            id, provider, provider_name, name,
            enabled: false,
            is_default: false,
        }
    }

    /// The storage on this computer. It is always enabled
    pub fn local() -> Self {
        let mut storage = Self::new(
            LOCAL_STORAGE_ID.to_string(),
            LOCAL_STORAGE_ID.to_string(),
            "Local".to_string(),
            "On This Computer".to_string(),
        );
        storage.set_enabled(true);
        storage
    }

    /// The storage of an online account. It is enabled unless calendars are disabled for this account
    pub fn from_account(account: &Account) -> Self {
        let mut storage = Self::new(
            account.id.clone(),
            account.provider_type.clone(),
            account.provider_name.clone(),
            account.identity.clone(),
        );
        storage.set_enabled(account.calendar_disabled == false);
        storage
    }

    pub fn id(&self) -> &str            { &self.id }
    pub fn provider(&self) -> &str      { &self.provider }
    pub fn provider_name(&self) -> &str { &self.provider_name }
    pub fn name(&self) -> &str          { &self.name }
    pub fn enabled(&self) -> bool       { self.enabled }
    pub fn is_default(&self) -> bool    { self.is_default }

    pub fn is_local(&self) -> bool {
        self.provider == LOCAL_STORAGE_ID
    }

    /// Name of the themed icon representing this storage
    pub fn icon_name(&self) -> String {
        match self.is_local() {
            true => "computer-symbolic".to_string(),
            false => format!("goa-account-{}", self.provider),
        }
    }

    pub fn set_name(&mut self, name: String)                   { self.name = name; }
    pub fn set_provider(&mut self, provider: String)           { self.provider = provider; }
    pub fn set_provider_name(&mut self, provider_name: String) { self.provider_name = provider_name; }
    pub fn set_enabled(&mut self, enabled: bool)               { self.enabled = enabled; }
    pub fn set_is_default(&mut self, is_default: bool)         { self.is_default = is_default; }

    /// Build the source definition of a new task list stored here.
    ///
    /// The source is not committed to any registry yet.
    pub fn create_task_list(&self, name: &str) -> Source {
        let mut source = Source::new_random(name.to_string(), SourceExtensions::TASK_LIST);
        match self.is_local() {
            true => {
                source.set_parent(Some(LOCAL_SOURCE_PARENT.to_string()));
                source.set_backend_name(Some(LOCAL_STORAGE_ID.to_string()));
            },
            false => {
                source.set_parent(Some(self.id.clone()));
                source.set_backend_name(Some(self.provider.clone()));
            },
        }
        source
    }
}

/// Order storages by provider type, then by id, both in reverse lexicographic order
pub fn compare(a: &Storage, b: &Storage) -> Ordering {
    b.provider().cmp(a.provider())
        .then_with(|| b.id().cmp(a.id()))
}

pub fn sort_storages(storages: &mut [Storage]) {
    storages.sort_by(compare);
}

/// Insert a storage into an already sorted vector, keeping it sorted
pub fn insert_sorted(storages: &mut Vec<Storage>, storage: Storage) {
    let index = storages
        .iter()
        .position(|s| compare(&storage, s) == Ordering::Less)
        .unwrap_or_else(|| storages.len());
    storages.insert(index, storage);
}
