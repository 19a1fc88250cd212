//! The manager owns every task list and storage, and talks to the backends on their behalf

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::broadcast;

use crate::config::{ALL_TASKS_QUERY, CONNECT_TIMEOUT, LOCAL_SOURCE_PARENT, LOCAL_STORAGE_ID};
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::source::{Account, CredentialsReason, Source, SourceExtensions};
use crate::storage::Storage;
use crate::task::{Task, TaskId};
use crate::task_list::{TaskList, TaskListId};
use crate::traits::{AccountsService, CalClient, CredentialsPrompter, Object, SourceRegistry};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A change in the lists, storages or readiness of a [`Manager`]
#[derive(Clone, Debug, PartialEq)]
pub enum ManagerEvent {
    ListAdded(TaskListId),
    ListChanged(TaskListId),
    ListRemoved(TaskListId),
    StorageAdded(String),
    StorageChanged(String),
    StorageRemoved(String),
    /// The manager has (or has not) loaded every source
    ReadyChanged(bool),
}

/// Log a failed backend operation, and give the error back
fn warn_on_error<T>(result: Result<T>, what: &str) -> Result<T> {
    if let Err(err) = &result {
        log::warn!("{}: {}", what, err);
    }
    result
}

/// The root of the task model.
///
/// It connects a client to every task list source, keeps track of the storages task lists can be created in,
/// and performs every task operation against the backend before reflecting it into the [`TaskList`]s.
pub struct Manager {
    registry: Arc<dyn SourceRegistry>,
    accounts: Arc<dyn AccountsService>,
    prompter: Arc<dyn CredentialsPrompter>,
    settings: Settings,

    /// Connected clients, by source UID
    clients: HashMap<String, Arc<dyn CalClient>>,
    task_lists: Vec<TaskList>,
    /// Kept sorted with [`crate::storage::compare`]
    storages: Vec<Storage>,

    /// How many sources of the initial load have not been processed yet
    pending_loads: usize,
    ready: bool,

    events: broadcast::Sender<ManagerEvent>,
}

impl Manager {
    pub fn new(
        registry: Arc<dyn SourceRegistry>,
        accounts: Arc<dyn AccountsService>,
        prompter: Arc<dyn CredentialsPrompter>,
        settings: Settings,
    ) -> Self {
        let mut local = Storage::local();
        local.set_is_default(settings.storage_location() == local.id());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            registry, accounts, prompter, settings,
            clients: HashMap::new(),
            task_lists: Vec::new(),
            storages: vec![local],
            pending_loads: 0,
            ready: false,
            events,
        }
    }

    /// Get notified about lists, storages and readiness
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ManagerEvent) {
        let _ = self.events.send(event);
    }

    /// Whether every source of the initial load has been processed (successfully or not)
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_loads(&self) -> usize {
        self.pending_loads
    }

    fn set_ready(&mut self, ready: bool) {
        if self.ready != ready {
            self.ready = ready;
            self.emit(ManagerEvent::ReadyChanged(ready));
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn task_lists(&self) -> &[TaskList] {
        &self.task_lists
    }

    pub fn task_list(&self, id: &TaskListId) -> Option<&TaskList> {
        self.task_lists.iter().find(|list| list.id() == id)
    }

    /// Returns a mutable reference to a list, e.g. to rename it before calling [`Manager::save_task_list`]
    pub fn task_list_mut(&mut self, id: &TaskListId) -> Option<&mut TaskList> {
        self.task_lists.iter_mut().find(|list| list.id() == id)
    }

    fn existing_list_mut(&mut self, id: &TaskListId) -> Result<&mut TaskList> {
        self.task_list_mut(id).ok_or_else(|| Error::UnknownList(id.clone()))
    }

    fn client_for(&self, id: &TaskListId) -> Result<Arc<dyn CalClient>> {
        self.clients
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| Error::NoClient(id.to_string()))
    }

    pub fn storages(&self) -> &[Storage] {
        &self.storages
    }

    pub fn storage(&self, id: &str) -> Option<&Storage> {
        self.storages.iter().find(|s| s.id() == id)
    }


    /// Connect a client to every task list source of the registry.
    ///
    /// The manager becomes ready once every connection has completed, whether it succeeded or not.
    /// Only a failure of the registry itself is returned, failed sources are logged and skipped.
    ///
    /// Once the manager is ready, loading again only picks up the sources that are not loaded yet,
    /// the same way [`Self::source_added`] does, and readiness does not change.
    pub async fn load_sources(&mut self) -> Result<()> {
        let all_sources = warn_on_error(
            self.registry.list_sources(None).await,
            "Unable to list the sources",
        )?;

        let mut sources = Vec::new();
        for source in all_sources {
            self.update_auto_prompt(&source);
            if source.has_extension(SourceExtensions::TASK_LIST) == false {
                continue;
            }
            if self.clients.contains_key(source.uid()) {
                log::debug!("Source {} is already loaded", source.uid());
                continue;
            }
            sources.push(source);
        }

        if self.ready {
            log::debug!("Already loaded, adding {} new task list sources", sources.len());
            for source in sources {
                // Failures are logged by `source_added`
                let _ = self.source_added(source).await;
            }
            return Ok(());
        }

        self.pending_loads = sources.len();
        self.set_ready(self.pending_loads == 0);
        log::debug!("Loading {} task list sources", self.pending_loads);

        let mut connections: FuturesUnordered<_> = sources
            .into_iter()
            .map(|source| {
                let registry = Arc::clone(&self.registry);
                async move {
                    let result = registry.connect(&source, CONNECT_TIMEOUT).await;
                    (source, result)
                }
            })
            .collect();

        while let Some((source, result)) = connections.next().await {
            match result {
                Ok(client) => self.add_task_list(&source, client).await,
                Err(err) => log::warn!("Failed to connect to source {} ({}): {}", source.display_name(), source.uid(), err),
            }

            self.pending_loads = self.pending_loads.saturating_sub(1);
            if self.pending_loads == 0 {
                self.set_ready(true);
            }
        }

        Ok(())
    }

    async fn origin_of(&self, source: &Source) -> String {
        let parent_uid = match source.parent() {
            None => return String::new(),
            Some(uid) => uid,
        };
        match self.registry.ref_source(parent_uid).await {
            Some(parent) => parent.display_name().to_string(),
            None if parent_uid == LOCAL_SOURCE_PARENT => Storage::local().name().to_string(),
            None => String::new(),
        }
    }

    /// Build the list of a freshly connected source, and fill it with the tasks of this source
    async fn add_task_list(&mut self, source: &Source, client: Arc<dyn CalClient>) {
        log::debug!("Connected to source {} ({})", source.display_name(), source.uid());

        let origin = self.origin_of(source).await;
        let mut list = TaskList::new(
            TaskListId::from(source.uid()),
            source.display_name().to_string(),
            origin,
            source.color().cloned(),
        );

        list.set_ready(false);
        match client.get_object_list(ALL_TASKS_QUERY).await {
            Err(err) => log::warn!("Unable to fetch the tasks of {}: {}", source.uid(), err),
            Ok(objects) => {
                for object in objects {
                    match crate::ical::parse(&object) {
                        Ok(task) => list.save_task(task),
                        Err(err) => log::warn!("Ignoring an invalid task in {}: {}", source.uid(), err),
                    }
                }
            },
        }
        list.set_ready(true);

        let id = list.id().clone();
        self.clients.insert(source.uid().to_string(), client);
        self.task_lists.push(list);
        self.emit(ManagerEvent::ListAdded(id));
    }

    /// Credentials are prompted for automatically for sources that hold events or tasks only
    fn update_auto_prompt(&self, source: &Source) {
        let prompted = source.has_extension(SourceExtensions::CALENDAR)
            || source.has_extension(SourceExtensions::TASK_LIST);
        self.prompter.set_auto_prompt_disabled_for(source, prompted == false);
    }

    /// A source has been added to the registry after the initial load
    pub async fn source_added(&mut self, source: Source) -> Result<()> {
        self.update_auto_prompt(&source);
        if source.has_extension(SourceExtensions::TASK_LIST) == false {
            return Ok(());
        }
        if self.clients.contains_key(source.uid()) {
            log::debug!("Source {} is already loaded", source.uid());
            return Ok(());
        }

        let client = warn_on_error(
            self.registry.connect(&source, CONNECT_TIMEOUT).await,
            &format!("Failed to connect to source {}", source.uid()),
        )?;
        self.add_task_list(&source, client).await;
        Ok(())
    }

    /// A source has been removed from the registry. Its list is returned, if it had been loaded
    pub fn source_removed(&mut self, uid: &str) -> Option<TaskList> {
        self.clients.remove(uid);
        let index = self.task_lists.iter().position(|list| list.id().as_str() == uid)?;
        let list = self.task_lists.remove(index);
        self.emit(ManagerEvent::ListRemoved(list.id().clone()));
        Some(list)
    }


    /// Create a new task in the backend, then add it to its list.
    ///
    /// The task must have been assigned a list beforehand (see [`Task::set_list`]).
    /// The backend may give the task a new UID.
    pub async fn create_task(&mut self, mut task: Task) -> Result<TaskId> {
        let list_id = task.list().cloned().ok_or_else(|| Error::Orphan(task.id().clone()))?;
        self.existing_list_mut(&list_id)?;
        let client = self.client_for(&list_id)?;
        let ical = crate::ical::build_from(&task)?;

        task.set_ready(false);
        let result = client.create_object(&ical).await;
        task.set_ready(true);

        let new_uid = warn_on_error(result, &format!("Unable to create task {}", task.id()))?;
        if let Some(uid) = new_uid {
            log::debug!("Task {} has been given UID {} by the backend", task.id(), uid);
            task.set_uid(uid);
        }

        let id = task.id().clone();
        self.existing_list_mut(&list_id)?.save_task(task);
        Ok(id)
    }

    /// Commit the pending edits of a task (see [`Task::save`]), write it to the backend, then replace it in its list
    pub async fn update_task(&mut self, mut task: Task) -> Result<()> {
        let list_id = task.list().cloned().ok_or_else(|| Error::Orphan(task.id().clone()))?;
        let client = self.client_for(&list_id)?;
        task.save();
        let ical = crate::ical::build_from(&task)?;

        match self.existing_list_mut(&list_id)?.task_mut(task.id()) {
            None => return Err(Error::UnknownTask(task.id().clone())),
            Some(member) => member.set_ready(false),
        }

        let result = client.modify_object(&ical).await;

        let list = self.existing_list_mut(&list_id)?;
        match warn_on_error(result, &format!("Unable to update task {}", task.id())) {
            Err(err) => {
                if let Some(member) = list.task_mut(task.id()) {
                    member.set_ready(true);
                }
                Err(err)
            },
            Ok(()) => {
                task.set_ready(true);
                list.save_task(task);
                Ok(())
            },
        }
    }

    /// Remove a task from the backend, then from its list
    pub async fn remove_task(&mut self, list_id: &TaskListId, task_id: &TaskId) -> Result<Task> {
        let client = self.client_for(list_id)?;

        let uid = match self.existing_list_mut(list_id)?.task_mut(task_id) {
            None => return Err(Error::UnknownTask(task_id.clone())),
            Some(member) => {
                member.set_ready(false);
                member.uid().to_string()
            },
        };

        let result = client.remove_object(&uid, None).await;

        let list = self.existing_list_mut(list_id)?;
        match warn_on_error(result, &format!("Unable to remove task {}", task_id)) {
            Err(err) => {
                if let Some(member) = list.task_mut(task_id) {
                    member.set_ready(true);
                }
                Err(err)
            },
            Ok(()) => {
                let mut removed = list.remove_task(task_id).ok_or_else(|| Error::UnknownTask(task_id.clone()))?;
                removed.set_ready(true);
                Ok(removed)
            },
        }
    }


    /// Create a new (empty) task list in a storage
    pub async fn create_task_list(&mut self, storage_id: &str, name: &str) -> Result<TaskListId> {
        let storage = self.storage(storage_id).ok_or_else(|| Error::UnknownStorage(storage_id.to_string()))?;
        let source = storage.create_task_list(name);

        warn_on_error(
            self.registry.commit_source(&source).await,
            &format!("Unable to create task list {}", name),
        )?;

        let id = TaskListId::from(source.uid());
        self.source_added(source).await?;
        Ok(id)
    }

    /// Write the name and color of a list back to its source
    pub async fn save_task_list(&mut self, list_id: &TaskListId) -> Result<()> {
        let (name, color) = match self.task_list(list_id) {
            None => return Err(Error::UnknownList(list_id.clone())),
            Some(list) => (list.name().to_string(), list.color().cloned()),
        };
        let mut source = self.registry
            .ref_source(list_id.as_str())
            .await
            .ok_or_else(|| Error::UnknownSource(list_id.to_string()))?;

        source.set_display_name(name);
        source.set_color(color);
        warn_on_error(
            self.registry.commit_source(&source).await,
            &format!("Unable to save task list {}", list_id),
        )?;

        self.emit(ManagerEvent::ListChanged(list_id.clone()));
        Ok(())
    }

    /// Delete a task list (and its tasks) from the backend
    pub async fn remove_task_list(&mut self, list_id: &TaskListId) -> Result<TaskList> {
        let source = self.registry
            .ref_source(list_id.as_str())
            .await
            .ok_or_else(|| Error::UnknownSource(list_id.to_string()))?;

        warn_on_error(
            self.registry.remove_source(&source).await,
            &format!("Unable to remove task list {}", list_id),
        )?;

        self.source_removed(list_id.as_str()).ok_or_else(|| Error::UnknownList(list_id.clone()))
    }


    /// Add a storage for every supported online account
    pub async fn load_accounts(&mut self) -> Result<()> {
        let accounts = warn_on_error(
            self.accounts.accounts().await,
            "Unable to list the online accounts",
        )?;
        for account in &accounts {
            self.account_added(account);
        }
        Ok(())
    }

    pub fn account_added(&mut self, account: &Account) {
        if account.is_supported() == false {
            log::debug!("Ignoring account {} ({} is not supported)", account.id, account.provider_type);
            return;
        }
        if self.storage(&account.id).is_some() {
            self.account_changed(account);
            return;
        }

        let mut storage = Storage::from_account(account);
        storage.set_is_default(self.settings.storage_location() == storage.id());
        crate::storage::insert_sorted(&mut self.storages, storage);
        self.emit(ManagerEvent::StorageAdded(account.id.clone()));
    }

    pub fn account_changed(&mut self, account: &Account) {
        let storage = match self.storages.iter_mut().find(|s| s.id() == account.id) {
            None => {
                log::debug!("Ignoring a change of unknown account {}", account.id);
                return;
            },
            Some(storage) => storage,
        };

        storage.set_name(account.identity.clone());
        storage.set_provider(account.provider_type.clone());
        storage.set_provider_name(account.provider_name.clone());
        storage.set_enabled(account.calendar_disabled == false);
        crate::storage::sort_storages(&mut self.storages);
        self.emit(ManagerEvent::StorageChanged(account.id.clone()));
    }

    /// Forget the storage of an account.
    /// In case it was the default one, the local storage becomes the default
    pub fn account_removed(&mut self, account: &Account) {
        let index = match self.storages.iter().position(|s| s.id() == account.id) {
            None => return,
            Some(index) => index,
        };
        let removed = self.storages.remove(index);
        self.emit(ManagerEvent::StorageRemoved(account.id.clone()));

        if removed.is_default() {
            log::info!("The default storage {} has been removed, falling back to the local one", removed.id());
            if let Err(err) = self.set_default_storage(LOCAL_STORAGE_ID) {
                log::warn!("Unable to reset the default storage: {}", err);
            }
        }
    }

    pub fn default_storage(&self) -> Option<&Storage> {
        self.storages.iter().find(|s| s.is_default())
    }

    /// Make a storage the default location of new task lists, and remember this choice
    pub fn set_default_storage(&mut self, id: &str) -> Result<()> {
        if self.storage(id).is_none() {
            return Err(Error::UnknownStorage(id.to_string()));
        }

        let mut changed = Vec::new();
        for storage in self.storages.iter_mut() {
            let is_default = storage.id() == id;
            if storage.is_default() != is_default {
                storage.set_is_default(is_default);
                changed.push(storage.id().to_string());
            }
        }
        self.settings.set_storage_location(id);

        for id in changed {
            self.emit(ManagerEvent::StorageChanged(id));
        }
        Ok(())
    }


    /// A source needs credentials.
    ///
    /// Certificate failures are presented to the user, and the source is authenticated again if they trust it.
    /// Cancelling the prompt is not an error.
    pub async fn handle_credentials_required(
        &self,
        source: &Source,
        reason: CredentialsReason,
        certificate_pem: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        if self.prompter.auto_prompt_disabled_for(source) {
            return Ok(());
        }

        match reason {
            CredentialsReason::SslFailed => {
                let response = match self.prompter.trust_prompt(source, certificate_pem, error).await {
                    Err(err) if err.is_cancelled() => return Ok(()),
                    Err(err) => {
                        log::warn!("Failed to prompt for credentials for '{}': {}", source.display_name(), err);
                        return Err(err);
                    },
                    Ok(response) => response,
                };
                if response.is_accepted() == false {
                    log::debug!("Certificate of '{}' has not been trusted ({:?})", source.display_name(), response);
                    return Ok(());
                }

                match self.registry.invoke_authenticate(source).await {
                    Err(err) if err.is_cancelled() => Ok(()),
                    Err(err) => {
                        log::warn!("Failed to prompt for credentials ({}): {}", source.uid(), err);
                        Err(err)
                    },
                    Ok(()) => Ok(()),
                }
            },
            CredentialsReason::Error => {
                if let Some(error) = error {
                    log::warn!("Authentication failure '{}': {}", source.display_name(), error);
                }
                Ok(())
            },
            _ => Ok(()),
        }
    }
}
