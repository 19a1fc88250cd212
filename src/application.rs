//! The application: the explicit context every part of a front-end is handed

use crate::error::Result;
use crate::manager::Manager;
use crate::storage::Storage;

/// What should be presented to the user when the application is activated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// This is the first run: the user should pick a default storage first
    InitialSetup,
    MainWindow,
}

/// Metadata shown in the "About" dialog
#[derive(Clone, Debug, PartialEq)]
pub struct AboutInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub authors: Vec<&'static str>,
    /// Empty when unknown
    pub website: &'static str,
    pub license: &'static str,
}

pub struct Application {
    manager: Manager,
    started: bool,
}

impl Application {
    pub fn new(manager: Manager) -> Self {
        Self { manager, started: false }
    }

    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut Manager {
        &mut self.manager
    }

    /// Load the online accounts, then every task list source.
    ///
    /// Calling this several times has no effect
    pub async fn startup(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        // A broken accounts service should not prevent local lists from being used
        if let Err(err) = self.manager.load_accounts().await {
            log::warn!("Online accounts are not available: {}", err);
        }
        self.manager.load_sources().await?;
        self.started = true;
        Ok(())
    }

    pub fn activate(&self) -> Activation {
        match self.manager.settings().first_run() {
            true => Activation::InitialSetup,
            false => Activation::MainWindow,
        }
    }

    /// The user has picked a default storage: the initial setup will not be shown again
    pub fn finish_initial_setup(&mut self, storage_id: &str) -> Result<()> {
        self.manager.set_default_storage(storage_id)?;
        self.manager.settings_mut().set_first_run(false);
        Ok(())
    }

    pub fn storage_location(&self) -> &str {
        self.manager.settings().storage_location()
    }

    pub fn set_storage_location(&mut self, storage_id: &str) -> Result<()> {
        self.manager.set_default_storage(storage_id)
    }

    pub fn default_storage(&self) -> Option<&Storage> {
        self.manager.default_storage()
    }

    pub fn about(&self) -> AboutInfo {
        AboutInfo {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            authors: env!("CARGO_PKG_AUTHORS").split(':').filter(|a| a.is_empty() == false).collect(),
            website: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }

    /// Persist the settings, and give the manager back
    pub fn quit(self) -> Result<Manager> {
        self.manager.settings().save_to_file()?;
        Ok(self.manager)
    }
}
