//! Prints the task lists stored in a local folder
//!
//! Usage: `todo [FOLDER] [--all]`. A sample list is created in case the folder does not contain any yet.
//! Set the RUST_LOG environment variable to display more info.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use todo_larder::application::{Activation, Application};
use todo_larder::config::LOCAL_STORAGE_ID;
use todo_larder::error::{Error, Result};
use todo_larder::local::LocalBackend;
use todo_larder::settings::Settings;
use todo_larder::source::{Account, Source, TrustResponse};
use todo_larder::task_list::TaskListId;
use todo_larder::traits::{AccountsService, CredentialsPrompter};
use todo_larder::{Manager, Task};

const DEFAULT_FOLDER: &str = "todo_data";

/// This tool knows no online account
struct NoAccounts;

#[async_trait]
impl AccountsService for NoAccounts {
    async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(Vec::new())
    }
}

/// This tool never prompts
struct NoPrompts;

#[async_trait]
impl CredentialsPrompter for NoPrompts {
    fn auto_prompt_disabled_for(&self, _source: &Source) -> bool {
        true
    }
    fn set_auto_prompt_disabled_for(&self, _source: &Source, _disabled: bool) {}
    async fn trust_prompt(&self, _source: &Source, _certificate_pem: Option<&str>, _error: Option<&str>) -> Result<TrustResponse> {
        Err(Error::Cancelled)
    }
}


#[tokio::main]
async fn main() {
    env_logger::init();

    let mut folder = PathBuf::from(DEFAULT_FOLDER);
    let mut show_completed = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--all" => show_completed = true,
            path => folder = PathBuf::from(path),
        }
    }

    if let Err(err) = run(folder, show_completed).await {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(folder: PathBuf, show_completed: bool) -> Result<()> {
    let backend = LocalBackend::from_folder(&folder)?;
    let settings = Settings::from_file(&folder.join("settings.json"))?;
    let manager = Manager::new(Arc::new(backend), Arc::new(NoAccounts), Arc::new(NoPrompts), settings);

    let mut app = Application::new(manager);
    app.startup().await?;
    if app.activate() == Activation::InitialSetup {
        println!("First run: new lists will be stored in the \"{}\" storage", LOCAL_STORAGE_ID);
        app.finish_initial_setup(LOCAL_STORAGE_ID)?;
    }

    if app.manager().task_lists().is_empty() {
        let list_id = create_sample_list(app.manager_mut()).await?;
        println!("Created a sample list ({})", list_id);
    }

    todo_larder::utils::print_manager(app.manager(), show_completed);

    let about = app.about();
    println!("{} {}", about.name, about.version);
    app.quit()?;
    Ok(())
}

async fn create_sample_list(manager: &mut Manager) -> Result<TaskListId> {
    let storage_id = match manager.default_storage() {
        Some(storage) => storage.id().to_string(),
        None => LOCAL_STORAGE_ID.to_string(),
    };
    let list_id = manager.create_task_list(&storage_id, "Groceries").await?;

    for (title, priority) in &[("Eggs", 0), ("Milk", 5), ("Bread", 1)] {
        let mut task = Task::new(title.to_string());
        task.set_priority(*priority);
        task.save();
        task.set_list(Some(list_id.clone()));
        manager.create_task(task).await?;
    }
    Ok(list_id)
}
