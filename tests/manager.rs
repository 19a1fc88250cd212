//! Loading sources, and task operations through the manager


use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::TryRecvError;

use todo_larder::local::LocalBackend;
use todo_larder::manager::ManagerEvent;
use todo_larder::mock_behaviour::MockBehaviour;
use todo_larder::settings::Settings;
use todo_larder::source::{Source, SourceExtensions};
use todo_larder::task_list::{TaskListEvent, TaskListId};
use todo_larder::traits::{CredentialsPrompter, Object, SourceRegistry};
use todo_larder::{Error, Manager, Task};

use fakes::*;


/// A manager with one loaded list, holding two tasks
async fn loaded_manager(behaviour: Arc<Mutex<MockBehaviour>>) -> (Manager, LocalBackend, TaskListId) {
    init_logs();
    let backend = LocalBackend::in_memory().with_mock_behaviour(behaviour);
    add_source_with_tasks(&backend, "chores", &["Vacuum", "Do the dishes"]).await;

    let mut manager = manager_for(Arc::new(backend.clone()));
    manager.load_sources().await.unwrap();
    assert!(manager.is_ready());
    (manager, backend, TaskListId::from("chores"))
}

fn no_mocked_failures() -> Arc<Mutex<MockBehaviour>> {
    Arc::new(Mutex::new(MockBehaviour::new()))
}


#[tokio::test]
async fn ready_at_once_without_sources() {
    init_logs();
    let mut manager = manager_for(Arc::new(LocalBackend::in_memory()));
    let mut events = manager.subscribe();
    assert_eq!(manager.is_ready(), false);

    manager.load_sources().await.unwrap();

    assert!(manager.is_ready());
    assert_eq!(drain(&mut events), vec![ManagerEvent::ReadyChanged(true)]);
}

#[tokio::test]
async fn ready_once_every_connection_completed() {
    init_logs();
    let behaviour = Arc::new(Mutex::new(MockBehaviour {
        connect_behaviour: (0, 1),
        ..MockBehaviour::default()
    }));
    let backend = LocalBackend::in_memory().with_mock_behaviour(Arc::clone(&behaviour));
    behaviour.lock().unwrap().suspend();
    for uid in &["groceries", "work", "garden"] {
        add_source_with_tasks(&backend, uid, &["something"]).await;
    }
    behaviour.lock().unwrap().resume();

    let mut manager = manager_for(Arc::new(backend));
    let mut events = manager.subscribe();
    manager.load_sources().await.unwrap();

    let events = drain(&mut events);
    // One connection has failed, but it has been processed anyway
    assert_eq!(count_lists_added(&events), 2);
    assert_eq!(events.len(), 3);
    assert_eq!(events.last(), Some(&ManagerEvent::ReadyChanged(true)));
    assert!(manager.is_ready());
    assert_eq!(manager.pending_loads(), 0);
    assert_eq!(manager.task_lists().len(), 2);
}

#[tokio::test]
async fn ready_only_after_the_last_connection_completed() {
    init_logs();
    let backend = LocalBackend::in_memory();
    let uids = ["groceries", "work", "garden", "books"];
    for uid in &uids {
        add_source_with_tasks(&backend, uid, &["something"]).await;
    }
    let (registry, mut gates) = GatedRegistry::new(backend, &uids);
    let mut manager = manager_for(Arc::new(registry));
    let mut events = manager.subscribe();

    // Connections complete in another order than they were started, and one of them fails
    let releases = [("garden", true), ("groceries", false), ("books", true), ("work", true)];
    let driver = async {
        for (index, (uid, succeeds)) in releases.iter().enumerate() {
            gates.remove(*uid).unwrap().send(*succeeds).unwrap();
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }

            let mut expected = Vec::new();
            if *succeeds {
                expected.push(ManagerEvent::ListAdded(TaskListId::from(*uid)));
            }
            if index == releases.len() - 1 {
                expected.push(ManagerEvent::ReadyChanged(true));
            }
            assert_eq!(drain(&mut events), expected, "after {} completed", uid);
        }
    };
    let (loaded, ()) = tokio::join!(manager.load_sources(), driver);

    loaded.unwrap();
    assert!(manager.is_ready());
    assert_eq!(manager.pending_loads(), 0);
    assert_eq!(manager.task_lists().len(), 3);
    assert!(manager.task_list(&TaskListId::from("groceries")).is_none());
}

#[tokio::test]
async fn loading_again_keeps_the_manager_ready() {
    init_logs();
    let backend = LocalBackend::in_memory();
    add_source_with_tasks(&backend, "first", &["One"]).await;
    let mut manager = manager_for(Arc::new(backend.clone()));
    manager.load_sources().await.unwrap();
    assert!(manager.is_ready());

    add_source_with_tasks(&backend, "second", &["Two"]).await;
    let mut events = manager.subscribe();
    manager.load_sources().await.unwrap();

    assert_eq!(drain(&mut events), vec![ManagerEvent::ListAdded(TaskListId::from("second"))]);
    assert!(manager.is_ready());
    assert_eq!(manager.pending_loads(), 0);
    assert_eq!(manager.task_lists().len(), 2);
}

#[tokio::test]
async fn ready_even_if_every_connection_failed() {
    init_logs();
    let backend = LocalBackend::in_memory();
    for uid in &["groceries", "work"] {
        add_source_with_tasks(&backend, uid, &[]).await;
    }
    let backend = backend.with_mock_behaviour(Arc::new(Mutex::new(MockBehaviour {
        connect_behaviour: (0, 2),
        ..MockBehaviour::default()
    })));

    let mut manager = manager_for(Arc::new(backend));
    let mut events = manager.subscribe();
    manager.load_sources().await.unwrap();

    assert!(manager.is_ready());
    assert!(manager.task_lists().is_empty());
    assert_eq!(drain(&mut events), vec![ManagerEvent::ReadyChanged(true)]);
}

#[tokio::test]
async fn registry_failure_is_returned() {
    init_logs();
    let backend = LocalBackend::in_memory();
    add_source_with_tasks(&backend, "groceries", &[]).await;
    let backend = backend.with_mock_behaviour(Arc::new(Mutex::new(MockBehaviour {
        list_sources_behaviour: (0, 1),
        ..MockBehaviour::default()
    })));

    let mut manager = manager_for(Arc::new(backend));
    assert!(manager.load_sources().await.is_err());
    assert_eq!(manager.is_ready(), false);
    assert!(manager.task_lists().is_empty());
}

#[tokio::test]
async fn lists_are_filled_with_their_tasks() {
    let (manager, _backend, list_id) = loaded_manager(no_mocked_failures()).await;

    let list = manager.task_list(&list_id).unwrap();
    assert_eq!(list.name(), "CHORES");
    assert_eq!(list.origin(), "On This Computer");
    assert!(list.is_ready());
    let titles: Vec<_> = list.sorted_tasks().iter().map(|t| t.title().unwrap()).collect();
    assert_eq!(titles, vec!["Do the dishes", "Vacuum"]);
    assert!(list.tasks().iter().all(|t| t.list() == Some(&list_id)));
}

#[tokio::test]
async fn other_sources_are_not_loaded() {
    init_logs();
    let backend = LocalBackend::in_memory();
    let birthdays = Source::new("birthdays".to_string(), "Birthdays".to_string(), SourceExtensions::CALENDAR);
    backend.commit_source(&birthdays).await.unwrap();
    let contacts = Source::new("contacts".to_string(), "Contacts".to_string(), SourceExtensions::ADDRESS_BOOK);
    backend.commit_source(&contacts).await.unwrap();
    let groceries = add_source_with_tasks(&backend, "groceries", &[]).await;

    let prompter = Arc::new(FakePrompter::default());
    prompter.set_auto_prompt_disabled_for(&birthdays, true);
    let mut manager = Manager::new(Arc::new(backend.clone()), Arc::new(FakeAccounts::default()), Arc::clone(&prompter) as _, Settings::in_memory());
    manager.load_sources().await.unwrap();

    assert_eq!(manager.task_lists().len(), 1);
    // Credentials are still prompted for event calendars and task lists, not for the other sources
    assert_eq!(prompter.auto_prompt_disabled_for(&birthdays), false);
    assert_eq!(prompter.auto_prompt_disabled_for(&groceries), false);
    assert!(prompter.auto_prompt_disabled_for(&contacts));

    let memos = Source::new("memos".to_string(), "Memos".to_string(), SourceExtensions::empty());
    backend.commit_source(&memos).await.unwrap();
    manager.source_added(memos.clone()).await.unwrap();
    assert!(prompter.auto_prompt_disabled_for(&memos));
    assert_eq!(manager.task_lists().len(), 1);
}

#[tokio::test]
async fn late_sources_do_not_affect_readiness() {
    init_logs();
    let backend = LocalBackend::in_memory();
    let mut manager = manager_for(Arc::new(backend.clone()));
    manager.load_sources().await.unwrap();
    assert!(manager.is_ready());

    let source = add_source_with_tasks(&backend, "late", &["Catch the train"]).await;
    let mut events = manager.subscribe();
    manager.source_added(source.clone()).await.unwrap();
    // Adding it twice does nothing
    manager.source_added(source).await.unwrap();

    assert_eq!(drain(&mut events), vec![ManagerEvent::ListAdded(TaskListId::from("late"))]);
    assert!(manager.is_ready());
    assert_eq!(manager.pending_loads(), 0);
    assert_eq!(manager.task_list(&TaskListId::from("late")).unwrap().len(), 1);

    let removed = manager.source_removed("late").unwrap();
    assert_eq!(removed.name(), "LATE");
    assert_eq!(drain(&mut events), vec![ManagerEvent::ListRemoved(TaskListId::from("late"))]);
    assert!(manager.source_removed("late").is_none());
}


#[tokio::test]
async fn create_task() {
    let (mut manager, backend, list_id) = loaded_manager(no_mocked_failures()).await;
    let mut list_events = manager.task_list(&list_id).unwrap().subscribe();

    let mut task = Task::new("Water the plants".to_string());
    task.set_list(Some(list_id.clone()));
    let id = manager.create_task(task).await.unwrap();

    assert_eq!(list_events.try_recv().unwrap(), TaskListEvent::TaskAdded(id.clone()));
    assert_eq!(list_events.try_recv(), Err(TryRecvError::Empty));
    let list = manager.task_list(&list_id).unwrap();
    assert_eq!(list.len(), 3);
    assert!(list.task(&id).unwrap().is_ready());
    assert_eq!(backend.object_count("chores"), 3);
}

#[tokio::test]
async fn failed_creation_leaves_the_list_unchanged() {
    let behaviour = no_mocked_failures();
    let (mut manager, backend, list_id) = loaded_manager(Arc::clone(&behaviour)).await;
    behaviour.lock().unwrap().create_object_behaviour = (0, 1);
    let mut list_events = manager.task_list(&list_id).unwrap().subscribe();

    let mut task = Task::new("Water the plants".to_string());
    task.set_list(Some(list_id.clone()));
    let err = manager.create_task(task).await.unwrap_err();

    assert!(matches!(err, Error::Backend(_)));
    assert_eq!(list_events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(manager.task_list(&list_id).unwrap().len(), 2);
    assert_eq!(backend.object_count("chores"), 2);
}

#[tokio::test]
async fn tasks_need_a_list() {
    let (mut manager, _backend, _list_id) = loaded_manager(no_mocked_failures()).await;

    let orphan = Task::new("Nowhere to go".to_string());
    assert!(matches!(manager.create_task(orphan).await, Err(Error::Orphan(_))));

    let mut lost = Task::new("Lost".to_string());
    lost.set_list(Some(TaskListId::from("no such list")));
    assert!(matches!(manager.create_task(lost).await, Err(Error::UnknownList(_))));
}

#[tokio::test]
async fn backend_may_assign_uids() {
    init_logs();
    let backend = LocalBackend::in_memory();
    add_source_with_tasks(&backend, "chores", &[]).await;
    let mut registry = RecordingRegistry::new(backend);
    registry.assign_uids = true;

    let mut manager = manager_for(Arc::new(registry));
    manager.load_sources().await.unwrap();

    let list_id = TaskListId::from("chores");
    let mut task = Task::new("Dust the shelves".to_string());
    let original_uid = task.uid().to_string();
    task.set_list(Some(list_id.clone()));
    let id = manager.create_task(task).await.unwrap();

    let created = manager.task_list(&list_id).unwrap().task(&id).unwrap();
    assert!(created.uid().starts_with("server-"));
    assert_ne!(created.uid(), original_uid);
}

#[tokio::test]
async fn update_task() {
    let behaviour = no_mocked_failures();
    let (mut manager, _backend, list_id) = loaded_manager(Arc::clone(&behaviour)).await;
    let mut task = manager.task_list(&list_id).unwrap().tasks()[0].clone();
    let id = task.id().clone();
    let original_title = task.title().unwrap().to_string();

    // A failed update changes nothing
    behaviour.lock().unwrap().modify_object_behaviour = (0, 1);
    let mut list_events = manager.task_list(&list_id).unwrap().subscribe();
    task.set_title("Renamed".to_string());
    task.save();
    assert!(manager.update_task(task.clone()).await.is_err());
    let member = manager.task_list(&list_id).unwrap().task(&id).unwrap();
    assert_eq!(member.title(), Some(original_title.as_str()));
    assert!(member.is_ready());
    assert_eq!(list_events.try_recv(), Err(TryRecvError::Empty));

    manager.update_task(task).await.unwrap();
    assert_eq!(list_events.try_recv().unwrap(), TaskListEvent::TaskUpdated(id.clone()));
    assert_eq!(list_events.try_recv(), Err(TryRecvError::Empty));
    let list = manager.task_list(&list_id).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.task(&id).unwrap().title(), Some("Renamed"));
}

#[tokio::test]
async fn update_task_commits_pending_edits() {
    let (mut manager, backend, list_id) = loaded_manager(no_mocked_failures()).await;
    let mut task = manager.task_list(&list_id).unwrap().tasks()[0].clone();
    let id = task.id().clone();
    let sequence = task.sequence();

    task.set_title("Vacuum the stairs".to_string());
    assert!(task.has_pending_changes());
    manager.update_task(task).await.unwrap();

    let member = manager.task_list(&list_id).unwrap().task(&id).unwrap();
    assert_eq!(member.title(), Some("Vacuum the stairs"));
    assert_eq!(member.has_pending_changes(), false);
    assert_eq!(member.sequence(), sequence + 1);

    let client = backend.connect(&backend.ref_source("chores").await.unwrap(), todo_larder::config::CONNECT_TIMEOUT).await.unwrap();
    let stored = client.get_object_list(r#"contains? "summary" "stairs""#).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(todo_larder::ical::parse(&stored[0]).unwrap().sequence(), sequence + 1);
}

#[tokio::test]
async fn update_unknown_task() {
    let (mut manager, _backend, list_id) = loaded_manager(no_mocked_failures()).await;
    let mut stranger = Task::new("Stranger".to_string());
    stranger.set_list(Some(list_id));
    assert!(matches!(manager.update_task(stranger).await, Err(Error::UnknownTask(_))));
}

#[tokio::test]
async fn remove_task() {
    let behaviour = no_mocked_failures();
    let (mut manager, backend, list_id) = loaded_manager(Arc::clone(&behaviour)).await;
    let id = manager.task_list(&list_id).unwrap().tasks()[0].id().clone();
    let mut list_events = manager.task_list(&list_id).unwrap().subscribe();

    behaviour.lock().unwrap().remove_object_behaviour = (0, 1);
    assert!(manager.remove_task(&list_id, &id).await.is_err());
    assert!(manager.task_list(&list_id).unwrap().task(&id).unwrap().is_ready());
    assert_eq!(list_events.try_recv(), Err(TryRecvError::Empty));

    let removed = manager.remove_task(&list_id, &id).await.unwrap();
    assert_eq!(removed.id(), &id);
    assert_eq!(list_events.try_recv().unwrap(), TaskListEvent::TaskRemoved(id.clone()));
    assert_eq!(manager.task_list(&list_id).unwrap().len(), 1);
    assert_eq!(backend.object_count("chores"), 1);

    assert!(matches!(manager.remove_task(&list_id, &id).await, Err(Error::UnknownTask(_))));
}


#[tokio::test]
async fn task_list_lifecycle() {
    init_logs();
    let backend = LocalBackend::in_memory();
    let mut manager = manager_for(Arc::new(backend.clone()));
    manager.load_sources().await.unwrap();
    let mut events = manager.subscribe();

    assert!(matches!(manager.create_task_list("nowhere", "Errands").await, Err(Error::UnknownStorage(_))));

    let list_id = manager.create_task_list("local", "Errands").await.unwrap();
    assert_eq!(drain(&mut events), vec![ManagerEvent::ListAdded(list_id.clone())]);
    let list = manager.task_list(&list_id).unwrap();
    assert_eq!(list.name(), "Errands");
    assert_eq!(list.origin(), "On This Computer");
    let source = backend.ref_source(list_id.as_str()).await.unwrap();
    assert_eq!(source.parent(), Some("local-stub"));

    manager.task_list_mut(&list_id).unwrap().set_name("Weekend errands".to_string());
    manager.save_task_list(&list_id).await.unwrap();
    assert_eq!(drain(&mut events), vec![ManagerEvent::ListChanged(list_id.clone())]);
    assert_eq!(backend.ref_source(list_id.as_str()).await.unwrap().display_name(), "Weekend errands");

    let removed = manager.remove_task_list(&list_id).await.unwrap();
    assert_eq!(removed.name(), "Weekend errands");
    assert_eq!(drain(&mut events), vec![ManagerEvent::ListRemoved(list_id.clone())]);
    assert!(manager.task_list(&list_id).is_none());
    assert!(backend.ref_source(list_id.as_str()).await.is_none());
}

#[tokio::test]
async fn lists_survive_a_restart() {
    init_logs();
    let folder = std::env::temp_dir().join(format!("todo-larder-manager-{}", uuid::Uuid::new_v4()));

    let list_id = {
        let mut manager = manager_for(Arc::new(LocalBackend::from_folder(&folder).unwrap()));
        manager.load_sources().await.unwrap();
        let list_id = manager.create_task_list("local", "Books").await.unwrap();
        let mut task = Task::new("Read Dune".to_string());
        task.set_list(Some(list_id.clone()));
        manager.create_task(task).await.unwrap();
        list_id
    };

    let mut manager = manager_for(Arc::new(LocalBackend::from_folder(&folder).unwrap()));
    manager.load_sources().await.unwrap();
    let list = manager.task_list(&list_id).unwrap();
    assert_eq!(list.name(), "Books");
    assert_eq!(list.tasks()[0].title(), Some("Read Dune"));

    let _ = std::fs::remove_dir_all(&folder);
}
