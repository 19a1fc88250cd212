//! A source registry that keeps its sources and their tasks in a local folder
//!
//! This is the backend behind the "On This Computer" storage. It is also handy in tests, since it honors a [`MockBehaviour`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::mock_behaviour::MockBehaviour;
use crate::source::{Source, SourceExtensions};
use crate::traits::{CalClient, SourceRegistry};

const SOURCES_FILE: &str = "sources.json";
/// Subfolder that holds one file per source
const OBJECTS_FOLDER: &str = "objects";

/// Sources and the iCal objects they contain, indexed by UID
#[derive(Default, Debug)]
struct LocalData {
    sources: BTreeMap<String, Source>,
    objects: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug)]
struct Inner {
    /// `None` for a backend that lives in memory only
    folder: Option<PathBuf>,
    data: Mutex<LocalData>,
    mock_behaviour: Option<Arc<Mutex<MockBehaviour>>>,
}

/// A [`SourceRegistry`] that stores everything in a local folder
#[derive(Clone, Debug)]
pub struct LocalBackend {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl LocalBackend {
    /// A backend that is not persisted
    pub fn in_memory() -> Self {
        Self::build(None, LocalData::default())
    }

    /// Open the backend stored in a folder. The folder is created if needed
    pub fn from_folder(folder: &Path) -> Result<Self> {
        std::fs::create_dir_all(folder.join(OBJECTS_FOLDER))?;

        let mut data = LocalData::default();
        let sources_path = folder.join(SOURCES_FILE);
        if sources_path.exists() {
            let file = std::fs::File::open(&sources_path)?;
            let sources: Vec<Source> = serde_json::from_reader(file)?;
            for source in sources {
                let objects = match std::fs::File::open(objects_path(folder, source.uid())) {
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
                    Err(err) => return Err(err.into()),
                    Ok(file) => serde_json::from_reader(file)?,
                };
                data.objects.insert(source.uid().to_string(), objects);
                data.sources.insert(source.uid().to_string(), source);
            }
        }
        log::debug!("Opened local backend at {:?} ({} sources)", folder, data.sources.len());

        Ok(Self::build(Some(folder.to_path_buf()), data))
    }

    fn build(folder: Option<PathBuf>, data: LocalData) -> Self {
        Self {
            inner: Arc::new(Inner {
                folder,
                data: Mutex::new(data),
                mock_behaviour: None,
            }),
        }
    }

    /// Make this backend fail on purpose, according to `mock_behaviour`
    pub fn with_mock_behaviour(self, mock_behaviour: Arc<Mutex<MockBehaviour>>) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(inner) => inner,
            Err(shared) => {
                let data = lock(&shared.data);
                Inner {
                    folder: shared.folder.clone(),
                    data: Mutex::new(LocalData {
                        sources: data.sources.clone(),
                        objects: data.objects.clone(),
                    }),
                    mock_behaviour: None,
                }
            },
        };
        Self {
            inner: Arc::new(Inner { mock_behaviour: Some(mock_behaviour), ..inner }),
        }
    }

    /// How many objects a source contains
    pub fn object_count(&self, source_uid: &str) -> usize {
        lock(&self.inner.data).objects.get(source_uid).map(|o| o.len()).unwrap_or(0)
    }
}

impl Inner {
    fn check(&self, check: fn(&mut MockBehaviour) -> Result<()>) -> Result<()> {
        match &self.mock_behaviour {
            None => Ok(()),
            Some(behaviour) => check(&mut *lock(behaviour)),
        }
    }

    fn save_sources(&self, data: &LocalData) -> Result<()> {
        let folder = match &self.folder {
            None => return Ok(()),
            Some(folder) => folder,
        };
        let sources: Vec<&Source> = data.sources.values().collect();
        let file = std::fs::File::create(folder.join(SOURCES_FILE))?;
        serde_json::to_writer(file, &sources)?;
        Ok(())
    }

    /// Write the objects of a source, or delete its file in case `objects` is `None`
    fn save_objects(&self, source_uid: &str, objects: Option<&BTreeMap<String, String>>) -> Result<()> {
        let folder = match &self.folder {
            None => return Ok(()),
            Some(folder) => folder,
        };
        let path = objects_path(folder, source_uid);
        match objects {
            Some(objects) => {
                let file = std::fs::File::create(path)?;
                serde_json::to_writer(file, objects)?;
            },
            None => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
            },
        }
        Ok(())
    }
}

/// Source UIDs are percent-encoded, so that two different UIDs never share a file
fn objects_path(folder: &Path, source_uid: &str) -> PathBuf {
    folder
        .join(OBJECTS_FOLDER)
        .join(format!("{}.json", urlencoding::encode(source_uid)))
}

#[async_trait]
impl SourceRegistry for LocalBackend {
    async fn list_sources(&self, extensions: Option<SourceExtensions>) -> Result<Vec<Source>> {
        self.inner.check(MockBehaviour::can_list_sources)?;

        let data = lock(&self.inner.data);
        Ok(data.sources
            .values()
            .filter(|source| match extensions {
                None => true,
                Some(ext) => source.has_extension(ext),
            })
            .cloned()
            .collect())
    }

    async fn ref_source(&self, uid: &str) -> Option<Source> {
        lock(&self.inner.data).sources.get(uid).cloned()
    }

    async fn commit_source(&self, source: &Source) -> Result<()> {
        self.inner.check(MockBehaviour::can_commit_source)?;

        let mut data = lock(&self.inner.data);
        let uid = source.uid().to_string();
        let previous = data.sources.insert(uid.clone(), source.clone());
        let is_new = data.objects.contains_key(&uid) == false;
        if is_new {
            data.objects.insert(uid.clone(), BTreeMap::new());
        }

        let saved = self.inner.save_sources(&data)
            .and_then(|_| self.inner.save_objects(&uid, data.objects.get(&uid)));
        if saved.is_err() {
            match previous {
                Some(previous) => data.sources.insert(uid.clone(), previous),
                None => data.sources.remove(&uid),
            };
            if is_new {
                data.objects.remove(&uid);
            }
        }
        saved
    }

    async fn remove_source(&self, source: &Source) -> Result<()> {
        self.inner.check(MockBehaviour::can_remove_source)?;

        let mut data = lock(&self.inner.data);
        let uid = source.uid().to_string();
        let removed = match data.sources.remove(&uid) {
            None => return Err(Error::UnknownSource(uid)),
            Some(removed) => removed,
        };
        let removed_objects = data.objects.remove(&uid);

        let saved = self.inner.save_sources(&data)
            .and_then(|_| self.inner.save_objects(&uid, None));
        if saved.is_err() {
            data.sources.insert(uid.clone(), removed);
            if let Some(objects) = removed_objects {
                data.objects.insert(uid, objects);
            }
        }
        saved
    }

    async fn connect(&self, source: &Source, timeout: Duration) -> Result<Arc<dyn CalClient>> {
        self.inner.check(MockBehaviour::can_connect)?;

        if lock(&self.inner.data).sources.contains_key(source.uid()) == false {
            return Err(Error::UnknownSource(source.uid().to_string()));
        }
        log::debug!("Connecting to local source {} (timeout {:?} is not needed)", source.uid(), timeout);
        Ok(Arc::new(LocalClient {
            source_uid: source.uid().to_string(),
            backend: Arc::clone(&self.inner),
        }))
    }

    async fn invoke_authenticate(&self, source: &Source) -> Result<()> {
        log::debug!("Local source {} does not need any credentials", source.uid());
        Ok(())
    }
}


/// A client of one source of a [`LocalBackend`]
#[derive(Debug)]
pub struct LocalClient {
    source_uid: String,
    backend: Arc<Inner>,
}

impl LocalClient {
    /// Apply a change to the objects of this source.
    ///
    /// The change is kept only once it has been written to disk
    fn with_objects<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> Result<T>,
    {
        let mut data = lock(&self.backend.data);
        let mut objects = match data.objects.get(&self.source_uid) {
            None => return Err(Error::UnknownSource(self.source_uid.clone())),
            Some(objects) => objects.clone(),
        };
        let result = f(&mut objects)?;
        self.backend.save_objects(&self.source_uid, Some(&objects))?;
        data.objects.insert(self.source_uid.clone(), objects);
        Ok(result)
    }
}

#[async_trait]
impl CalClient for LocalClient {
    async fn get_object_list(&self, query: &str) -> Result<Vec<String>> {
        self.backend.check(MockBehaviour::can_get_object_list)?;

        let query = Query::parse(query)?;
        let data = lock(&self.backend.data);
        let objects = match data.objects.get(&self.source_uid) {
            None => return Err(Error::UnknownSource(self.source_uid.clone())),
            Some(objects) => objects,
        };
        Ok(objects.values()
            .filter(|ical| query.matches(ical))
            .cloned()
            .collect())
    }

    async fn create_object(&self, ical: &str) -> Result<Option<String>> {
        self.backend.check(MockBehaviour::can_create_object)?;

        let task = crate::ical::parse(ical)?;
        self.with_objects(|objects| {
            if objects.contains_key(task.uid()) {
                return Err(Error::Backend(format!("Object {} already exists", task.uid())));
            }
            objects.insert(task.uid().to_string(), ical.to_string());
            Ok(None)
        })
    }

    async fn modify_object(&self, ical: &str) -> Result<()> {
        self.backend.check(MockBehaviour::can_modify_object)?;

        let task = crate::ical::parse(ical)?;
        self.with_objects(|objects| {
            match objects.get_mut(task.uid()) {
                None => Err(Error::Backend(format!("No object {} to modify", task.uid()))),
                Some(existing) => {
                    *existing = ical.to_string();
                    Ok(())
                },
            }
        })
    }

    async fn remove_object(&self, uid: &str, rid: Option<&str>) -> Result<()> {
        self.backend.check(MockBehaviour::can_remove_object)?;

        if let Some(rid) = rid {
            log::debug!("Local objects have no recurrences, removing {} entirely (rid {})", uid, rid);
        }
        self.with_objects(|objects| {
            match objects.remove(uid) {
                None => Err(Error::Backend(format!("No object {} to remove", uid))),
                Some(_) => Ok(()),
            }
        })
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
enum QueryField {
    Any,
    Summary,
    Description,
}

/// The `contains?` expressions understood by the local backend, e.g. `(contains? "summary" "milk")`
#[derive(Debug, PartialEq)]
struct Query {
    field: QueryField,
    text: String,
}

impl Query {
    fn parse(query: &str) -> Result<Self> {
        let invalid = || Error::Backend(format!("Unsupported query {:?}", query));

        let trimmed = query.trim().trim_start_matches('(').trim_end_matches(')').trim();
        let rest = match trimmed.strip_prefix("contains?") {
            None => return Err(invalid()),
            Some(rest) => rest,
        };

        let mut chars = rest.chars().peekable();
        let mut words = Vec::new();
        loop {
            while chars.peek().map(|c| c.is_whitespace()) == Some(true) {
                chars.next();
            }
            match chars.next() {
                None => break,
                Some('"') => {},
                Some(_) => return Err(invalid()),
            }
            let mut word = String::new();
            loop {
                match chars.next() {
                    None => return Err(invalid()),
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        None => return Err(invalid()),
                        Some(c) => word.push(c),
                    },
                    Some(c) => word.push(c),
                }
            }
            words.push(word);
        }

        if words.len() != 2 {
            return Err(invalid());
        }
        let field = match words[0].as_str() {
            "any" => QueryField::Any,
            "summary" => QueryField::Summary,
            "description" => QueryField::Description,
            _ => return Err(invalid()),
        };
        Ok(Self { field, text: words[1].to_lowercase() })
    }

    fn matches(&self, ical: &str) -> bool {
        if self.text.is_empty() {
            return true;
        }
        let task = match crate::ical::parse(ical) {
            Err(err) => {
                log::warn!("Skipping an invalid local object: {}", err);
                return false;
            },
            Ok(task) => task,
        };
        let summary = task.title().unwrap_or("").to_lowercase();
        let description = task.description().to_lowercase();
        match self.field {
            QueryField::Summary => summary.contains(&self.text),
            QueryField::Description => description.contains(&self.text),
            QueryField::Any => summary.contains(&self.text) || description.contains(&self.text),
        }
    }
}
