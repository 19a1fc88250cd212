//! Definitions of data sources and online accounts, as exchanged with the external services

use serde::{Deserialize, Serialize};
use csscolorparser::Color;

use bitflags::bitflags;

bitflags! {
    #[derive(Serialize, Deserialize)]
    pub struct SourceExtensions: u8 {
        /// The source holds calendar events
        const CALENDAR = 1;
        /// The source holds to-do items
        const TASK_LIST = 2;
        /// The source holds contacts
        const ADDRESS_BOOK = 4;
    }
}

/// The definition of a data source, as stored by a [`SourceRegistry`](crate::traits::SourceRegistry)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    uid: String,
    display_name: String,
    /// UID of the source this one is nested in (usually an account)
    parent: Option<String>,
    extensions: SourceExtensions,
    /// The backend that handles this source (e.g. `local`)
    backend_name: Option<String>,
    color: Option<Color>,
}

impl Source {
    pub fn new(uid: String, display_name: String, extensions: SourceExtensions) -> Self {
        Self {
            uid, display_name, extensions,
            parent: None,
            backend_name: None,
            color: None,
        }
    }

    /// Create a source with a random UID
    pub fn new_random(display_name: String, extensions: SourceExtensions) -> Self {
        let uid = uuid::Uuid::new_v4().to_hyphenated().to_string();
        Self::new(uid, display_name, extensions)
    }

    pub fn uid(&self) -> &str                  { &self.uid }
    pub fn display_name(&self) -> &str         { &self.display_name }
    pub fn parent(&self) -> Option<&str>       { self.parent.as_deref() }
    pub fn extensions(&self) -> SourceExtensions { self.extensions }
    pub fn backend_name(&self) -> Option<&str> { self.backend_name.as_deref() }
    pub fn color(&self) -> Option<&Color>      { self.color.as_ref() }

    pub fn has_extension(&self, extension: SourceExtensions) -> bool {
        self.extensions.contains(extension)
    }

    pub fn set_display_name(&mut self, display_name: String) { self.display_name = display_name; }
    pub fn set_parent(&mut self, parent: Option<String>)     { self.parent = parent; }
    pub fn set_backend_name(&mut self, name: Option<String>) { self.backend_name = name; }
    pub fn set_color(&mut self, color: Option<Color>)        { self.color = color; }
}


/// An online account, as known by an [`AccountsService`](crate::traits::AccountsService)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    /// e.g. `google`
    pub provider_type: String,
    /// e.g. `Google`
    pub provider_name: String,
    /// The user name on this account, e.g. `john@example.com`
    pub identity: String,
    /// Whether the user has disabled calendars for this account
    pub calendar_disabled: bool,
}

impl Account {
    /// Whether task lists can be stored on this account
    pub fn is_supported(&self) -> bool {
        crate::config::SUPPORTED_PROVIDERS.contains(&self.provider_type.as_str())
    }
}


/// Why a source needs credentials
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredentialsReason {
    Unknown,
    Required,
    Rejected,
    SslFailed,
    Error,
}

/// What the user answered to a certificate trust prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrustResponse {
    Unknown,
    Reject,
    Accept,
    AcceptTemporarily,
    RejectTemporarily,
}

impl TrustResponse {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TrustResponse::Accept | TrustResponse::AcceptTemporarily)
    }
}
