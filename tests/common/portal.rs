//! Scripted portal
//!
//! An in-memory stand-in for a browser pointed at the incident portal.
//! Controls are found by exact locator value; every other strategy misses.
//! Saved incidents are recorded so tests can check what was typed.

use async_trait::async_trait;
use incident_autofill::core::driver::{
    Credentials, DriverError, DriverFactory, DriverResult, ElementHandle, PortalDriver,
};
use incident_autofill::core::locator::LocatorStrategy;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Locator values of the controls on the scripted incident form
pub const FORM_CONTROLS: [&str; 6] = ["#status", "#start", "#end", "#comment", "#action", "#save"];

/// One incident the portal accepted
#[derive(Debug, Clone, PartialEq)]
pub struct SavedIncident {
    pub external_id: String,
    pub fields: HashMap<String, String>,
}

impl SavedIncident {
    pub fn field(&self, control: &str) -> Option<&str> {
        self.fields.get(control).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct PortalState {
    controls: HashSet<String>,
    incidents: HashSet<String>,
    reject_login: bool,
    lose_session_on: Option<String>,
    current: Option<String>,
    draft: HashMap<String, String>,
    saved: Vec<SavedIncident>,
    logins: Vec<String>,
    closed: usize,
}

/// Shared handle onto the scripted portal; clones see the same state
#[derive(Debug, Clone, Default)]
pub struct ScriptedPortal {
    state: Arc<Mutex<PortalState>>,
}

impl ScriptedPortal {
    /// A portal with the full incident form and the given incidents on file
    pub fn with_incidents(ids: &[&str]) -> Self {
        let portal = Self::default();
        {
            let mut state = portal.state.lock();
            state.controls = FORM_CONTROLS.iter().map(|c| c.to_string()).collect();
            state.incidents = ids.iter().map(|id| id.to_string()).collect();
        }
        portal
    }

    pub fn rejecting_login(self) -> Self {
        self.state.lock().reject_login = true;
        self
    }

    /// Searching for `id` reports the browser session as gone
    pub fn losing_session_on(self, id: &str) -> Self {
        self.state.lock().lose_session_on = Some(id.to_string());
        self
    }

    pub fn without_control(self, control: &str) -> Self {
        self.state.lock().controls.remove(control);
        self
    }

    pub fn saved(&self) -> Vec<SavedIncident> {
        self.state.lock().saved.clone()
    }

    /// User names the portal saw log in
    pub fn logins(&self) -> Vec<String> {
        self.state.lock().logins.clone()
    }

    /// Number of browser sessions released
    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }
}

#[async_trait]
impl PortalDriver for ScriptedPortal {
    async fn authenticate(&self, credentials: &Credentials) -> DriverResult<bool> {
        let mut state = self.state.lock();
        state.logins.push(credentials.username.clone());
        Ok(!state.reject_login)
    }

    async fn search(&self, external_id: &str) -> DriverResult<bool> {
        let mut state = self.state.lock();
        if state.lose_session_on.as_deref() == Some(external_id) {
            return Err(DriverError::SessionLost("browser window closed".to_string()));
        }
        state.draft.clear();
        if state.incidents.contains(external_id) {
            state.current = Some(external_id.to_string());
            Ok(true)
        } else {
            state.current = None;
            Ok(false)
        }
    }

    async fn locate(&self, strategy: &LocatorStrategy) -> DriverResult<Option<ElementHandle>> {
        let state = self.state.lock();
        Ok(state
            .controls
            .contains(&strategy.value)
            .then(|| ElementHandle::new(strategy.value.clone())))
    }

    async fn clear(&self, handle: &ElementHandle) -> DriverResult<()> {
        self.state.lock().draft.remove(handle.id());
        Ok(())
    }

    async fn set_value(&self, handle: &ElementHandle, value: &str) -> DriverResult<()> {
        self.state
            .lock()
            .draft
            .insert(handle.id().to_string(), value.to_string());
        Ok(())
    }

    async fn submit(&self, _handle: &ElementHandle) -> DriverResult<bool> {
        let mut state = self.state.lock();
        let Some(external_id) = state.current.clone() else {
            return Ok(false);
        };
        let fields = std::mem::take(&mut state.draft);
        state.saved.push(SavedIncident {
            external_id,
            fields,
        });
        Ok(true)
    }

    async fn close(&self) -> DriverResult<()> {
        self.state.lock().closed += 1;
        Ok(())
    }
}

/// Hands out the same scripted portal for every launch
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    portal: ScriptedPortal,
    launches: Arc<Mutex<usize>>,
}

impl ScriptedFactory {
    pub fn new(portal: ScriptedPortal) -> Self {
        Self {
            portal,
            launches: Arc::new(Mutex::new(0)),
        }
    }

    pub fn launches(&self) -> usize {
        *self.launches.lock()
    }
}

#[async_trait]
impl DriverFactory for ScriptedFactory {
    async fn launch(&self) -> DriverResult<Box<dyn PortalDriver>> {
        *self.launches.lock() += 1;
        Ok(Box::new(self.portal.clone()))
    }
}
