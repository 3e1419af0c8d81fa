//! Service container for dependency injection
//!
//! Wires the tree, binding engine, persistor and lifecycle from [`Settings`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::application::{
    ApplicationError, ApplicationResult, ConverterRegistry, PreferencesLifecycle,
    PreferencesManager,
};
use crate::config::Settings;
use crate::domain::Preferences;
use crate::infrastructure::persistence::{JsonPreferencesPersistor, PreferencesPersistor};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

pub type ManagerFactory = fn(Preferences) -> PreferencesManager;
pub type PersistorFactory = fn(Arc<dyn FileSystem>, &Settings) -> Arc<dyn PreferencesPersistor>;

/// Named factories selectable through `manager_factory` / `persistor_factory`.
#[derive(Clone)]
pub struct Factories {
    managers: BTreeMap<String, ManagerFactory>,
    persistors: BTreeMap<String, PersistorFactory>,
}

impl Default for Factories {
    fn default() -> Self {
        let mut factories = Self {
            managers: BTreeMap::new(),
            persistors: BTreeMap::new(),
        };
        factories.register_manager("default", PreferencesManager::new);
        factories.register_manager("plain", |prefs| {
            PreferencesManager::with_converters(prefs, ConverterRegistry::new())
        });
        factories.register_persistor("json", |fs, settings| {
            Arc::new(JsonPreferencesPersistor::new(fs, settings.location.clone()))
        });
        factories
    }
}

impl Factories {
    pub fn register_manager(&mut self, name: impl Into<String>, factory: ManagerFactory) {
        self.managers.insert(name.into(), factory);
    }

    pub fn register_persistor(&mut self, name: impl Into<String>, factory: PersistorFactory) {
        self.persistors.insert(name.into(), factory);
    }

    fn manager(&self, name: &str) -> ApplicationResult<ManagerFactory> {
        self.managers
            .get(name)
            .copied()
            .ok_or_else(|| unknown("manager", name, self.managers.keys()))
    }

    fn persistor(&self, name: &str) -> ApplicationResult<PersistorFactory> {
        self.persistors
            .get(name)
            .copied()
            .ok_or_else(|| unknown("persistor", name, self.persistors.keys()))
    }
}

fn unknown<'a>(
    kind: &str,
    name: &str,
    available: impl Iterator<Item = &'a String>,
) -> ApplicationError {
    let available: Vec<&str> = available.map(String::as_str).collect();
    ApplicationError::Config {
        message: format!(
            "unknown {kind} factory '{name}' (available: {})",
            available.join(", ")
        ),
    }
}

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub lifecycle: PreferencesLifecycle,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> ApplicationResult<Self> {
        Self::with_factories(settings, fs, &Factories::default())
    }

    pub fn with_factories(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        factories: &Factories,
    ) -> ApplicationResult<Self> {
        let make_manager = factories.manager(&settings.manager_factory)?;
        let make_persistor = factories.persistor(&settings.persistor_factory)?;
        debug!(
            manager = %settings.manager_factory,
            persistor = %settings.persistor_factory,
            location = %settings.location.display(),
            "wiring services"
        );

        let manager = make_manager(Preferences::new());
        let persistor = make_persistor(Arc::clone(&fs), &settings);
        Ok(Self {
            settings: Arc::new(settings),
            fs,
            lifecycle: PreferencesLifecycle::new(manager, persistor),
        })
    }

    pub fn preferences(&self) -> &Preferences {
        self.lifecycle.manager().preferences()
    }

    pub fn manager(&self) -> &PreferencesManager {
        self.lifecycle.manager()
    }

    pub fn persistor(&self) -> &Arc<dyn PreferencesPersistor> {
        self.lifecycle.persistor()
    }
}
