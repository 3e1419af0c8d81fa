//! Host lifecycle hooks: load at startup, save at shutdown, follow instances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::application::binding::{Preferable, Shared};
use crate::application::manager::PreferencesManager;
use crate::application::registry::InstanceHandle;
use crate::infrastructure::persistence::PreferencesPersistor;

/// Drives a [`PreferencesManager`] and a persistor from host lifecycle events.
///
/// Persistence failures never reach the host; they are logged.
pub struct PreferencesLifecycle {
    manager: PreferencesManager,
    persistor: Arc<dyn PreferencesPersistor>,
    save_on_shutdown: AtomicBool,
}

impl PreferencesLifecycle {
    pub fn new(manager: PreferencesManager, persistor: Arc<dyn PreferencesPersistor>) -> Self {
        Self {
            manager,
            persistor,
            save_on_shutdown: AtomicBool::new(false),
        }
    }

    pub fn manager(&self) -> &PreferencesManager {
        &self.manager
    }

    pub fn persistor(&self) -> &Arc<dyn PreferencesPersistor> {
        &self.persistor
    }

    /// Load the backing store into the tree.
    ///
    /// Only a successful read or a store that does not exist yet arms the
    /// shutdown save; any other failure leaves the store untouched at shutdown.
    #[instrument(level = "debug", skip(self))]
    pub fn startup(&self) {
        match self.persistor.read(self.manager.preferences()) {
            Ok(()) => self.save_on_shutdown.store(true, Ordering::Release),
            Err(e) if e.is_not_found() => {
                info!("no stored preferences yet: {e}");
                self.save_on_shutdown.store(true, Ordering::Release);
            }
            Err(e) => warn!("could not load preferences: {e}"),
        }
    }

    /// Persist the tree if startup armed it.
    #[instrument(level = "debug", skip(self))]
    pub fn shutdown(&self) {
        if !self.saves_on_shutdown() {
            debug!("shutdown save is disabled");
            return;
        }
        if let Err(e) = self.persistor.write(self.manager.preferences()) {
            warn!("could not save preferences: {e}");
        }
    }

    pub fn saves_on_shutdown(&self) -> bool {
        self.save_on_shutdown.load(Ordering::Acquire)
    }

    pub fn instance_created<T: Preferable>(&self, instance: &Shared<T>) -> Option<InstanceHandle> {
        self.manager.inject_preferences(instance)
    }

    pub fn instance_destroyed<T>(&self, instance: &Shared<T>) -> bool {
        self.manager.instance_destroyed(instance)
    }

    pub fn release(&self, handle: InstanceHandle) -> bool {
        self.manager.release(handle)
    }
}
