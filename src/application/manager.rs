//! Binding engine: injects tree values into host instances, saves them back,
//! and keeps registered instances in sync with later tree changes.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, instrument, warn};

use crate::application::binding::{
    AccessFailure, BindingDescriptor, HarvestedBindings, Preferable, Shared,
};
use crate::application::convert::ConverterRegistry;
use crate::application::registry::{InstanceHandle, InstanceRegistry, Registrant};
use crate::application::template::format_template;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::path::preference_path;
use crate::domain::{
    DomainResult, Node, NodeChangeEvent, NodeChangeKind, NodeChangeListener, PrefValue,
    PreferenceChangeEvent, PreferenceChangeListener, PreferencePath, Preferences,
};

/// How long a field write waits for the host instance's lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

/// Public handle to the binding engine. Cloning shares the engine.
#[derive(Clone)]
pub struct PreferencesManager {
    engine: Arc<BindingEngine>,
}

impl PreferencesManager {
    pub fn new(preferences: Preferences) -> Self {
        Self::with_converters(preferences, ConverterRegistry::with_defaults())
    }

    pub fn with_converters(preferences: Preferences, converters: ConverterRegistry) -> Self {
        Self::with_options(preferences, converters, DEFAULT_LOCK_TIMEOUT)
    }

    /// Builds the engine and installs its node and preference listeners on the tree.
    pub fn with_options(
        preferences: Preferences,
        converters: ConverterRegistry,
        lock_timeout: Duration,
    ) -> Self {
        let engine = Arc::new_cyclic(|weak: &Weak<BindingEngine>| {
            let on_node = weak.clone();
            let on_preference = weak.clone();
            BindingEngine {
                preferences,
                converters,
                lock_timeout,
                harvested: DashMap::new(),
                instances: InstanceRegistry::new(),
                node_listener: Arc::new(move |event: &NodeChangeEvent| {
                    if let Some(engine) = on_node.upgrade() {
                        engine.node_changed(event);
                    }
                }),
                preference_listener: Arc::new(move |event: &PreferenceChangeEvent| {
                    if let Some(engine) = on_preference.upgrade() {
                        engine.preference_changed(event);
                    }
                }),
            }
        });
        engine
            .preferences
            .add_node_change_listener(Arc::clone(&engine.node_listener));
        engine
            .preferences
            .add_preference_change_listener(Arc::clone(&engine.preference_listener));
        Self { engine }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.engine.preferences
    }

    pub fn converters(&self) -> &ConverterRegistry {
        &self.engine.converters
    }

    /// Bindings declared by `T`, harvested once and cached.
    pub fn harvest_bindings<T: Preferable>(&self) -> Arc<HarvestedBindings<T>> {
        self.engine.harvest_bindings::<T>()
    }

    /// Write every bound value from the tree into `instance`.
    ///
    /// Tree-aware types are registered and the returned handle identifies the registration.
    pub fn inject_preferences<T: Preferable>(&self, instance: &Shared<T>) -> Option<InstanceHandle> {
        self.engine.inject_preferences(instance)
    }

    /// Write every bound field of `instance` back into the tree.
    pub fn save<T: Preferable>(&self, instance: &Shared<T>) {
        self.engine.save(instance)
    }

    /// Forget `instance`; later tree changes no longer reach it.
    pub fn instance_destroyed<T>(&self, instance: &Shared<T>) -> bool {
        self.engine.instances.remove(identity_of(instance))
    }

    pub fn release(&self, handle: InstanceHandle) -> bool {
        self.engine.instances.release(handle)
    }

    pub fn is_registered<T>(&self, instance: &Shared<T>) -> bool {
        self.engine.instances.contains(identity_of(instance))
    }

    /// Number of live registrations.
    pub fn registered_instances(&self) -> usize {
        self.engine.instances.len()
    }

    pub fn prune(&self) -> usize {
        self.engine.instances.prune()
    }
}

impl fmt::Debug for PreferencesManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencesManager")
            .field("instances", &self.engine.instances)
            .field("harvested_types", &self.engine.harvested.len())
            .field("converters", &self.engine.converters)
            .finish()
    }
}

fn identity_of<T>(instance: &Shared<T>) -> usize {
    Arc::as_ptr(instance) as *const () as usize
}

pub(crate) struct BindingEngine {
    preferences: Preferences,
    converters: ConverterRegistry,
    lock_timeout: Duration,
    harvested: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    instances: InstanceRegistry<dyn SyncTarget>,
    node_listener: Arc<dyn NodeChangeListener>,
    preference_listener: Arc<dyn PreferenceChangeListener>,
}

impl Drop for BindingEngine {
    fn drop(&mut self) {
        self.preferences
            .remove_node_change_listener(&self.node_listener);
        self.preferences
            .remove_preference_change_listener(&self.preference_listener);
    }
}

impl BindingEngine {
    fn harvest_bindings<T: Preferable>(&self) -> Arc<HarvestedBindings<T>> {
        let type_id = TypeId::of::<T>();
        if let Some(cached) = self
            .harvested
            .get(&type_id)
            .and_then(|entry| Arc::clone(entry.value()).downcast::<HarvestedBindings<T>>().ok())
        {
            return cached;
        }
        let harvested = Arc::new(HarvestedBindings::harvest(T::bindings()));
        self.harvested.insert(type_id, harvested.clone());
        harvested
    }

    #[instrument(level = "debug", skip_all, fields(type_name = std::any::type_name::<T>()))]
    fn inject_preferences<T: Preferable>(&self, instance: &Shared<T>) -> Option<InstanceHandle> {
        let bindings = self.harvest_bindings::<T>();
        self.inject_all(instance, &bindings);
        if !bindings.is_tree_aware() {
            return None;
        }
        let target: Arc<dyn SyncTarget> = Arc::new(TypedTarget {
            instance: Arc::downgrade(instance),
            bindings,
        });
        Some(self.instances.add(target))
    }

    fn inject_all<T: 'static>(&self, instance: &Shared<T>, bindings: &HarvestedBindings<T>) {
        for descriptor in bindings.descriptors() {
            if let Err(e) = self.inject_field(instance, descriptor) {
                warn!("could not inject {}: {e}", descriptor.fq_field_name);
            }
        }
    }

    fn inject_field<T: 'static>(
        &self,
        instance: &Shared<T>,
        descriptor: &BindingDescriptor<T>,
    ) -> ApplicationResult<()> {
        let raw = self.resolve(descriptor)?;
        self.update_field(instance, descriptor, Some(raw))
    }

    /// Stored value for `descriptor`; a missing key is seeded with the declared default.
    fn resolve<T>(&self, descriptor: &BindingDescriptor<T>) -> ApplicationResult<PrefValue> {
        let node = self.node_at(&descriptor.location)?;
        let key = &descriptor.location.key;
        match node.get(key) {
            Some(value) => Ok(value),
            None => {
                debug!(
                    "{} not found, seeding default '{}' for {}",
                    descriptor.canonical_path, descriptor.default_value, descriptor.fq_field_name
                );
                let default = PrefValue::Text(descriptor.default_value.clone());
                node.put(key.as_str(), default.clone());
                Ok(default)
            }
        }
    }

    /// Expand templates and deferred values, convert if needed, and write the field.
    fn update_field<T: 'static>(
        &self,
        instance: &Shared<T>,
        descriptor: &BindingDescriptor<T>,
        raw: Option<PrefValue>,
    ) -> ApplicationResult<()> {
        let value = match raw {
            Some(raw) => Some(self.coerce(descriptor, materialize(raw, &descriptor.args))?),
            None => None,
        };

        let mut guard = instance
            .try_write_for(self.lock_timeout)
            .ok_or_else(|| {
                ApplicationError::field_access(&descriptor.fq_field_name, "instance is locked")
            })?;
        descriptor
            .access
            .assign(&mut guard, value.as_ref())
            .map_err(|e| access_error(descriptor, value.as_ref(), e))
    }

    fn coerce<T>(
        &self,
        descriptor: &BindingDescriptor<T>,
        value: PrefValue,
    ) -> ApplicationResult<PrefValue> {
        if descriptor.access.accepts(&value) {
            return Ok(value);
        }
        match self.converters.find(descriptor.access.converter_type()) {
            Some(converter) => converter.convert(&value, descriptor.format_hint()),
            None => Ok(value),
        }
    }

    #[instrument(level = "debug", skip_all, fields(type_name = std::any::type_name::<T>()))]
    fn save<T: Preferable>(&self, instance: &Shared<T>) {
        let bindings = self.harvest_bindings::<T>();
        let Some(guard) = instance.try_read_for(self.lock_timeout) else {
            warn!("could not save {}: instance is locked", bindings.type_name());
            return;
        };
        let values: Vec<_> = bindings
            .descriptors()
            .iter()
            .map(|d| (d, d.access.read(&guard)))
            .collect();
        drop(guard);

        for (descriptor, value) in values {
            let stored = value
                .map_err(|e| access_error(descriptor, None, e))
                .and_then(|value| self.store(descriptor, value));
            if let Err(e) = stored {
                warn!("could not save {}: {e}", descriptor.fq_field_name);
            }
        }
    }

    fn store<T>(
        &self,
        descriptor: &BindingDescriptor<T>,
        value: Option<PrefValue>,
    ) -> ApplicationResult<()> {
        let node = self.node_at(&descriptor.location)?;
        let key = descriptor.location.key.as_str();
        let Some(value) = value else {
            node.remove(key);
            return Ok(());
        };
        let value = match descriptor.format_hint() {
            Some(format) => match self.converters.find(descriptor.access.converter_type()) {
                Some(converter) => PrefValue::Text(converter.to_text(&value, Some(format))?),
                None => value,
            },
            None => value,
        };
        node.put(key, value);
        Ok(())
    }

    fn node_at(&self, location: &PreferencePath) -> DomainResult<Arc<Node>> {
        match &location.node {
            Some(path) => self.preferences.node(path),
            None => Ok(Arc::clone(self.preferences.root())),
        }
    }

    fn node_changed(&self, event: &NodeChangeEvent) {
        if event.kind != NodeChangeKind::Added {
            return;
        }
        for target in self.instances.snapshot() {
            if target.is_alive() && target.binds_below(&event.path) {
                debug!("node {} added, re-injecting {}", event.path, target.type_name());
                target.reinject(self);
            }
        }
    }

    fn preference_changed(&self, event: &PreferenceChangeEvent) {
        let path = preference_path(&event.path, &event.key);
        for target in self.instances.snapshot() {
            if target.is_alive() && target.binds(&path) {
                debug!("{path} changed, updating {}", target.type_name());
                target.apply(self, &path, event.new_value.as_ref());
            }
        }
    }
}

fn materialize(raw: PrefValue, args: &[String]) -> PrefValue {
    match raw {
        PrefValue::Text(template) if !args.is_empty() => {
            PrefValue::Text(format_template(&template, args))
        }
        PrefValue::Deferred(deferred) => deferred.call(args),
        other => other,
    }
}

fn access_error<T>(
    descriptor: &BindingDescriptor<T>,
    value: Option<&PrefValue>,
    failure: AccessFailure,
) -> ApplicationError {
    match (failure, value) {
        (AccessFailure::NotAssignable(_), Some(value)) => ApplicationError::conversion(
            descriptor.field_type(),
            value,
            format!("field {} rejects it", descriptor.fq_field_name),
        ),
        (failure, _) => ApplicationError::field_access(&descriptor.fq_field_name, failure.to_string()),
    }
}

/// A registered instance with its bindings, erased over the instance type.
pub(crate) trait SyncTarget: Registrant {
    fn type_name(&self) -> &str;

    fn binds(&self, canonical_path: &str) -> bool;

    fn binds_below(&self, node_path: &str) -> bool;

    fn reinject(&self, engine: &BindingEngine);

    fn apply(&self, engine: &BindingEngine, canonical_path: &str, value: Option<&PrefValue>);
}

struct TypedTarget<T> {
    instance: Weak<parking_lot::RwLock<T>>,
    bindings: Arc<HarvestedBindings<T>>,
}

impl<T: Send + Sync + 'static> Registrant for TypedTarget<T> {
    fn identity(&self) -> usize {
        self.instance.as_ptr() as *const () as usize
    }

    fn is_alive(&self) -> bool {
        self.instance.strong_count() > 0
    }
}

impl<T: Send + Sync + 'static> SyncTarget for TypedTarget<T> {
    fn type_name(&self) -> &str {
        self.bindings.type_name()
    }

    fn binds(&self, canonical_path: &str) -> bool {
        self.bindings.contains_path(canonical_path)
    }

    fn binds_below(&self, node_path: &str) -> bool {
        self.bindings.contains_path_below(node_path)
    }

    fn reinject(&self, engine: &BindingEngine) {
        if let Some(instance) = self.instance.upgrade() {
            engine.inject_all(&instance, &self.bindings);
        }
    }

    fn apply(&self, engine: &BindingEngine, canonical_path: &str, value: Option<&PrefValue>) {
        let (Some(instance), Some(descriptor)) =
            (self.instance.upgrade(), self.bindings.get(canonical_path))
        else {
            return;
        };
        if let Err(e) = engine.update_field(&instance, descriptor, value.cloned()) {
            warn!("could not update {}: {e}", descriptor.fq_field_name);
        }
    }
}
