//! Application layer: binding engine and host lifecycle
//!
//! This layer binds host types to the domain tree and depends on I/O boundary traits.

pub mod binding;
pub mod convert;
pub mod error;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod template;

pub use binding::{
    shared, AccessFailure, Binding, BindingDescriptor, BindingTable, FieldAccess, FieldBinding,
    HarvestedBindings, PrefField, Preferable, Shared,
};
pub use convert::{Converter, ConverterRegistry};
pub use error::{ApplicationError, ApplicationResult};
pub use lifecycle::PreferencesLifecycle;
pub use manager::{PreferencesManager, DEFAULT_LOCK_TIMEOUT};
pub use registry::{InstanceHandle, InstanceRegistry, Registrant};
pub use template::format_template;
