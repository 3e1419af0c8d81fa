//! Declarative field bindings.
//!
//! A host type lists its bound fields once in a [`BindingTable`]; the binding
//! engine harvests the table into [`HarvestedBindings`] and keeps the fields in
//! sync with the tree from then on.
//!
//! ```ignore
//! struct Settings { theme: String, port: u16 }
//!
//! impl Preferable for Settings {
//!     fn bindings() -> BindingTable<Self> {
//!         BindingTable::new()
//!             .tree_aware()
//!             .bind(Binding::field("theme", |s: &Settings| &s.theme, |s: &mut Settings| &mut s.theme)
//!                 .key("app.theme")
//!                 .default_value("light"))
//!             .bind(Binding::field("port", |s: &Settings| &s.port, |s: &mut Settings| &mut s.port)
//!                 .default_value("8080"))
//!     }
//! }
//! ```

use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::path::{derived_preference_path, is_below, PreferencePath};
use crate::domain::PrefValue;

/// Host instance shared between the host and the binding engine.
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// A host type whose fields are bound to preferences.
pub trait Preferable: Sized + Send + Sync + 'static {
    fn bindings() -> BindingTable<Self>;
}

// ============================================================
// Field types
// ============================================================

/// A Rust type that can live in a bound field.
pub trait PrefField: Sized + Send + Sync + 'static {
    /// Take `value` as-is if its shape already matches this type.
    fn from_pref(value: &PrefValue) -> Option<Self>;

    /// `Ok(None)` means "no value": saving removes the key.
    ///
    /// A value the store cannot represent is an error, never `None`.
    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure>;

    /// The value a field takes when its key disappears, if it can be empty at all.
    fn absent() -> Option<Self> {
        None
    }

    /// Key used to find a converter for this type.
    fn converter_type() -> TypeId {
        TypeId::of::<Self>()
    }
}

impl PrefField for bool {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        value.as_bool()
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        Ok(Some(PrefValue::Bool(*self)))
    }
}

macro_rules! int_field {
    ($($t:ty),*) => {
        $(
            impl PrefField for $t {
                fn from_pref(value: &PrefValue) -> Option<Self> {
                    value.as_i64().and_then(|i| <$t>::try_from(i).ok())
                }

                fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
                    i64::try_from(*self)
                        .map(|i| Some(PrefValue::Int(i)))
                        .map_err(|_| AccessFailure::OutOfRange(std::any::type_name::<$t>()))
                }
            }
        )*
    };
}

int_field!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl PrefField for f64 {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        Ok(Some(PrefValue::Float(*self)))
    }
}

impl PrefField for f32 {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Float(f) => Some(*f as f32),
            _ => None,
        }
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        Ok(Some(PrefValue::Float(*self as f64)))
    }
}

impl PrefField for String {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        Ok(Some(PrefValue::Text(self.clone())))
    }
}

impl PrefField for PrefValue {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        Some(value.clone())
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        Ok(Some(self.clone()))
    }
}

impl<F: PrefField> PrefField for Vec<F> {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::List(items) | PrefValue::Set(items) => {
                items.iter().map(F::from_pref).collect()
            }
            _ => None,
        }
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        let mut items = Vec::with_capacity(self.len());
        for item in self {
            items.extend(item.to_pref()?);
        }
        Ok(Some(PrefValue::List(items)))
    }
}

impl<F: PrefField> PrefField for Option<F> {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        F::from_pref(value).map(Some)
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        match self {
            Some(inner) => inner.to_pref(),
            None => Ok(None),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }

    fn converter_type() -> TypeId {
        F::converter_type()
    }
}

/// Dates are stored as ISO text (`2026-10-19`).
impl PrefField for NaiveDate {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        value
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, ISO_DATE).ok())
    }

    fn to_pref(&self) -> Result<Option<PrefValue>, AccessFailure> {
        Ok(Some(PrefValue::Text(self.format(ISO_DATE).to_string())))
    }
}

pub(crate) const ISO_DATE: &str = "%Y-%m-%d";

// ============================================================
// Accessors
// ============================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessFailure {
    #[error("a {0} value is not assignable")]
    NotAssignable(&'static str),
    #[error("field cannot hold an absent value")]
    AbsentNotAllowed,
    #[error("binding has neither accessor method nor field access")]
    NoAccessor,
    #[error("{0} value does not fit a stored integer")]
    OutOfRange(&'static str),
}

/// Type-erased read/write capability for one bound field of `T`.
pub trait FieldAccess<T>: Send + Sync {
    fn field_type(&self) -> &'static str;

    fn converter_type(&self) -> TypeId;

    fn accepts(&self, value: &PrefValue) -> bool;

    /// Write `value` (already in the field's shape) into `target`.
    fn assign(&self, target: &mut T, value: Option<&PrefValue>) -> Result<(), AccessFailure>;

    fn read(&self, target: &T) -> Result<Option<PrefValue>, AccessFailure>;
}

type FieldRef<T, F> = Arc<dyn Fn(&T) -> &F + Send + Sync>;
type FieldMut<T, F> = Arc<dyn Fn(&mut T) -> &mut F + Send + Sync>;
type Getter<T, F> = Arc<dyn Fn(&T) -> F + Send + Sync>;
type Setter<T, F> = Arc<dyn Fn(&mut T, F) + Send + Sync>;

struct Accessor<T, F> {
    field_ref: Option<FieldRef<T, F>>,
    field_mut: Option<FieldMut<T, F>>,
    getter: Option<Getter<T, F>>,
    setter: Option<Setter<T, F>>,
}

impl<T: 'static, F: PrefField> FieldAccess<T> for Accessor<T, F> {
    fn field_type(&self) -> &'static str {
        std::any::type_name::<F>()
    }

    fn converter_type(&self) -> TypeId {
        F::converter_type()
    }

    fn accepts(&self, value: &PrefValue) -> bool {
        F::from_pref(value).is_some()
    }

    /// Setter first, direct field write as fallback.
    fn assign(&self, target: &mut T, value: Option<&PrefValue>) -> Result<(), AccessFailure> {
        let typed = match value {
            Some(v) => F::from_pref(v).ok_or(AccessFailure::NotAssignable(v.kind()))?,
            None => F::absent().ok_or(AccessFailure::AbsentNotAllowed)?,
        };
        if let Some(setter) = &self.setter {
            setter(target, typed);
        } else if let Some(field_mut) = &self.field_mut {
            *field_mut(target) = typed;
        } else {
            return Err(AccessFailure::NoAccessor);
        }
        Ok(())
    }

    /// Getter first, direct field read as fallback.
    fn read(&self, target: &T) -> Result<Option<PrefValue>, AccessFailure> {
        if let Some(getter) = &self.getter {
            getter(target).to_pref()
        } else if let Some(field_ref) = &self.field_ref {
            field_ref(target).to_pref()
        } else {
            Err(AccessFailure::NoAccessor)
        }
    }
}

/// Access to a binding declared on an embedded parent type `P`.
struct Projected<T, P> {
    inner: Arc<dyn FieldAccess<P>>,
    up: Arc<dyn Fn(&T) -> &P + Send + Sync>,
    up_mut: Arc<dyn Fn(&mut T) -> &mut P + Send + Sync>,
}

impl<T: 'static, P: 'static> FieldAccess<T> for Projected<T, P> {
    fn field_type(&self) -> &'static str {
        self.inner.field_type()
    }

    fn converter_type(&self) -> TypeId {
        self.inner.converter_type()
    }

    fn accepts(&self, value: &PrefValue) -> bool {
        self.inner.accepts(value)
    }

    fn assign(&self, target: &mut T, value: Option<&PrefValue>) -> Result<(), AccessFailure> {
        self.inner.assign((self.up_mut)(target), value)
    }

    fn read(&self, target: &T) -> Result<Option<PrefValue>, AccessFailure> {
        self.inner.read((self.up)(target))
    }
}

// ============================================================
// Declarations
// ============================================================

/// One bound field, type-erased over the field's Rust type.
pub struct Binding<T> {
    field: String,
    declaring_type: Option<String>,
    key: Option<String>,
    args: Vec<String>,
    default_value: String,
    format: Option<String>,
    access: Arc<dyn FieldAccess<T>>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            declaring_type: self.declaring_type.clone(),
            key: self.key.clone(),
            args: self.args.clone(),
            default_value: self.default_value.clone(),
            format: self.format.clone(),
            access: Arc::clone(&self.access),
        }
    }
}

impl<T: 'static> Binding<T> {
    /// Bind a field through direct access.
    pub fn field<F: PrefField>(
        name: &str,
        get: impl Fn(&T) -> &F + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut F + Send + Sync + 'static,
    ) -> FieldBinding<T, F> {
        FieldBinding::new(
            name,
            Accessor {
                field_ref: Some(Arc::new(get)),
                field_mut: Some(Arc::new(get_mut)),
                getter: None,
                setter: None,
            },
        )
    }

    /// Bind a value through accessor methods only.
    pub fn property<F: PrefField>(
        name: &str,
        getter: impl Fn(&T) -> F + Send + Sync + 'static,
        setter: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> FieldBinding<T, F> {
        FieldBinding::new(
            name,
            Accessor {
                field_ref: None,
                field_mut: None,
                getter: Some(Arc::new(getter)),
                setter: Some(Arc::new(setter)),
            },
        )
    }

    pub fn field_name(&self) -> &str {
        &self.field
    }
}

/// Typed builder for a [`Binding`].
pub struct FieldBinding<T, F> {
    field: String,
    key: Option<String>,
    args: Vec<String>,
    default_value: String,
    format: Option<String>,
    accessor: Accessor<T, F>,
}

impl<T: 'static, F: PrefField> FieldBinding<T, F> {
    fn new(name: &str, accessor: Accessor<T, F>) -> Self {
        Self {
            field: name.to_string(),
            key: None,
            args: Vec::new(),
            default_value: String::new(),
            format: None,
            accessor,
        }
    }

    /// Explicit store path (`node.key`); without it the path derives from the type name.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Arguments for templated or deferred values.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Literal seeded into the tree when the key is missing.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Hint passed to the converter (e.g. a date pattern).
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn setter(mut self, setter: impl Fn(&mut T, F) + Send + Sync + 'static) -> Self {
        self.accessor.setter = Some(Arc::new(setter));
        self
    }

    pub fn getter(mut self, getter: impl Fn(&T) -> F + Send + Sync + 'static) -> Self {
        self.accessor.getter = Some(Arc::new(getter));
        self
    }
}

impl<T: 'static, F: PrefField> From<FieldBinding<T, F>> for Binding<T> {
    fn from(b: FieldBinding<T, F>) -> Self {
        Self {
            field: b.field,
            declaring_type: None,
            key: b.key,
            args: b.args,
            default_value: b.default_value,
            format: b.format,
            access: Arc::new(b.accessor),
        }
    }
}

/// All bindings declared for one host type.
pub struct BindingTable<T> {
    type_name: String,
    tree_aware: bool,
    bindings: Vec<Binding<T>>,
}

impl<T: 'static> Default for BindingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> BindingTable<T> {
    pub fn new() -> Self {
        Self::named(std::any::type_name::<T>())
    }

    /// Use `type_name` instead of the Rust type name when deriving paths.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            tree_aware: false,
            bindings: Vec::new(),
        }
    }

    /// Keep instances registered so later tree changes flow back into them.
    pub fn tree_aware(mut self) -> Self {
        self.tree_aware = true;
        self
    }

    pub fn bind(mut self, binding: impl Into<Binding<T>>) -> Self {
        let mut binding = binding.into();
        if binding.declaring_type.is_none() {
            binding.declaring_type = Some(self.type_name.clone());
        }
        self.bindings.push(binding);
        self
    }

    /// Include the bindings of an embedded parent type.
    pub fn inherit<P: Preferable>(
        mut self,
        up: impl Fn(&T) -> &P + Send + Sync + 'static,
        up_mut: impl Fn(&mut T) -> &mut P + Send + Sync + 'static,
    ) -> Self {
        let parent = P::bindings();
        let up: Arc<dyn Fn(&T) -> &P + Send + Sync> = Arc::new(up);
        let up_mut: Arc<dyn Fn(&mut T) -> &mut P + Send + Sync> = Arc::new(up_mut);
        for b in parent.bindings {
            self.bindings.push(Binding {
                field: b.field,
                declaring_type: b.declaring_type.or_else(|| Some(parent.type_name.clone())),
                key: b.key,
                args: b.args,
                default_value: b.default_value,
                format: b.format,
                access: Arc::new(Projected {
                    inner: b.access,
                    up: Arc::clone(&up),
                    up_mut: Arc::clone(&up_mut),
                }),
            });
        }
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_tree_aware(&self) -> bool {
        self.tree_aware
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ============================================================
// Harvested form
// ============================================================

/// A binding with its store path resolved.
pub struct BindingDescriptor<T> {
    /// `declaring::Type.field`, for diagnostics.
    pub fq_field_name: String,
    /// Store path as declared or derived.
    pub path: String,
    pub location: PreferencePath,
    /// Matches the paths carried by change events.
    pub canonical_path: String,
    pub args: Vec<String>,
    pub default_value: String,
    pub format: Option<String>,
    pub(crate) access: Arc<dyn FieldAccess<T>>,
}

impl<T> BindingDescriptor<T> {
    pub fn field_type(&self) -> &'static str {
        self.access.field_type()
    }

    /// Non-blank format hint.
    pub fn format_hint(&self) -> Option<&str> {
        self.format.as_deref().filter(|f| !f.trim().is_empty())
    }
}

pub struct HarvestedBindings<T> {
    type_name: String,
    tree_aware: bool,
    descriptors: Vec<BindingDescriptor<T>>,
    by_path: BTreeMap<String, usize>,
}

impl<T: 'static> HarvestedBindings<T> {
    /// Resolve every binding's path; bindings with an unusable path are skipped.
    pub fn harvest(table: BindingTable<T>) -> Self {
        let mut descriptors = Vec::with_capacity(table.bindings.len());
        let mut by_path = BTreeMap::new();

        for binding in table.bindings {
            let declaring = binding
                .declaring_type
                .unwrap_or_else(|| table.type_name.clone());
            let fq_field_name = format!("{declaring}.{}", binding.field);
            let path = match binding.key.as_deref().map(str::trim) {
                Some(key) if !key.is_empty() => key.to_string(),
                _ => derived_preference_path(&declaring, &binding.field),
            };
            let location = match PreferencePath::parse(&path) {
                Ok(location) => location,
                Err(e) => {
                    warn!("skipping binding of {fq_field_name}: {e}");
                    continue;
                }
            };
            debug!(
                "field {fq_field_name} [path='{path}', args={:?}, default='{}', format={:?}] is marked for preference injection",
                binding.args, binding.default_value, binding.format
            );

            let canonical_path = location.canonical();
            by_path.insert(canonical_path.clone(), descriptors.len());
            descriptors.push(BindingDescriptor {
                fq_field_name,
                path,
                location,
                canonical_path,
                args: binding.args,
                default_value: binding.default_value,
                format: binding.format,
                access: binding.access,
            });
        }

        Self {
            type_name: table.type_name,
            tree_aware: table.tree_aware,
            descriptors,
            by_path,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_tree_aware(&self) -> bool {
        self.tree_aware
    }

    pub fn descriptors(&self) -> &[BindingDescriptor<T>] {
        &self.descriptors
    }

    /// Descriptor bound to a canonical preference path.
    pub fn get(&self, canonical_path: &str) -> Option<&BindingDescriptor<T>> {
        self.by_path
            .get(canonical_path)
            .map(|&i| &self.descriptors[i])
    }

    pub fn contains_path(&self, canonical_path: &str) -> bool {
        self.by_path.contains_key(canonical_path)
    }

    /// True if any binding lives strictly below `node_path`.
    pub fn contains_path_below(&self, node_path: &str) -> bool {
        self.by_path.keys().any(|p| is_below(p, node_path))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
