//! Converters between stored values and the shape a bound field expects.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::application::binding::ISO_DATE;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::PrefValue;

/// Turns a stored value into a field's native shape and back into text.
pub trait Converter: Send + Sync {
    /// Name of the produced type, for error messages.
    fn target(&self) -> &'static str;

    fn convert(&self, value: &PrefValue, format: Option<&str>) -> ApplicationResult<PrefValue>;

    /// Textual form written back to the tree when a format hint is present.
    fn to_text(&self, value: &PrefValue, _format: Option<&str>) -> ApplicationResult<String> {
        Ok(value.to_string())
    }
}

/// Converters keyed by the field type they produce.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: DashMap<TypeId, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with converters for the built-in field types.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register::<bool>(BoolConverter);
        for id in [
            TypeId::of::<i8>(),
            TypeId::of::<i16>(),
            TypeId::of::<i32>(),
            TypeId::of::<i64>(),
            TypeId::of::<u8>(),
            TypeId::of::<u16>(),
            TypeId::of::<u32>(),
            TypeId::of::<u64>(),
            TypeId::of::<usize>(),
        ] {
            registry.register_for(id, Arc::new(IntConverter));
        }
        registry.register::<f32>(FloatConverter);
        registry.register::<f64>(FloatConverter);
        registry.register::<String>(TextConverter);
        registry.register::<Vec<String>>(StringListConverter);
        registry.register::<NaiveDate>(DateConverter);
        registry
    }

    /// Register `converter` for field type `F`, replacing any previous one.
    pub fn register<F: 'static>(&self, converter: impl Converter + 'static) {
        self.register_for(TypeId::of::<F>(), Arc::new(converter));
    }

    pub fn register_for(&self, type_id: TypeId, converter: Arc<dyn Converter>) {
        self.converters.insert(type_id, converter);
    }

    pub fn find(&self, type_id: TypeId) -> Option<Arc<dyn Converter>> {
        self.converters.get(&type_id).map(|c| Arc::clone(c.value()))
    }

    pub fn contains<F: 'static>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<F>())
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

fn unsupported(target: &'static str, value: &PrefValue) -> ApplicationError {
    ApplicationError::conversion(target, value, format!("unsupported {} value", value.kind()))
}

pub struct BoolConverter;

impl Converter for BoolConverter {
    fn target(&self) -> &'static str {
        "bool"
    }

    fn convert(&self, value: &PrefValue, _format: Option<&str>) -> ApplicationResult<PrefValue> {
        match value {
            PrefValue::Bool(b) => Ok(PrefValue::Bool(*b)),
            PrefValue::Int(0) => Ok(PrefValue::Bool(false)),
            PrefValue::Int(1) => Ok(PrefValue::Bool(true)),
            PrefValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(PrefValue::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(PrefValue::Bool(false)),
                _ => Err(ApplicationError::conversion(
                    self.target(),
                    value,
                    "not a boolean literal",
                )),
            },
            other => Err(unsupported(self.target(), other)),
        }
    }
}

pub struct IntConverter;

impl Converter for IntConverter {
    fn target(&self) -> &'static str {
        "integer"
    }

    fn convert(&self, value: &PrefValue, _format: Option<&str>) -> ApplicationResult<PrefValue> {
        match value {
            PrefValue::Int(i) => Ok(PrefValue::Int(*i)),
            PrefValue::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                Ok(PrefValue::Int(*f as i64))
            }
            PrefValue::Text(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(PrefValue::Int(i));
                }
                match s.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 && f.is_finite() => Ok(PrefValue::Int(f as i64)),
                    _ => Err(ApplicationError::conversion(
                        self.target(),
                        value,
                        "not an integer",
                    )),
                }
            }
            other => Err(unsupported(self.target(), other)),
        }
    }
}

pub struct FloatConverter;

impl Converter for FloatConverter {
    fn target(&self) -> &'static str {
        "float"
    }

    fn convert(&self, value: &PrefValue, _format: Option<&str>) -> ApplicationResult<PrefValue> {
        match value {
            PrefValue::Float(f) => Ok(PrefValue::Float(*f)),
            PrefValue::Int(i) => Ok(PrefValue::Float(*i as f64)),
            PrefValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(PrefValue::Float)
                .map_err(|e| ApplicationError::conversion(self.target(), value, e.to_string())),
            other => Err(unsupported(self.target(), other)),
        }
    }
}

/// Renders any scalar as text.
pub struct TextConverter;

impl Converter for TextConverter {
    fn target(&self) -> &'static str {
        "text"
    }

    fn convert(&self, value: &PrefValue, _format: Option<&str>) -> ApplicationResult<PrefValue> {
        match value {
            PrefValue::Bool(_) | PrefValue::Int(_) | PrefValue::Float(_) | PrefValue::Text(_) => {
                Ok(PrefValue::Text(value.to_string()))
            }
            other => Err(unsupported(self.target(), other)),
        }
    }
}

/// Comma separated text (or the format hint as separator) to a list of strings.
pub struct StringListConverter;

impl StringListConverter {
    fn separator(format: Option<&str>) -> &str {
        format.filter(|f| !f.is_empty()).unwrap_or(",")
    }
}

impl Converter for StringListConverter {
    fn target(&self) -> &'static str {
        "string list"
    }

    fn convert(&self, value: &PrefValue, format: Option<&str>) -> ApplicationResult<PrefValue> {
        match value {
            PrefValue::Text(s) => Ok(PrefValue::List(
                s.split(Self::separator(format))
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(PrefValue::from)
                    .collect(),
            )),
            PrefValue::List(items) | PrefValue::Set(items) => Ok(PrefValue::List(
                items
                    .iter()
                    .map(|item| PrefValue::Text(item.to_string()))
                    .collect(),
            )),
            other => Err(unsupported(self.target(), other)),
        }
    }

    fn to_text(&self, value: &PrefValue, format: Option<&str>) -> ApplicationResult<String> {
        match value {
            PrefValue::List(items) | PrefValue::Set(items) => Ok(items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(Self::separator(format))),
            other => Ok(other.to_string()),
        }
    }
}

/// Dates; the format hint is a `chrono` pattern.
pub struct DateConverter;

impl DateConverter {
    fn pattern(format: Option<&str>) -> &str {
        format.unwrap_or(ISO_DATE)
    }
}

impl Converter for DateConverter {
    fn target(&self) -> &'static str {
        "date"
    }

    fn convert(&self, value: &PrefValue, format: Option<&str>) -> ApplicationResult<PrefValue> {
        let text = value.as_str().ok_or_else(|| unsupported(self.target(), value))?;
        let date = NaiveDate::parse_from_str(text.trim(), Self::pattern(format))
            .map_err(|e| ApplicationError::conversion(self.target(), value, e.to_string()))?;
        Ok(PrefValue::Text(date.format(ISO_DATE).to_string()))
    }

    fn to_text(&self, value: &PrefValue, format: Option<&str>) -> ApplicationResult<String> {
        let text = value.as_str().ok_or_else(|| unsupported(self.target(), value))?;
        let date = NaiveDate::parse_from_str(text, ISO_DATE)
            .map_err(|e| ApplicationError::conversion(self.target(), value, e.to_string()))?;
        Ok(date.format(Self::pattern(format)).to_string())
    }
}
