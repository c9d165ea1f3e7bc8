//! Values inspected in the debuggee.
//!
//! Primitive values are copied out of the host immediately. Objects keep their host handle and
//! fetch their properties on first access; generated field names are translated back to the
//! original ones through the class metadata of the script the value was found in.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    debugger::{HostDebugger, HostObjectId, HostValue},
    information::DebugInformation,
    Result,
};

/// Properties by original name.
pub type PropertyMap = BTreeMap<String, Value>;

static NO_PROPERTIES: PropertyMap = BTreeMap::new();

/// What a value needs to resolve its properties later.
pub(crate) struct ValueContext {
    pub(crate) host: Arc<dyn HostDebugger>,
    pub(crate) info: Option<Arc<DebugInformation>>,
}

impl fmt::Debug for ValueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueContext")
            .field("has_debug_information", &self.info.is_some())
            .finish_non_exhaustive()
    }
}

/// Anything that exposes named properties.
pub trait HasProperties {
    /// All properties, keyed by original name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Transport`] if the host cannot be queried.
    fn properties(&self) -> Result<&PropertyMap>;

    /// A single property.
    ///
    /// # Errors
    /// Same as [`HasProperties::properties`].
    fn property(&self, name: &str) -> Result<Option<&Value>> {
        Ok(self.properties()?.get(name))
    }
}

/// A value in the debuggee.
#[derive(Debug, Clone)]
pub enum Value {
    /// The undefined value
    Undefined,
    /// The null reference
    Null,
    /// A boolean
    Boolean(bool),
    /// A number
    Number(f64),
    /// A string
    String(String),
    /// An object with lazily resolved properties
    Object(ObjectValue),
}

impl Value {
    pub(crate) fn from_host(value: HostValue, context: &Arc<ValueContext>) -> Self {
        match value {
            HostValue::Undefined => Value::Undefined,
            HostValue::Null => Value::Null,
            HostValue::Boolean(value) => Value::Boolean(value),
            HostValue::Number(value) => Value::Number(value),
            HostValue::String(value) => Value::String(value),
            HostValue::Object { handle, class_name } => Value::Object(ObjectValue {
                handle,
                class_name,
                context: Arc::clone(context),
                properties: OnceLock::new(),
            }),
        }
    }

    /// Short name of the value's kind.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// The number, if this is one.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// The string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// The object, if this is one.
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl HasProperties for Value {
    fn properties(&self) -> Result<&PropertyMap> {
        match self {
            Value::Object(object) => object.properties(),
            _ => Ok(&NO_PROPERTIES),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Number(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value:?}"),
            Value::Object(object) => match &object.class_name {
                Some(class_name) => write!(f, "{class_name}@{}", object.handle),
                None => write!(f, "object@{}", object.handle),
            },
        }
    }
}

/// An object in the debuggee.
///
/// The property map is computed on first access and then cached. Concurrent first accesses may
/// each query the host, but only one result is ever published and all callers observe that one.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    handle: HostObjectId,
    class_name: Option<String>,
    context: Arc<ValueContext>,
    properties: OnceLock<PropertyMap>,
}

impl ObjectValue {
    /// Host handle of the object.
    #[must_use]
    pub fn handle(&self) -> HostObjectId {
        self.handle
    }

    /// Class name reported by the host.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    fn resolve(&self) -> Result<PropertyMap> {
        let raw = self.context.host.properties(self.handle)?;

        let mut properties = PropertyMap::new();
        for (generated, value) in raw {
            let name = match (&self.context.info, &self.class_name) {
                (Some(info), Some(class_name)) => info
                    .field_meaning(class_name, &generated)
                    .map_or(generated.clone(), str::to_string),
                _ => generated,
            };
            properties.insert(name, Value::from_host(value, &self.context));
        }
        Ok(properties)
    }
}

impl HasProperties for ObjectValue {
    fn properties(&self) -> Result<&PropertyMap> {
        if let Some(properties) = self.properties.get() {
            return Ok(properties);
        }
        let computed = self.resolve()?;
        Ok(self.properties.get_or_init(|| computed))
    }
}
