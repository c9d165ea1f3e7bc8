//! Symbolic call frames.

use std::sync::{Arc, OnceLock};

use crate::{
    debugger::{
        value::{PropertyMap, ValueContext},
        HostDebugger, HostFrame, HostLocation, HostValue, Value,
    },
    information::{DebugInformation, MethodRef, SourceLocation},
};

/// A host stack frame paired with its resolved source location.
#[derive(Debug, Clone)]
pub struct CallFrame {
    host_location: HostLocation,
    location: SourceLocation,
    context: Arc<ValueContext>,
    host_variables: Vec<(String, HostValue)>,
    variables: OnceLock<PropertyMap>,
}

impl CallFrame {
    pub(crate) fn new(
        frame: HostFrame,
        info: Option<Arc<DebugInformation>>,
        host: Arc<dyn HostDebugger>,
    ) -> Self {
        let location = info.as_ref().map_or(SourceLocation::UNKNOWN, |info| {
            info.source_location(frame.location.location)
        });

        CallFrame {
            host_location: frame.location,
            location,
            context: Arc::new(ValueContext { host, info }),
            host_variables: frame.variables,
            variables: OnceLock::new(),
        }
    }

    /// Where the frame executes in the generated code.
    #[must_use]
    pub fn host_location(&self) -> &HostLocation {
        &self.host_location
    }

    /// Where the frame executes in the original program. May be partially or entirely unknown.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// The enclosing method, if known.
    #[must_use]
    pub fn method(&self) -> Option<MethodRef> {
        self.location.method
    }

    /// Returns `true` if the frame has no source information at all.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.location.is_unknown()
    }

    /// The debug information of the frame's script.
    #[must_use]
    pub fn debug_information(&self) -> Option<&Arc<DebugInformation>> {
        self.context.info.as_ref()
    }

    /// Name of the source file.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.debug_information()?.files().name(self.location.file?)
    }

    /// Name of the enclosing class.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.debug_information()?
            .classes()
            .name(self.method()?.class_id)
    }

    /// Descriptor of the enclosing method.
    #[must_use]
    pub fn method_descriptor(&self) -> Option<&str> {
        self.debug_information()?
            .methods()
            .name(self.method()?.method_descriptor_id)
    }

    /// Local variables by source name.
    ///
    /// Every generated variable contributes one entry per source variable it stands for at the
    /// frame's location; generated variables without a source meaning are hidden. Frames without
    /// debug information show the generated names.
    pub fn variables(&self) -> &PropertyMap {
        self.variables.get_or_init(|| self.resolve_variables())
    }

    fn resolve_variables(&self) -> PropertyMap {
        let mut variables = PropertyMap::new();
        for (generated, value) in &self.host_variables {
            let value = Value::from_host(value.clone(), &self.context);
            match &self.context.info {
                Some(info) => {
                    let location = self.host_location.location;
                    for name in info.variable_meaning_at(location, generated) {
                        variables.insert(name.to_string(), value.clone());
                    }
                }
                None => {
                    variables.insert(generated.clone(), value);
                }
            }
        }
        variables
    }
}
