use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use log::{debug, info};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::error::{Error, Result};
use crate::execution::context::DeviceType;
use crate::params::{FieldSpec, Kwargs, ParamSchema};
use super::operator::OperatorProperty;

/// Constructor of an unconfigured property for one operator kind
pub type PropertyConstructor = Box<dyn Fn() -> Box<dyn OperatorProperty> + Send + Sync>;

/// Options applied when the built-in operators are registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Device types whose implementations are installed
    devices: Vec<DeviceType>,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            devices: DeviceType::iter().collect(),
        }
    }
}

impl RegistryOptions {
    /// Create options enabling every device type
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict installed implementations to `devices`
    pub fn set_devices(mut self, devices: &[DeviceType]) -> Self {
        let mut devices = devices.to_vec();
        devices.sort();
        devices.dedup();
        self.devices = devices;
        self
    }

    /// Disable one device type
    pub fn disable_device(mut self, device: DeviceType) -> Self {
        self.devices.retain(|d| *d != device);
        self
    }

    pub fn devices(&self) -> &[DeviceType] {
        &self.devices
    }
}

/// Documentation of a registered operator kind
#[derive(Debug, Clone, Serialize)]
pub struct OperatorDoc {
    pub name: String,
    pub description: String,
    pub arguments: Vec<String>,
    pub outputs: Vec<String>,
    pub fields: Vec<FieldSpec>,
}

impl OperatorDoc {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::InvalidConfiguration(format!("Failed to serialize docs for {}: {}", self.name, e))
        })
    }
}

struct RegistryEntry {
    constructor: PropertyConstructor,
    schema: &'static ParamSchema,
    arguments: Vec<String>,
    outputs: Vec<String>,
}

impl RegistryEntry {
    fn doc(&self, name: &str) -> OperatorDoc {
        OperatorDoc {
            name: name.to_string(),
            description: format!("{}\n{}", name, self.schema.docstring()),
            arguments: self.arguments.clone(),
            outputs: self.outputs.clone(),
            fields: self.schema.fields().to_vec(),
        }
    }
}

/// Catalog of operator kinds, keyed by name
#[derive(Default)]
pub struct OperatorRegistry {
    operators: HashMap<String, RegistryEntry>,
    options: RegistryOptions,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.operator_names())
            .field("options", &self.options)
            .finish()
    }
}

impl OperatorRegistry {
    /// Create an empty operator registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operator kind.
    ///
    /// The constructor is called once here to capture the kind's schema and
    /// argument names. A name can only be registered once; the first
    /// registration is kept.
    pub fn register<F>(&mut self, name: &str, constructor: F) -> Result<()>
    where
        F: Fn() -> Box<dyn OperatorProperty> + Send + Sync + 'static,
    {
        if self.operators.contains_key(name) {
            return Err(Error::DuplicateRegistration(name.to_string()));
        }

        let sample = constructor();
        if sample.kind() != name {
            return Err(Error::InvalidConfiguration(format!(
                "Operator registered as {} constructs properties of kind {}",
                name,
                sample.kind()
            )));
        }

        debug!("Registering operator {}", name);
        self.operators.insert(
            name.to_string(),
            RegistryEntry {
                constructor: Box::new(constructor),
                schema: sample.schema(),
                arguments: sample.list_arguments(),
                outputs: sample.list_outputs(),
            },
        );
        Ok(())
    }

    /// Initialize a registry with the built-in operators
    pub fn with_builtin_operators(options: RegistryOptions) -> Result<Self> {
        use crate::ops::activations;
        use crate::ops::nn::fully_connected;

        let mut registry = Self {
            operators: HashMap::new(),
            options: options.clone(),
        };

        fully_connected::register(&mut registry, &options)?;
        activations::register(&mut registry, &options)?;

        Ok(registry)
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Registered names, sorted
    pub fn operator_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Field schema of a kind, without constructing a property
    pub fn schema(&self, name: &str) -> Result<&'static ParamSchema> {
        Ok(self.entry(name)?.schema)
    }

    /// A fresh, unconfigured property
    pub fn property(&self, name: &str) -> Result<Box<dyn OperatorProperty>> {
        Ok((self.entry(name)?.constructor)())
    }

    /// A property configured from `kwargs`
    pub fn create_property(&self, name: &str, kwargs: &Kwargs) -> Result<Box<dyn OperatorProperty>> {
        let mut property = self.property(name)?;
        property.init(kwargs)?;
        Ok(property)
    }

    pub fn describe(&self, name: &str) -> Result<OperatorDoc> {
        Ok(self.entry(name)?.doc(name))
    }

    /// Docs of every registered kind, sorted by name
    pub fn describe_all(&self) -> Vec<OperatorDoc> {
        let mut docs: Vec<OperatorDoc> = self
            .operators
            .iter()
            .map(|(name, entry)| entry.doc(name))
            .collect();
        docs.sort_by(|a, b| a.name.cmp(&b.name));
        docs
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry> {
        self.operators
            .get(name)
            .ok_or_else(|| Error::UnknownOperator(name.to_string()))
    }
}

static GLOBAL_REGISTRY: OnceLock<Result<OperatorRegistry>> = OnceLock::new();

/// Populate the process-wide registry with default options.
///
/// See [`bootstrap_with`].
pub fn bootstrap() -> Result<&'static OperatorRegistry> {
    bootstrap_with(RegistryOptions::default())
}

/// Populate the process-wide registry.
///
/// The first call registers the built-in operators and fixes the options.
/// Later calls with equal options return the same registry; later calls with
/// different options fail. A registration failure is kept and returned by
/// every call. The registry is never torn down; it lives until process exit.
pub fn bootstrap_with(options: RegistryOptions) -> Result<&'static OperatorRegistry> {
    let registry = GLOBAL_REGISTRY
        .get_or_init(|| {
            info!("Bootstrapping operator registry with devices {:?}", options.devices());
            OperatorRegistry::with_builtin_operators(options.clone())
        })
        .as_ref()
        .map_err(Clone::clone)?;

    if registry.options() != &options {
        return Err(Error::InvalidConfiguration(format!(
            "Operator registry already initialized with devices {:?}, requested {:?}",
            registry.options().devices(),
            options.devices()
        )));
    }

    Ok(registry)
}

/// The process-wide registry, if [`bootstrap`] has run
pub fn global() -> Option<&'static OperatorRegistry> {
    GLOBAL_REGISTRY.get().and_then(|r| r.as_ref().ok())
}
