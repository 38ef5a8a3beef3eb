//! Context dispatch: one operator kind, many device-specific implementations.
//!
//! A [`DispatchTable`] maps a [`DeviceType`] to the constructor of the
//! implementation compiled for it. Lookup is by exact device type. A device
//! without an entry is a configuration error, reported the same way on every
//! call.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::execution::context::{DeviceType, ExecutionContext};
use crate::ops::operator::Operator;
use crate::params::ParameterDescriptor;

/// Builds an implementation from its own copy of the descriptor
pub type OperatorConstructor<P> = fn(P, ExecutionContext) -> Box<dyn Operator>;

pub struct DispatchTable<P: ParameterDescriptor> {
    kind: &'static str,
    constructors: BTreeMap<DeviceType, OperatorConstructor<P>>,
}

impl<P: ParameterDescriptor> DispatchTable<P> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Install the constructor for `device`. Each device may be installed once.
    pub fn insert(&mut self, device: DeviceType, constructor: OperatorConstructor<P>) -> Result<()> {
        if self.constructors.contains_key(&device) {
            return Err(Error::InvalidConfiguration(format!(
                "Operator {} already has an implementation for {}",
                self.kind, device
            )));
        }

        debug!("{}: installing {} implementation", self.kind, device);
        self.constructors.insert(device, constructor);
        Ok(())
    }

    /// Drop every entry whose device is not in `enabled`
    pub fn retain_devices(&mut self, enabled: &[DeviceType]) {
        let kind = self.kind;
        self.constructors.retain(|device, _| {
            let keep = enabled.contains(device);
            if !keep {
                debug!("{}: {} implementation disabled by configuration", kind, device);
            }
            keep
        });
    }

    pub fn supports(&self, device: DeviceType) -> bool {
        self.constructors.contains_key(&device)
    }

    /// Installed devices, in declaration order of [`DeviceType`]
    pub fn supported_devices(&self) -> Vec<DeviceType> {
        self.constructors.keys().copied().collect()
    }

    /// Construct a fresh implementation for `ctx`.
    ///
    /// The descriptor is cloned so the caller keeps its own copy. Nothing is
    /// cached: every call returns a new instance.
    pub fn create(&self, ctx: ExecutionContext, param: &P) -> Result<Box<dyn Operator>> {
        let constructor = self.constructors.get(&ctx.device_type).ok_or_else(|| {
            Error::UnsupportedContext {
                kind: self.kind.to_string(),
                context: ctx.to_string(),
            }
        })?;

        trace!("{}: creating implementation for {}", self.kind, ctx);
        Ok(constructor(param.clone(), ctx))
    }
}

impl<P: ParameterDescriptor> fmt::Debug for DispatchTable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("kind", &self.kind)
            .field("devices", &self.supported_devices())
            .finish()
    }
}
