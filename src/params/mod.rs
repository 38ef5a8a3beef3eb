//! Typed, self-describing operator configuration.
//!
//! Every operator kind declares a [`ParamSchema`] once. Parsing user supplied
//! key/value strings and rendering documentation both go through it.

pub mod schema;
pub mod value;

use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::Result;

pub use schema::{Constraint, FieldSpec, FieldType, ParamSchema};
pub use value::{ParamValue, ParamValues};

/// Raw configuration mapping as supplied by a graph builder
pub type Kwargs = HashMap<String, String>;

/// Configuration record for one operator kind
pub trait ParameterDescriptor: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Field schema, available without constructing an instance
    fn schema() -> &'static ParamSchema;

    /// Build from values already checked against [`Self::schema`]
    fn from_values(values: &ParamValues) -> Result<Self>;

    /// String form of the bound values
    fn to_kwargs(&self) -> Kwargs;

    fn parse(kwargs: &Kwargs) -> Result<Self> {
        let values = Self::schema().parse(kwargs)?;
        Self::from_values(&values)
    }
}

/// Convenience for building a [`Kwargs`] from string pairs
pub fn kwargs<K, V, I>(pairs: I) -> Kwargs
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
