use std::any::Any;
use std::fmt::Debug;

use crate::error::Result;
use crate::execution::context::ExecutionContext;
use crate::params::{Kwargs, ParamSchema};
use super::tensor::{Tensor, Shape};

/// Context-bound implementation of an operator kind
pub trait Operator: Send + Sync + Debug {
    /// Name of the operator kind this implements
    fn kind(&self) -> &str;

    /// Context the implementation was built for
    fn context(&self) -> ExecutionContext;

    /// Run the operation. `inputs` follow the owning property's
    /// `list_arguments` order; `outputs` are overwritten in place.
    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Tensor]) -> Result<()>;

    /// Access to the concrete type, for inspection by tests and tooling
    fn as_any(&self) -> &dyn Any;
}

/// Result of shape inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredShapes {
    /// Completed shapes for every argument, in `list_arguments` order
    pub arguments: Vec<Shape>,
    /// Shapes for every output, in `list_outputs` order
    pub outputs: Vec<Shape>,
}

/// Per-node descriptor of an operator kind.
///
/// A property is created empty by the registry, bound to its configuration
/// with [`init`](OperatorProperty::init), and from then on answers shape and
/// naming questions and builds implementations for execution contexts.
pub trait OperatorProperty: Send + Sync + Debug {
    /// Operator kind name, as registered
    fn kind(&self) -> &str;

    /// Field schema of this kind's configuration
    fn schema(&self) -> &'static ParamSchema;

    /// Parse `kwargs` and bind the resulting descriptor
    fn init(&mut self, kwargs: &Kwargs) -> Result<()>;

    /// String form of the bound configuration
    fn params(&self) -> Result<Kwargs>;

    /// Argument names, in positional binding order
    fn list_arguments(&self) -> Vec<String> {
        vec!["data".to_string()]
    }

    fn list_outputs(&self) -> Vec<String> {
        vec!["output".to_string()]
    }

    /// Infer argument and output shapes from the known argument shapes.
    ///
    /// `in_shapes` is positional; trailing arguments may be omitted and any
    /// entry may be `None` when the caller leaves it to be inferred.
    fn infer_shape(&self, in_shapes: &[Option<Shape>]) -> Result<InferredShapes>;

    /// Build a new implementation for `ctx`, bound to this property's
    /// configuration. Fails if the kind has no implementation for the context.
    fn create_operator(&self, ctx: ExecutionContext) -> Result<Box<dyn Operator>>;
}
