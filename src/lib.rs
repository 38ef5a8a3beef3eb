pub mod error;
pub mod params;
pub mod ops;
pub mod execution;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use params::{Kwargs, ParamSchema, ParameterDescriptor};
pub use ops::registry::{bootstrap, bootstrap_with, global, OperatorDoc, OperatorRegistry, RegistryOptions};
pub use ops::operator::{InferredShapes, Operator, OperatorProperty};
pub use ops::tensor::{Tensor, Shape};
pub use ops::nn::fully_connected::{FullyConnectedOp, FullyConnectedParam, FullyConnectedProperty};
pub use ops::activations::{ActivationOp, ActivationParam, ActivationProperty, ActivationType};
pub use execution::context::{DeviceType, ExecutionContext};
pub use execution::dispatch::DispatchTable;
