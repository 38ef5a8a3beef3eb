pub mod registry;
pub mod operator;
pub mod tensor;
pub mod activations;

pub use registry::{bootstrap, bootstrap_with, global, OperatorDoc, OperatorRegistry, RegistryOptions};
pub use operator::{InferredShapes, Operator, OperatorProperty};
pub use tensor::{Tensor, Shape};

// Module files for math subdirectory
pub mod math {
    pub mod dense;
}

// Module files for nn subdirectory
pub mod nn {
    pub mod fully_connected;
}
