pub mod context;
pub mod dispatch;

pub use context::{DeviceType, ExecutionContext};
pub use dispatch::{DispatchTable, OperatorConstructor};
