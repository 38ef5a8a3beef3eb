//! FullyConnected (dense) operator: `output = data * weight^T + bias`.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use ndarray::{Ix1, Ix2};

use crate::error::{Error, Result};
use crate::execution::context::{DeviceType, ExecutionContext};
use crate::execution::dispatch::DispatchTable;
use crate::ops::math::dense::compute_dense;
use crate::ops::operator::{InferredShapes, Operator, OperatorProperty};
use crate::ops::registry::{OperatorRegistry, RegistryOptions};
use crate::ops::tensor::{shape_size, Shape, Tensor};
use crate::params::{kwargs, FieldSpec, Kwargs, ParamSchema, ParamValues, ParameterDescriptor};

pub const KIND: &str = "FullyConnected";

/// Configuration of a FullyConnected node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullyConnectedParam {
    pub hidden_units: usize,
    pub bias: bool,
    pub groups: usize,
    pub flatten: bool,
}

impl ParameterDescriptor for FullyConnectedParam {
    fn schema() -> &'static ParamSchema {
        static SCHEMA: OnceLock<ParamSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            ParamSchema::new(KIND)
                .field(FieldSpec::int("hidden_units", "Number of hidden units of the output.").at_least(1))
                .field(FieldSpec::boolean("bias", "Whether to add a bias term.").with_default(true))
                .field(
                    FieldSpec::int("groups", "Number of groups the input features and hidden units are split into.")
                        .at_least(1)
                        .with_default(1),
                )
                .field(
                    FieldSpec::boolean("flatten", "Whether to collapse all but the first axis of the input data.")
                        .with_default(true),
                )
        })
    }

    fn from_values(values: &ParamValues) -> Result<Self> {
        let param = Self {
            hidden_units: values.int("hidden_units")? as usize,
            bias: values.bool("bias")?,
            groups: values.int("groups")? as usize,
            flatten: values.bool("flatten")?,
        };

        if param.hidden_units % param.groups != 0 {
            return Err(Error::InvalidParameter {
                kind: KIND.to_string(),
                field: "groups".to_string(),
                value: param.groups.to_string(),
                reason: format!("must divide hidden_units ({})", param.hidden_units),
            });
        }

        Ok(param)
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("hidden_units", self.hidden_units.to_string()),
            ("bias", self.bias.to_string()),
            ("groups", self.groups.to_string()),
            ("flatten", self.flatten.to_string()),
        ])
    }
}

impl FullyConnectedParam {
    /// Split a non-empty data shape into the leading (batch) axes and the
    /// feature count. `None` when the flattened feature count overflows.
    fn split_data_shape(&self, data: &[usize]) -> Option<(Shape, usize)> {
        if self.flatten {
            Some((vec![data[0]], shape_size(&data[1..])?))
        } else {
            let last = data.len() - 1;
            Some((data[..last].to_vec(), data[last]))
        }
    }
}

/// Property of one FullyConnected node
#[derive(Debug, Clone)]
pub struct FullyConnectedProperty {
    param: Option<FullyConnectedParam>,
    dispatch: Arc<DispatchTable<FullyConnectedParam>>,
}

impl FullyConnectedProperty {
    pub fn new(dispatch: Arc<DispatchTable<FullyConnectedParam>>) -> Self {
        Self { param: None, dispatch }
    }

    pub fn param(&self) -> Result<&FullyConnectedParam> {
        self.param.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration(format!("{} property used before init", KIND))
        })
    }

    /// Dispatch table with every host implementation compiled into this build
    pub fn dispatch_table() -> Result<DispatchTable<FullyConnectedParam>> {
        let mut table = DispatchTable::new(KIND);
        table.insert(DeviceType::Cpu, FullyConnectedOp::boxed)?;
        table.insert(DeviceType::CpuPinned, FullyConnectedOp::boxed)?;
        Ok(table)
    }
}

impl OperatorProperty for FullyConnectedProperty {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &'static ParamSchema {
        FullyConnectedParam::schema()
    }

    fn init(&mut self, kwargs: &Kwargs) -> Result<()> {
        self.param = Some(FullyConnectedParam::parse(kwargs)?);
        Ok(())
    }

    fn params(&self) -> Result<Kwargs> {
        Ok(self.param()?.to_kwargs())
    }

    fn list_arguments(&self) -> Vec<String> {
        let with_bias = self.param.map(|p| p.bias).unwrap_or(true);
        let mut args = vec!["data".to_string(), "weight".to_string()];
        if with_bias {
            args.push("bias".to_string());
        }
        args
    }

    fn infer_shape(&self, in_shapes: &[Option<Shape>]) -> Result<InferredShapes> {
        let param = self.param()?;
        let arg_count = if param.bias { 3 } else { 2 };

        if in_shapes.len() > arg_count {
            return Err(Error::shape(KIND, format!(
                "expected at most {} input shapes, got {}",
                arg_count,
                in_shapes.len()
            )));
        }

        let data = in_shapes
            .first()
            .cloned()
            .flatten()
            .ok_or_else(|| Error::shape(KIND, "data shape is unknown"))?;

        if data.is_empty() {
            return Err(Error::shape(KIND, "data must have at least one axis"));
        }

        let (mut output, features) = param
            .split_data_shape(&data)
            .ok_or_else(|| Error::shape(KIND, format!("feature count of {:?} overflows", data)))?;
        if features % param.groups != 0 {
            return Err(Error::shape(KIND, format!(
                "input features ({}) must be divisible by groups ({})",
                features, param.groups
            )));
        }

        let weight = vec![param.hidden_units, features / param.groups];
        check_known_shape("weight", in_shapes.get(1), &weight)?;

        let mut arguments = vec![data, weight];
        if param.bias {
            let bias = vec![param.hidden_units];
            check_known_shape("bias", in_shapes.get(2), &bias)?;
            arguments.push(bias);
        }

        output.push(param.hidden_units);
        Ok(InferredShapes {
            arguments,
            outputs: vec![output],
        })
    }

    fn create_operator(&self, ctx: ExecutionContext) -> Result<Box<dyn Operator>> {
        self.dispatch.create(ctx, self.param()?)
    }
}

fn check_known_shape(name: &str, given: Option<&Option<Shape>>, expected: &[usize]) -> Result<()> {
    match given {
        Some(Some(shape)) if shape.as_slice() != expected => Err(Error::shape(KIND, format!(
            "{} shape mismatch: expected {:?}, got {:?}",
            name, expected, shape
        ))),
        _ => Ok(()),
    }
}

/// Host implementation of FullyConnected
#[derive(Debug, Clone)]
pub struct FullyConnectedOp {
    param: FullyConnectedParam,
    ctx: ExecutionContext,
}

impl FullyConnectedOp {
    pub fn new(param: FullyConnectedParam, ctx: ExecutionContext) -> Self {
        Self { param, ctx }
    }

    fn boxed(param: FullyConnectedParam, ctx: ExecutionContext) -> Box<dyn Operator> {
        Box::new(Self::new(param, ctx))
    }

    pub fn param(&self) -> &FullyConnectedParam {
        &self.param
    }
}

impl Operator for FullyConnectedOp {
    fn kind(&self) -> &str {
        KIND
    }

    fn context(&self) -> ExecutionContext {
        self.ctx
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Tensor]) -> Result<()> {
        let expected = if self.param.bias { 3 } else { 2 };
        if inputs.len() != expected {
            return Err(Error::Execution(format!(
                "{} requires {} inputs, got {}",
                KIND, expected, inputs.len()
            )));
        }

        if outputs.is_empty() {
            return Err(Error::Execution(format!("{} requires 1 output, got 0", KIND)));
        }

        let data = inputs[0];
        if data.shape.is_empty() {
            return Err(Error::Execution(format!("{} data must have at least one axis", KIND)));
        }

        let overflow = || Error::Execution(format!("{} data shape {:?} overflows", KIND, data.shape));
        let (mut out_shape, features) = self.param.split_data_shape(&data.shape).ok_or_else(overflow)?;
        let rows = shape_size(&out_shape).ok_or_else(overflow)?;

        let x = to_matrix(data, rows, features)?;
        let w = inputs[1]
            .data
            .view()
            .into_dimensionality::<Ix2>()
            .map_err(|_| Error::Execution(format!("{} weight must be 2D, got {:?}", KIND, inputs[1].shape)))?;

        let b = if self.param.bias {
            Some(inputs[2].data.view().into_dimensionality::<Ix1>().map_err(|_| {
                Error::Execution(format!("{} bias must be 1D, got {:?}", KIND, inputs[2].shape))
            })?)
        } else {
            None
        };

        if w.nrows() != self.param.hidden_units {
            return Err(Error::Execution(format!(
                "{} weight has {} rows, expected {}",
                KIND,
                w.nrows(),
                self.param.hidden_units
            )));
        }

        let result = compute_dense(&x.view(), &w, b.as_ref(), self.param.groups)?;

        out_shape.push(self.param.hidden_units);
        outputs[0] = Tensor::from_ndarray(result.into_dyn()).reshape(&out_shape)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn to_matrix(data: &Tensor, rows: usize, features: usize) -> Result<ndarray::Array2<f32>> {
    data.reshape(&[rows, features])?
        .data
        .into_dimensionality::<Ix2>()
        .map_err(|e| Error::Execution(format!("{} data reshape error: {}", KIND, e)))
}

/// Register FullyConnected with the devices enabled in `options`
pub fn register(registry: &mut OperatorRegistry, options: &RegistryOptions) -> Result<()> {
    let mut table = FullyConnectedProperty::dispatch_table()?;
    table.retain_devices(options.devices());
    let dispatch = Arc::new(table);

    registry.register(KIND, move || -> Box<dyn OperatorProperty> {
        Box::new(FullyConnectedProperty::new(Arc::clone(&dispatch)))
    })
}
