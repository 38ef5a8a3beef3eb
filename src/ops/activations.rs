use std::any::Any;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use num_traits::Float;
use strum::VariantNames;
use strum_macros::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::error::{Error, Result};
use crate::execution::context::{DeviceType, ExecutionContext};
use crate::execution::dispatch::DispatchTable;
use crate::ops::operator::{InferredShapes, Operator, OperatorProperty};
use crate::ops::registry::{OperatorRegistry, RegistryOptions};
use crate::ops::tensor::{element_wise_unary_op, Shape, Tensor};
use crate::params::{kwargs, FieldSpec, Kwargs, ParamSchema, ParamValues, ParameterDescriptor};

pub const KIND: &str = "Activation";

/// Elementwise activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum ActivationType {
    Relu,
    Sigmoid,
    Tanh,
    /// `ln(1 + e^x)`
    SoftRelu,
}

impl ActivationType {
    pub fn apply<T: Float>(self, x: T) -> T {
        match self {
            ActivationType::Relu => relu(x),
            ActivationType::Sigmoid => sigmoid(x),
            ActivationType::Tanh => x.tanh(),
            ActivationType::SoftRelu => softrelu(x),
        }
    }
}

fn relu<T: Float>(x: T) -> T {
    if x > T::zero() { x } else { T::zero() }
}

fn sigmoid<T: Float>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

fn softrelu<T: Float>(x: T) -> T {
    // Large inputs would overflow exp; ln(1 + e^x) ~= x there
    let threshold = <T as num_traits::NumCast>::from(20.0).unwrap_or_else(T::max_value);
    if x > threshold { x } else { x.exp().ln_1p() }
}

/// Configuration of an Activation node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationParam {
    pub act_type: ActivationType,
}

impl ParameterDescriptor for ActivationParam {
    fn schema() -> &'static ParamSchema {
        static SCHEMA: OnceLock<ParamSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            ParamSchema::new(KIND).field(FieldSpec::enumeration(
                "act_type",
                ActivationType::VARIANTS,
                "Activation function to apply.",
            ))
        })
    }

    fn from_values(values: &ParamValues) -> Result<Self> {
        let raw = values.enumeration("act_type")?;
        let act_type = ActivationType::from_str(raw).map_err(|_| Error::InvalidParameter {
            kind: KIND.to_string(),
            field: "act_type".to_string(),
            value: raw.to_string(),
            reason: "unknown activation".to_string(),
        })?;
        Ok(Self { act_type })
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([("act_type", self.act_type.to_string())])
    }
}

/// Property of one Activation node
#[derive(Debug, Clone)]
pub struct ActivationProperty {
    param: Option<ActivationParam>,
    dispatch: Arc<DispatchTable<ActivationParam>>,
}

impl ActivationProperty {
    pub fn new(dispatch: Arc<DispatchTable<ActivationParam>>) -> Self {
        Self { param: None, dispatch }
    }

    pub fn param(&self) -> Result<&ActivationParam> {
        self.param.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration(format!("{} property used before init", KIND))
        })
    }

    pub fn dispatch_table() -> Result<DispatchTable<ActivationParam>> {
        let mut table = DispatchTable::new(KIND);
        table.insert(DeviceType::Cpu, ActivationOp::boxed)?;
        table.insert(DeviceType::CpuPinned, ActivationOp::boxed)?;
        Ok(table)
    }
}

impl OperatorProperty for ActivationProperty {
    fn kind(&self) -> &str {
        KIND
    }

    fn schema(&self) -> &'static ParamSchema {
        ActivationParam::schema()
    }

    fn init(&mut self, kwargs: &Kwargs) -> Result<()> {
        self.param = Some(ActivationParam::parse(kwargs)?);
        Ok(())
    }

    fn params(&self) -> Result<Kwargs> {
        Ok(self.param()?.to_kwargs())
    }

    // Activation functions preserve input shape
    fn infer_shape(&self, in_shapes: &[Option<Shape>]) -> Result<InferredShapes> {
        self.param()?;

        if in_shapes.len() > 1 {
            return Err(Error::shape(KIND, format!("expected 1 input shape, got {}", in_shapes.len())));
        }

        let data = in_shapes
            .first()
            .cloned()
            .flatten()
            .ok_or_else(|| Error::shape(KIND, "data shape is unknown"))?;

        Ok(InferredShapes {
            arguments: vec![data.clone()],
            outputs: vec![data],
        })
    }

    fn create_operator(&self, ctx: ExecutionContext) -> Result<Box<dyn Operator>> {
        self.dispatch.create(ctx, self.param()?)
    }
}

/// Host implementation of Activation
#[derive(Debug, Clone)]
pub struct ActivationOp {
    param: ActivationParam,
    ctx: ExecutionContext,
}

impl ActivationOp {
    pub fn new(param: ActivationParam, ctx: ExecutionContext) -> Self {
        Self { param, ctx }
    }

    fn boxed(param: ActivationParam, ctx: ExecutionContext) -> Box<dyn Operator> {
        Box::new(Self::new(param, ctx))
    }

    pub fn param(&self) -> &ActivationParam {
        &self.param
    }
}

impl Operator for ActivationOp {
    fn kind(&self) -> &str {
        KIND
    }

    fn context(&self) -> ExecutionContext {
        self.ctx
    }

    fn forward(&self, inputs: &[&Tensor], outputs: &mut [Tensor]) -> Result<()> {
        if inputs.len() != 1 {
            return Err(Error::Execution(format!("{} requires 1 input, got {}", KIND, inputs.len())));
        }

        if outputs.is_empty() {
            return Err(Error::Execution(format!("{} requires 1 output, got 0", KIND)));
        }

        let act_type = self.param.act_type;
        outputs[0] = element_wise_unary_op(inputs[0], move |x| act_type.apply(x));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Register Activation with the devices enabled in `options`
pub fn register(registry: &mut OperatorRegistry, options: &RegistryOptions) -> Result<()> {
    let mut table = ActivationProperty::dispatch_table()?;
    table.retain_devices(options.devices());
    let dispatch = Arc::new(table);

    registry.register(KIND, move || -> Box<dyn OperatorProperty> {
        Box::new(ActivationProperty::new(Arc::clone(&dispatch)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn property(act_type: &str) -> ActivationProperty {
        let mut prop = ActivationProperty::new(Arc::new(ActivationProperty::dispatch_table().unwrap()));
        prop.init(&kwargs([("act_type", act_type)])).unwrap();
        prop
    }

    #[test]
    fn test_variants_match_schema() {
        assert_eq!(ActivationType::VARIANTS, &["relu", "sigmoid", "tanh", "softrelu"]);
        for act in ActivationType::iter() {
            let param = ActivationParam::parse(&kwargs([("act_type", act.to_string())])).unwrap();
            assert_eq!(param.act_type, act);
        }
    }

    #[test]
    fn test_act_type_required() {
        assert!(matches!(ActivationParam::parse(&Kwargs::new()), Err(Error::MissingParameter { .. })));
        assert!(matches!(
            ActivationParam::parse(&kwargs([("act_type", "gelu")])),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_activation_functions() {
        assert_eq!(ActivationType::Relu.apply(-2.0f32), 0.0);
        assert_eq!(ActivationType::Relu.apply(3.0f32), 3.0);
        assert!((ActivationType::Sigmoid.apply(0.0f32) - 0.5).abs() < 1e-6);
        assert!((ActivationType::Tanh.apply(1.0f64) - 1.0f64.tanh()).abs() < 1e-12);
        assert!((ActivationType::SoftRelu.apply(0.0f64) - 2.0f64.ln()).abs() < 1e-12);
        assert_eq!(ActivationType::SoftRelu.apply(100.0f32), 100.0);
    }

    #[test]
    fn test_infer_shape_is_identity() {
        let prop = property("tanh");
        let shapes = prop.infer_shape(&[Some(vec![4, 7, 2])]).unwrap();
        assert_eq!(shapes.outputs, vec![vec![4, 7, 2]]);
        assert_eq!(prop.list_arguments(), vec!["data"]);
        assert!(prop.infer_shape(&[None]).is_err());
    }

    #[test]
    fn test_forward_relu() {
        let op = property("relu").create_operator(ExecutionContext::cpu()).unwrap();
        let x = Tensor::from_vec(&[2, 2], vec![-1.0, 2.0, -3.0, 4.0]).unwrap();
        let mut outputs = vec![Tensor::new(&[2, 2])];

        op.forward(&[&x], &mut outputs).unwrap();
        assert_eq!(outputs[0].data.as_slice().unwrap(), &[0.0, 2.0, 0.0, 4.0]);
        assert!(op.forward(&[], &mut outputs).is_err());
    }

    #[test]
    fn test_gpu_unsupported() {
        let err = property("relu").create_operator(ExecutionContext::gpu(1)).unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedContext { kind: KIND.to_string(), context: "gpu(1)".to_string() }
        );
    }
}
