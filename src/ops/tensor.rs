use ndarray::{ArrayD, IxDyn};
use crate::error::{Error, Result};

/// Shape of a tensor
pub type Shape = Vec<usize>;

/// Number of elements described by a shape, `None` on overflow
pub fn shape_size(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

fn checked_size(shape: &[usize]) -> Result<usize> {
    shape_size(shape).ok_or_else(|| {
        Error::Execution(format!("Element count of shape {:?} overflows", shape))
    })
}

/// Dense f32 tensor handed to operator implementations.
///
/// Allocation belongs to the executor; operators only read their inputs and
/// overwrite the output slots they are given.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub shape: Shape,
    pub data: ArrayD<f32>,
}

impl Tensor {
    /// Create a zero-filled tensor
    pub fn new(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Create a tensor from a flat row-major buffer
    pub fn from_vec(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        if values.len() != checked_size(shape)? {
            return Err(Error::Execution(format!(
                "Cannot build tensor of shape {:?} from {} values",
                shape,
                values.len()
            )));
        }

        let data = ArrayD::from_shape_vec(IxDyn(shape), values)
            .map_err(|e| Error::Execution(format!("Tensor construction error: {}", e)))?;

        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Wrap an existing ndarray
    pub fn from_ndarray(data: ArrayD<f32>) -> Self {
        Self {
            shape: data.shape().to_vec(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reshape the tensor
    pub fn reshape(&self, shape: &[usize]) -> Result<Tensor> {
        if checked_size(shape)? != checked_size(&self.shape)? {
            return Err(Error::Execution(format!(
                "Cannot reshape tensor from {:?} to {:?}: total elements don't match",
                self.shape, shape
            )));
        }

        // into_shape needs standard layout
        let contiguous = self.data.as_standard_layout().into_owned();
        let data = contiguous
            .into_shape(IxDyn(shape))
            .map_err(|e| Error::Execution(format!("Reshape error: {}", e)))?;

        Ok(Tensor {
            shape: shape.to_vec(),
            data,
        })
    }
}

/// Apply `op` to every element, in parallel
pub fn element_wise_unary_op<F>(a: &Tensor, op: F) -> Tensor
where
    F: Fn(f32) -> f32 + Sync + Send,
{
    let mut data = a.data.clone();
    data.par_mapv_inplace(op);

    Tensor {
        shape: a.shape.clone(),
        data,
    }
}
