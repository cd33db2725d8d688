// ============================================================
// Layer 3 — Pretrained Parameter Blobs
// ============================================================
// A pretrained classification network is an ordered list of
// parameter blobs. Each blob is a weight tensor with an optional
// bias. Tensors use Burn's layouts:
//
//   Conv2d          weight [out, in, kh, kw]   bias [out]
//   ConvTranspose2d weight [in, out, kh, kw]   (no bias)

/// A dense f32 tensor detached from any backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTensor {
    pub shape:  Vec<usize>,
    pub values: Vec<f32>,
}

impl RawTensor {
    pub fn new(shape: impl Into<Vec<usize>>, values: Vec<f32>) -> Self {
        let shape = shape.into();
        debug_assert_eq!(shape.iter().product::<usize>(), values.len());
        Self { shape, values }
    }

    pub fn numel(&self) -> usize {
        self.values.len()
    }
}

/// One positional entry of the pretrained store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBlob {
    pub weight: RawTensor,
    pub bias:   Option<RawTensor>,
}

impl ParamBlob {
    pub fn weight_only(weight: RawTensor) -> Self {
        Self { weight, bias: None }
    }

    pub fn with_bias(weight: RawTensor, bias: RawTensor) -> Self {
        Self { weight, bias: Some(bias) }
    }
}
