// ============================================================
// Layer 6 — Pretrained Weight Store
// ============================================================
// The pretrained classifier is a safetensors file whose tensors
// are keyed by positional blob index:
//
//   "2.weight"  [64, 3, 3, 3]     "2.bias"  [64]
//   "4.weight"  [64, 64, 3, 3]    "4.bias"  [64]
//   ...
//   "40.weight" [2, 2, 4, 4]      (transposed conv, no bias)
//
// Only f32 and f64 tensors are accepted; f64 is narrowed to f32.
// Keys that do not follow "<index>.weight" / "<index>.bias" are
// ignored with a warning.
//
// Layer maps live next to the store as JSON (see
// domain::layer_map) and are read/written here.

use safetensors::{tensor::TensorView, Dtype, SafeTensors};
use std::{collections::BTreeMap, fs, path::Path};

use crate::domain::error::{Result, SegError};
use crate::domain::layer_map::LayerMap;
use crate::domain::traits::WeightSource;
use crate::domain::weights::{ParamBlob, RawTensor};

#[derive(Debug, Clone, Default)]
pub struct SafetensorsStore {
    blobs: BTreeMap<usize, ParamBlob>,
}

impl SafetensorsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a store from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path  = path.as_ref();
        let bytes = fs::read(path).map_err(|e| SegError::data_io(path, e))?;
        let store = Self::from_bytes(&bytes).map_err(|e| match e {
            SegError::Config(reason) => SegError::data_io(path, reason),
            other => other,
        })?;
        tracing::info!(
            "Loaded {} pretrained blobs from '{}'",
            store.blobs.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let tensors = SafeTensors::deserialize(bytes)
            .map_err(|e| SegError::Config(format!("invalid safetensors data: {e}")))?;

        let mut weights: BTreeMap<usize, RawTensor> = BTreeMap::new();
        let mut biases:  BTreeMap<usize, RawTensor> = BTreeMap::new();

        for (name, view) in tensors.tensors() {
            let Some((index, kind)) = parse_key(&name) else {
                tracing::warn!("Ignoring tensor '{}' in weight store", name);
                continue;
            };
            let raw = to_raw(&name, &view)?;
            match kind {
                BlobPart::Weight => weights.insert(index, raw),
                BlobPart::Bias   => biases.insert(index, raw),
            };
        }

        let mut blobs = BTreeMap::new();
        for (index, weight) in weights {
            let blob = match biases.remove(&index) {
                Some(bias) => ParamBlob::with_bias(weight, bias),
                None       => ParamBlob::weight_only(weight),
            };
            blobs.insert(index, blob);
        }
        if let Some(orphan) = biases.keys().next() {
            return Err(SegError::Config(format!(
                "blob {orphan} has a bias but no weight"
            )));
        }

        Ok(Self { blobs })
    }

    pub fn insert(&mut self, index: usize, blob: ParamBlob) {
        self.blobs.insert(index, blob);
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut entries: Vec<(String, Vec<usize>, Vec<u8>)> = Vec::new();
        for (index, blob) in &self.blobs {
            entries.push((format!("{index}.weight"), blob.weight.shape.clone(), le_bytes(&blob.weight)));
            if let Some(bias) = &blob.bias {
                entries.push((format!("{index}.bias"), bias.shape.clone(), le_bytes(bias)));
            }
        }

        let views = entries
            .iter()
            .map(|(name, shape, data)| {
                TensorView::new(Dtype::F32, shape.clone(), data)
                    .map(|view| (name.clone(), view))
                    .map_err(|e| SegError::Config(format!("tensor '{name}': {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        safetensors::serialize(views.iter().map(|(name, view)| (name.clone(), view)), &None)
            .map_err(|e| SegError::Config(format!("cannot serialise weight store: {e}")))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()?).map_err(|e| SegError::data_io(path, e))
    }
}

impl WeightSource for SafetensorsStore {
    fn blob(&self, index: usize) -> Option<&ParamBlob> {
        self.blobs.get(&index)
    }

    fn indices(&self) -> Vec<usize> {
        self.blobs.keys().copied().collect()
    }
}

// ─── Layer map files ──────────────────────────────────────────────────────────

pub fn load_layer_map(path: impl AsRef<Path>) -> Result<LayerMap> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|e| SegError::data_io(path, e))?;
    serde_json::from_str(&json)
        .map_err(|e| SegError::Config(format!("layer map '{}': {e}", path.display())))
}

pub fn save_layer_map(map: &LayerMap, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(map)
        .map_err(|e| SegError::Config(format!("cannot serialise layer map: {e}")))?;
    fs::write(path, json).map_err(|e| SegError::data_io(path, e))
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

enum BlobPart {
    Weight,
    Bias,
}

fn parse_key(name: &str) -> Option<(usize, BlobPart)> {
    let (index, part) = name.split_once('.')?;
    let index = index.parse().ok()?;
    match part {
        "weight" => Some((index, BlobPart::Weight)),
        "bias"   => Some((index, BlobPart::Bias)),
        _        => None,
    }
}

fn to_raw(name: &str, view: &TensorView<'_>) -> Result<RawTensor> {
    let data   = view.data();
    let values = match view.dtype() {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|b| {
                f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32
            })
            .collect(),
        other => {
            return Err(SegError::Config(format!(
                "tensor '{name}' has unsupported dtype {other:?}"
            )))
        }
    };
    Ok(RawTensor::new(view.shape().to_vec(), values))
}

fn le_bytes(t: &RawTensor) -> Vec<u8> {
    t.values.iter().flat_map(|v| v.to_le_bytes()).collect()
}
