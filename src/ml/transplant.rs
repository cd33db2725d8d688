// ============================================================
// Layer 5 — Weight Transplant
// ============================================================
// Seeds a freshly built Fcn8s from a pretrained classifier.
//
//   LayerMap entry  { layer: "conv1_1", index: 2, bias: true }
//        │
//        ▼
//   store.blob(2) ── weight [64,3,3,3] ──► conv1_1.weight
//                └─ bias   [64]       ──► conv1_1.bias
//
// The whole map is validated against the store and the network
// before anything is copied. Each copy is an identity copy:
// the stored shape must equal the parameter's shape exactly.

use burn::prelude::*;
use std::path::Path;

use crate::domain::error::{Result, SegError};
use crate::domain::layer_map::LayerMap;
use crate::domain::traits::WeightSource;
use crate::domain::weights::RawTensor;
use crate::infra::weight_store::{load_layer_map, SafetensorsStore};
use crate::ml::model::{Fcn8s, LAYER_NAMES};

pub fn transplant<B: Backend, W: WeightSource + ?Sized>(
    mut model: Fcn8s<B>,
    store:     &W,
    map:       &LayerMap,
    device:    &B::Device,
) -> Result<Fcn8s<B>> {
    map.validate(&LAYER_NAMES, store)?;

    for entry in &map.entries {
        // validate() guarantees both lookups
        let blob = store.blob(entry.index).ok_or_else(|| {
            SegError::Config(format!("blob {} vanished from the store", entry.index))
        })?;
        let mut layer = model.layer_mut(&entry.layer).ok_or_else(|| {
            SegError::Config(format!("layer '{}' does not exist in the network", entry.layer))
        })?;

        let weight_dims = layer.weight_dims();
        check_shape(&format!("{}.weight", entry.layer), &weight_dims, &blob.weight)?;
        layer.set_weight(Tensor::from_data(
            TensorData::new(blob.weight.values.clone(), weight_dims),
            device,
        ));

        if entry.bias {
            let bias = blob.bias.as_ref().ok_or_else(|| {
                SegError::Config(format!(
                    "layer '{}' expects a bias in blob {}", entry.layer, entry.index
                ))
            })?;
            let bias_dims = layer.bias_dims().ok_or_else(|| {
                SegError::Config(format!("layer '{}' has no bias parameter", entry.layer))
            })?;
            check_shape(&format!("{}.bias", entry.layer), &bias_dims, bias)?;
            layer.set_bias(Tensor::from_data(
                TensorData::new(bias.values.clone(), bias_dims),
                device,
            ));
        }

        tracing::debug!(
            "Transplanted blob {} into '{}' {:?}{}",
            entry.index,
            entry.layer,
            weight_dims,
            if entry.bias { " + bias" } else { "" }
        );
    }

    tracing::info!(
        "Initialised {} layers from pretrained '{}'",
        map.entries.len(),
        map.source
    );
    Ok(model)
}

/// Open the safetensors store at `weights_path`, pick the layer map
/// (a JSON file when given, the built-in table otherwise) and transplant.
pub fn initialize_from_pretrained<B: Backend>(
    model:        Fcn8s<B>,
    weights_path: &Path,
    layer_map:    Option<&Path>,
    device:       &B::Device,
) -> Result<Fcn8s<B>> {
    let map = match layer_map {
        Some(path) => load_layer_map(path)?,
        None       => LayerMap::default(),
    };
    let store = SafetensorsStore::open(weights_path)?;
    transplant(model, &store, &map, device)
}

fn check_shape(what: &str, expected: &[usize], found: &RawTensor) -> Result<()> {
    let declared: usize = found.shape.iter().product();
    if found.shape.as_slice() != expected || declared != found.numel() {
        return Err(SegError::shape(what, expected.to_vec(), found.shape.clone()));
    }
    Ok(())
}

/// A store whose blobs fit `model` under `map`, filled with distinct values.
#[cfg(test)]
pub(crate) fn matching_store<B: Backend>(model: &mut Fcn8s<B>, map: &LayerMap) -> SafetensorsStore {
    use crate::domain::weights::ParamBlob;

    let mut store = SafetensorsStore::new();
    for (k, entry) in map.entries.iter().enumerate() {
        let Some(layer) = model.layer_mut(&entry.layer) else { continue };
        let dims = layer.weight_dims();
        let n: usize = dims.iter().product();
        let weight = RawTensor::new(
            dims,
            (0..n).map(|i| k as f32 + i as f32 * 0.001).collect(),
        );
        let blob = match (entry.bias, layer.bias_dims()) {
            (true, Some([c])) => ParamBlob::with_bias(
                weight,
                RawTensor::new([c], (0..c).map(|i| -(k as f32) - i as f32).collect()),
            ),
            _ => ParamBlob::weight_only(weight),
        };
        store.insert(entry.index, blob);
    }
    store
}
