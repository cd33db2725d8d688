// ============================================================
// Layer 3 — Layer Mapping Table
// ============================================================
// Which pretrained blob seeds which segmentation layer.
//
// The table encodes the exact blob ordering of one external
// model file, so it carries a `source` name and a `version`
// and is validated against both the store and the network
// before a single parameter is copied.
//
// Serialised form (see infra::weight_store::load_layer_map):
//   {
//     "version": 1,
//     "source": "fcn8s-heavy-pascal",
//     "entries": [ { "layer": "conv1_1", "index": 2, "bias": true }, ... ]
//   }

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::error::{Result, SegError};
use crate::domain::traits::WeightSource;

pub const LAYER_MAP_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Target layer name in the segmentation network
    pub layer: String,
    /// Positional index of the source blob in the pretrained store
    pub index: usize,
    /// Copy the blob's bias as well as its weight
    pub bias:  bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMap {
    pub version: u32,
    pub source:  String,
    pub entries: Vec<LayerEntry>,
}

impl LayerMap {
    /// The table for the FCN8s-heavy PASCAL VOC model file.
    pub fn fcn8s_heavy_pascal() -> Self {
        const TABLE: [(&str, usize, bool); 21] = [
            ("conv1_1", 2, true),
            ("conv1_2", 4, true),
            ("conv2_1", 7, true),
            ("conv2_2", 9, true),
            ("conv3_1", 12, true),
            ("conv3_2", 14, true),
            ("conv3_3", 16, true),
            ("conv4_1", 20, true),
            ("conv4_2", 22, true),
            ("conv4_3", 24, true),
            ("conv5_1", 28, true),
            ("conv5_2", 30, true),
            ("conv5_3", 32, true),
            ("fc6", 35, true),
            ("fc7", 37, true),
            ("score_fr", 39, true),
            ("upscore2", 40, false),
            ("score_pool4", 42, true),
            ("upscore_pool4", 45, false),
            ("score_pool3", 47, true),
            ("upscore8", 50, false),
        ];

        Self {
            version: LAYER_MAP_VERSION,
            source:  "fcn8s-heavy-pascal".to_string(),
            entries: TABLE
                .iter()
                .map(|&(layer, index, bias)| LayerEntry {
                    layer: layer.to_string(),
                    index,
                    bias,
                })
                .collect(),
        }
    }

    /// Startup check. Fails on the first problem found:
    ///   - unsupported version
    ///   - a layer named twice
    ///   - a layer the network does not have
    ///   - an index absent from the store
    ///   - a bias-flagged entry whose blob has no bias
    pub fn validate<W: WeightSource + ?Sized>(
        &self,
        known_layers: &[&str],
        store:        &W,
    ) -> Result<()> {
        if self.version != LAYER_MAP_VERSION {
            return Err(SegError::Config(format!(
                "layer map '{}' has version {}, expected {}",
                self.source, self.version, LAYER_MAP_VERSION
            )));
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(entry.layer.as_str()) {
                return Err(SegError::Config(format!(
                    "layer '{}' is mapped more than once", entry.layer
                )));
            }
            if !known_layers.contains(&entry.layer.as_str()) {
                return Err(SegError::Config(format!(
                    "layer '{}' does not exist in the network", entry.layer
                )));
            }
            let blob = store.blob(entry.index).ok_or_else(|| {
                SegError::Config(format!(
                    "layer '{}' references blob {} which is not in the weight store",
                    entry.layer, entry.index
                ))
            })?;
            if entry.bias && blob.bias.is_none() {
                return Err(SegError::Config(format!(
                    "layer '{}' expects a bias in blob {} but none is stored",
                    entry.layer, entry.index
                )));
            }
        }
        Ok(())
    }
}

impl Default for LayerMap {
    fn default() -> Self {
        Self::fcn8s_heavy_pascal()
    }
}
