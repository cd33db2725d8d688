// ============================================================
// Layer 3 — Colour Palette
// ============================================================
// Class index → RGB by direct indexing into COLOR_SET.
// Index 0 (background) is white.

use crate::domain::error::{Result, SegError};
use crate::domain::sample::LabelMap;

pub const COLOR_SET: [[u8; 3]; 24] = [
    [255, 255, 255], [125, 135, 185], [190, 193, 212], [214, 188, 192],
    [187, 119, 132], [142, 6, 59],    [74, 111, 227],  [133, 149, 225],
    [181, 187, 227], [230, 175, 185], [224, 123, 145], [211, 63, 106],
    [17, 198, 56],   [141, 213, 147], [198, 222, 199], [234, 211, 198],
    [240, 185, 141], [239, 151, 8],   [15, 207, 192],  [156, 222, 214],
    [213, 234, 231], [243, 225, 235], [246, 196, 225], [247, 156, 212],
];

pub fn color_of(class: usize) -> Result<[u8; 3]> {
    COLOR_SET
        .get(class)
        .copied()
        .ok_or(SegError::ClassOutOfRange { index: class, len: COLOR_SET.len() })
}

/// Colourise a label map into a flat (H, W, 3) RGB8 buffer.
/// Fails on the first label with no colour rather than wrapping.
pub fn colorize(labels: &LabelMap) -> Result<Vec<u8>> {
    let mut rgb = Vec::with_capacity(labels.labels.len() * 3);
    for &class in &labels.labels {
        rgb.extend_from_slice(&color_of(class)?);
    }
    Ok(rgb)
}
