// ============================================================
// Layer 4 — Mask Reader
// ============================================================
// Ground-truth masks hold one class index per pixel
// (0 = background, 1 = portrait, ...). Two containers are read:
//
//   <stem>_mask.mat  — MATLAB v5 file, 2-D numeric variable `mask`
//   <stem>_mask.png  — single-channel 8- or 16-bit label image
//
// Raw stored values are the labels; nothing is rescaled. Colour
// and paletted images are rejected instead of being reduced to luma.

use std::{fs::File, io::BufReader, path::Path};

use image::DynamicImage;
use matfile::{MatFile, NumericData};

use crate::domain::error::{Result, SegError};
use crate::domain::sample::LabelMap;

/// Name of the variable holding the labels inside a .mat mask.
pub const MAT_VARIABLE: &str = "mask";

pub fn load_mask(path: impl AsRef<Path>) -> Result<LabelMap> {
    let path = path.as_ref();
    let is_mat = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mat"));

    if is_mat {
        load_mat_mask(path)
    } else {
        load_image_mask(path)
    }
}

fn load_image_mask(path: &Path) -> Result<LabelMap> {
    let img = image::open(path).map_err(|e| SegError::data_io(path, e))?;

    let ((width, height), labels): ((u32, u32), Vec<usize>) = match img {
        DynamicImage::ImageLuma8(gray) => {
            (gray.dimensions(), gray.into_raw().into_iter().map(usize::from).collect())
        }
        DynamicImage::ImageLuma16(gray) => {
            (gray.dimensions(), gray.into_raw().into_iter().map(usize::from).collect())
        }
        other => {
            return Err(SegError::data_io(
                path,
                format!("mask must be a single-channel label image, found {:?}", other.color()),
            ))
        }
    };
    Ok(LabelMap::new(height as usize, width as usize, labels))
}

fn load_mat_mask(path: &Path) -> Result<LabelMap> {
    let file = File::open(path).map_err(|e| SegError::data_io(path, e))?;
    let mat  = MatFile::parse(BufReader::new(file)).map_err(|e| SegError::data_io(path, e))?;

    let array = mat.find_by_name(MAT_VARIABLE).ok_or_else(|| {
        SegError::data_io(path, format!("no variable named '{MAT_VARIABLE}'"))
    })?;

    let &[rows, cols] = array.size().as_slice() else {
        return Err(SegError::data_io(
            path,
            format!("'{MAT_VARIABLE}' must be 2-D, found size {:?}", array.size()),
        ));
    };

    let values = real_values(array.data());
    if values.len() != rows * cols {
        return Err(SegError::data_io(
            path,
            format!("'{MAT_VARIABLE}' holds {} values for size {rows}x{cols}", values.len()),
        ));
    }

    // MATLAB stores column-major
    let mut labels = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let v = values[c * rows + r];
            if !(v.is_finite() && v >= 0.0 && v.fract() == 0.0) {
                return Err(SegError::data_io(
                    path,
                    format!("'{MAT_VARIABLE}' value {v} at ({r}, {c}) is not a class index"),
                ));
            }
            labels.push(v as usize);
        }
    }
    Ok(LabelMap::new(rows, cols, labels))
}

/// The real part of any numeric class, widened to f64.
fn real_values(data: &NumericData) -> Vec<f64> {
    match data {
        NumericData::Int8   { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::UInt8  { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int16  { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::UInt16 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int32  { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::UInt32 { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Int64  { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::Single { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        NumericData::Double { real, .. } => real.clone(),
    }
}

/// Reject labels the network cannot predict.
pub fn check_labels(mask: &LabelMap, num_classes: usize, path: &Path) -> Result<()> {
    match mask.max_label() {
        Some(max) if max >= num_classes => Err(SegError::data_io(
            path,
            format!("mask label {max} is not below the class count {num_classes}"),
        )),
        _ => Ok(()),
    }
}
