// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one row per reporting interval to metrics.csv in the
// checkpoint directory. Restored runs keep appending to the same
// file, so the CSV covers the whole training history.
//
// Example:
//   step,loss
//   10,0.693147
//   20,0.681220

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::Result;

/// One reported training step
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Global step counter after the update
    pub step: u64,

    /// Softmax cross-entropy of the minibatch, averaged over pixels
    pub loss: f64,
}

impl StepMetrics {
    pub fn new(step: u64, loss: f64) -> Self {
        Self { step, loss }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a new MetricsLogger.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "step,loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(f, "{},{:.6}", m.step, m.loss)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let tmp = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&StepMetrics::new(10, 0.5)).unwrap();

        // A second logger on the same directory must not rewrite the header
        let again = MetricsLogger::new(tmp.path()).unwrap();
        again.log(&StepMetrics::new(20, 0.25)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(csv, "step,loss\n10,0.500000\n20,0.250000\n");
    }
}
