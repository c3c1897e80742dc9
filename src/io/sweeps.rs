//! Read/write sweep JSON files.
//!
//! Sweep JSON is the hand-off format with the acquisition/session layer:
//! - optional sample interval `dt`
//! - per sweep: `current`, `voltage`, `spike_indices`
//!
//! The schema is defined by `domain::SweepFile`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::domain::SweepFile;
use crate::error::AppError;

/// Read a sweep JSON file.
pub fn read_sweep_file(path: &Path) -> Result<SweepFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open sweep JSON '{}': {e}", path.display())))?;
    let sweeps: SweepFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::config(format!("Invalid sweep JSON '{}': {e}", path.display())))?;
    Ok(sweeps)
}

/// Write a sweep JSON file.
pub fn write_sweep_file(path: &Path, sweeps: &SweepFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create sweep JSON '{}': {e}", path.display())))?;
    serde_json::to_writer(BufWriter::new(file), sweeps)
        .map_err(|e| AppError::config(format!("Failed to write sweep JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sweep;

    #[test]
    fn spike_indices_default_to_empty() {
        let json = r#"{"sweeps":[{"current":[0.0,1e-12],"voltage":[-0.07,-0.069]}]}"#;
        let file: SweepFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.dt, None);
        assert!(file.sweeps[0].spike_indices.is_empty());
    }

    #[test]
    fn written_file_reads_back() {
        let path = std::env::temp_dir().join(format!("asglm_sweeps_{}.json", std::process::id()));
        let original = SweepFile {
            dt: Some(5e-5),
            sweeps: vec![Sweep {
                current: vec![1e-10, 2e-10, 3e-10],
                voltage: vec![-0.07, -0.06, -0.05],
                spike_indices: vec![1],
            }],
        };
        write_sweep_file(&path, &original).unwrap();
        let back = read_sweep_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.dt, original.dt);
        assert_eq!(back.sweeps, original.sweeps);
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = read_sweep_file(Path::new("/nonexistent/asglm/sweeps.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
