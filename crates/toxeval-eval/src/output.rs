//! Results record and submission table

use crate::evaluator::MetricsResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use toxeval_core::{Error, Result, CATEGORIES};

/// Where a run's outputs land
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub results: PathBuf,
    pub submission: PathBuf,
}

/// Output files next to the checkpoint, replacing its extension:
/// `runs/model.ckpt` gives `runs/model.results.json` and `runs/model.submission.csv`
pub fn output_paths(checkpoint: &Path) -> OutputPaths {
    OutputPaths {
        results: checkpoint.with_extension("results.json"),
        submission: checkpoint.with_extension("submission.csv"),
    }
}

/// Write the JSON results record
pub fn write_results(result: &MetricsResult, path: &Path) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| Error::output(format!("Failed to create {}: {}", path.display(), e)))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, result)?;
    writer.flush()?;
    tracing::info!("Wrote results to {}", path.display());
    Ok(())
}

/// Write the submission table: `id` then one probability column per category
pub fn write_submission(result: &MetricsResult, path: &Path) -> Result<()> {
    if result.ids.len() != result.scores.len() {
        return Err(Error::output(format!(
            "{} ids but {} score rows",
            result.ids.len(),
            result.scores.len()
        )));
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(std::iter::once("id").chain(CATEGORIES))?;

    for (id, row) in result.ids.iter().zip(&result.scores) {
        if row.len() != CATEGORIES.len() {
            return Err(Error::output(format!(
                "Item '{}' has {} scores, expected {}",
                id,
                row.len(),
                CATEGORIES.len()
            )));
        }

        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(id.clone());
        record.extend(row.iter().map(|s| s.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    tracing::info!("Wrote submission to {}", path.display());
    Ok(())
}

/// Write both outputs for `checkpoint`
pub fn write_outputs(result: &MetricsResult, checkpoint: &Path) -> Result<OutputPaths> {
    let paths = output_paths(checkpoint);
    write_results(result, &paths.results)?;
    write_submission(result, &paths.submission)?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rows: Vec<Vec<f32>>) -> MetricsResult {
        let ids = (0..rows.len()).map(|i| format!("id{}", i)).collect();
        let targets = rows.iter().map(|r| vec![0.0; r.len()]).collect();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        MetricsResult::from_predictions(ids, rows, targets, width, 0)
    }

    #[test]
    fn test_output_paths() {
        let paths = output_paths(Path::new("runs/model.ckpt"));
        assert_eq!(paths.results, PathBuf::from("runs/model.results.json"));
        assert_eq!(paths.submission, PathBuf::from("runs/model.submission.csv"));

        let paths = output_paths(Path::new("runs/epoch=3-step=100.ckpt"));
        assert_eq!(paths.results, PathBuf::from("runs/epoch=3-step=100.results.json"));
    }

    #[test]
    fn test_write_submission() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.csv");
        write_submission(&result(vec![vec![0.5; 6], vec![0.25; 6]]), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "id,toxic,severe_toxic,obscene,threat,insult,identity_hate");
        assert_eq!(lines[1], "id0,0.5,0.5,0.5,0.5,0.5,0.5");
        assert!(lines[2].starts_with("id1,0.25,"));
    }

    #[test]
    fn test_submission_width_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_submission(&result(vec![vec![0.5; 3]]), &dir.path().join("sub.csv"));
        assert!(matches!(err, Err(Error::Output(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_write_results_reports_full_device() {
        let outcome = write_results(&result(vec![vec![0.5; 6], vec![0.25; 6]]), Path::new("/dev/full"));
        assert!(outcome.is_err());
    }

    #[test]
    fn test_write_outputs_next_to_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("model.ckpt");

        let paths = write_outputs(&result(vec![vec![0.1; 6]]), &checkpoint).unwrap();
        assert!(paths.results.exists());
        assert!(paths.submission.exists());
        assert_eq!(paths.results.parent(), Some(dir.path()));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.results).unwrap()).unwrap();
        for key in ["scores", "targets", "auc_scores", "mean_auc", "ids"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
