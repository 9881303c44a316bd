use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Pretty-print `value` as JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory '{}'", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("writing '{}'", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing '{}'", path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening '{}'", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("parsing '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sira_algo::SampleDraws;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reads_draws() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("sample_draws.json");
        let draws = SampleDraws::generate(4, 3, 11);
        write_json(&path, &draws).unwrap();
        let parsed: SampleDraws = read_json(&path).unwrap();
        assert_eq!(parsed.num_samples, 4);
        assert_eq!(parsed.seed, 11);
        for (a, b) in parsed.values.iter().zip(&draws.values) {
            assert!((a - b).abs() < 1e-15);
        }
    }

    #[test]
    fn large_tables_are_written_completely() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("states.json");
        // well past the writer's buffer size
        let table: Vec<Vec<usize>> = (0..2_000).map(|t| vec![t % 5; 40]).collect();
        write_json(&path, &table).unwrap();
        let parsed: Vec<Vec<usize>> = read_json(&path).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn unwritable_target_reports_path() {
        let dir = tempdir().unwrap();
        // a directory cannot be opened as a file
        let err = write_json(dir.path(), &vec![1, 2, 3]).unwrap_err();
        assert!(format!("{err:#}").contains(&dir.path().display().to_string()));
    }
}
