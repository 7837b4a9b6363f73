//! File input and output for conversion runs.

use std::path::{Path, PathBuf};

use innoconv_core::{ConversionReport, ConvertError, Result};

/// Default output location: a sibling of `input` named
/// `<stem>_<engine>.<ext>`, with the engine in lowercase.
///
/// `f1db.sql` converted to InnoDB becomes `f1db_innodb.sql`.
pub fn output_path_for(input: &Path, engine: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "dump".into(), |s| s.to_string_lossy());
    let mut name = format!("{}_{}", stem, engine.to_lowercase());
    if let Some(extension) = input.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    input.with_file_name(name)
}

/// Reads the whole dump as UTF-8 text.
pub async fn read_dump(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConvertError::io(format!("Failed to read {}", path.display()), e))
}

/// Writes the converted dump.
pub async fn save_dump(output: &str, path: &Path) -> Result<()> {
    tokio::fs::write(path, output)
        .await
        .map_err(|e| ConvertError::io(format!("Failed to write to {}", path.display()), e))
}

/// Writes the report as pretty-printed JSON.
pub async fn save_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let json = report.to_json_pretty()?;
    tokio::fs::write(path, json)
        .await
        .map_err(|e| ConvertError::io(format!("Failed to write report to {}", path.display()), e))
}

/// Refuses to overwrite the input dump.
pub fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    if input == output {
        return Err(ConvertError::configuration(format!(
            "Output path {} is the input file",
            output.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("/data/f1db.sql"), "InnoDB"),
            PathBuf::from("/data/f1db_innodb.sql")
        );
        assert_eq!(
            output_path_for(Path::new("dump"), "Aria"),
            PathBuf::from("dump_aria")
        );
        assert_eq!(
            output_path_for(Path::new("backups/site.v2.sql"), "InnoDB"),
            PathBuf::from("backups/site.v2_innodb.sql")
        );
    }

    #[test]
    fn test_ensure_distinct() {
        assert!(ensure_distinct(Path::new("a.sql"), Path::new("a_innodb.sql")).is_ok());
        assert!(matches!(
            ensure_distinct(Path::new("a.sql"), Path::new("a.sql")),
            Err(ConvertError::Configuration { .. })
        ));
    }
}
