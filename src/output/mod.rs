//! Presentation and persistence of scan results.

mod cli;
mod json;

pub use cli::print_cli_table;
pub use json::print_json;

use crate::model::ScanResult;
use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON array of components
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_result(result: &ScanResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(result),
        OutputFormat::Json => print_json(result),
    }
}

/// Format result to string for file output
pub fn format_result_to_string(result: &ScanResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::generate_json_string(result),
        OutputFormat::Table => Ok(cli::render_table(result)),
    }
}

/// File name a result is stored under, e.g.
/// `wpscan_blog-example-com_20261018_091244.json`.
pub fn result_file_name(result: &ScanResult, label: &str) -> String {
    format!(
        "wpscan_{}_{}.json",
        label,
        result.scan_time.format("%Y%m%d_%H%M%S")
    )
}

/// Writes the component array into `dir` and returns the file path.
///
/// # Errors
///
/// Returns an error if `dir` cannot be created or the file cannot be
/// written.
pub fn save_result(result: &ScanResult, label: &str, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(result_file_name(result, label));
    fs::write(&path, json::generate_json_string(result)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, DetectionMethod, Target};
    use std::str::FromStr;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::from_str("table").unwrap(), OutputFormat::Table);
        assert!(OutputFormat::from_str("sarif").is_err());
    }

    #[test]
    fn test_save_result() {
        let dir = tempfile::tempdir().unwrap();
        let target = Target::parse("https://blog.example.com/news").unwrap();
        let result = ScanResult::new(
            &target,
            true,
            vec![Component::theme("astra", DetectionMethod::ResourceUrl)],
        );

        let path = save_result(&result, &target.file_label(), &dir.path().join("results")).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("wpscan_blog-example-com_news_"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "wpscan_blog-example-com_news_".len() + 15 + 5);

        let saved: Vec<Component> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, result.components);
    }
}
