use crate::model::ScanResult;
use anyhow::Result;

/// Prints the detected components as a JSON array.
pub fn print_json(result: &ScanResult) -> Result<()> {
    println!("{}", generate_json_string(result)?);
    Ok(())
}

pub(crate) fn generate_json_string(result: &ScanResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(&result.components)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, DetectionMethod, Target};

    #[test]
    fn test_json_is_component_array() {
        let target = Target::parse("https://blog.example.com").unwrap();
        let result = ScanResult::new(
            &target,
            true,
            vec![Component::plugin("akismet", DetectionMethod::DirectoryListing).with_version("4.9")],
        );

        let value: serde_json::Value =
            serde_json::from_str(&generate_json_string(&result).unwrap()).unwrap();

        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["slug"], "akismet");
        assert_eq!(array[0]["type"], "plugin");
        assert_eq!(array[0]["detected_by"], "directory listing");
        assert_eq!(array[0]["version"], "4.9");
    }

    #[test]
    fn test_empty_result_is_empty_array() {
        let target = Target::parse("https://blog.example.com").unwrap();
        let result = ScanResult::new(&target, false, Vec::new());
        assert_eq!(generate_json_string(&result).unwrap(), "[]");
    }
}
