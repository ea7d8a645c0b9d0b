use anyhow::Result;
use volley_lib::ResponseResult;

/// Renders the results of a batch
pub(crate) trait OutputFormatter {
    /// Format all results, in the order they completed
    fn format(&self, results: &[ResponseResult]) -> Result<String>;
}

/// A pretty-printed JSON array, one element per request
pub(crate) struct Json;

impl OutputFormatter for Json {
    fn format(&self, results: &[ResponseResult]) -> Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }
}

/// One compact JSON document per line
pub(crate) struct JsonLines;

impl OutputFormatter for JsonLines {
    fn format(&self, results: &[ResponseResult]) -> Result<String> {
        let mut output = String::new();
        for result in results {
            output.push_str(&serde_json::to_string(result)?);
            output.push('\n');
        }
        Ok(output)
    }
}

/// Every response body in a single array, pages spliced in
pub(crate) struct Flat;

impl OutputFormatter for Flat {
    fn format(&self, results: &[ResponseResult]) -> Result<String> {
        let bodies: Vec<_> = results
            .iter()
            .cloned()
            .flat_map(ResponseResult::into_values)
            .collect();
        Ok(serde_json::to_string_pretty(&bodies)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn results() -> Vec<ResponseResult> {
        vec![
            ResponseResult::Single(json!({"id": 1})),
            ResponseResult::Pages(vec![json!([1, 2]), json!([3])]),
        ]
    }

    #[test]
    fn test_json() {
        let output = Json.format(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!([{"id": 1}, [[1, 2], [3]]]));
    }

    #[test]
    fn test_json_lines() {
        assert_eq!(
            JsonLines.format(&results()).unwrap(),
            "{\"id\":1}\n[[1,2],[3]]\n"
        );
    }

    #[test]
    fn test_flat() {
        let output = Flat.format(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value, json!([{"id": 1}, [1, 2], [3]]));
    }

    #[test]
    fn test_empty() {
        assert_eq!(Json.format(&[]).unwrap(), "[]");
        assert_eq!(JsonLines.format(&[]).unwrap(), "");
    }
}
