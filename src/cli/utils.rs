use serde_json::{json, Value};
use std::io::Read;

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an API payload: pretty JSON in both formats, with a status line in text mode
pub fn output_value(output_format: OutputFormat, value: &Value) -> anyhow::Result<()> {
    if output_format == OutputFormat::Text {
        if let Some(false) = value.get("success").and_then(Value::as_bool) {
            let errors = value
                .get("errors")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            eprintln!("Error: {}", errors);
        }
    }
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Read a JSON argument from `--data` or, when absent, from stdin
pub fn read_json_input(data: Option<String>) -> anyhow::Result<Value> {
    let raw = match data {
        Some(raw) => raw,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("invalid JSON input: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inline_json() {
        let value = read_json_input(Some(r#"{"id": 3}"#.to_string())).unwrap();
        assert_eq!(value, json!({ "id": 3 }));
    }

    #[test]
    fn blank_input_is_empty_object() {
        assert_eq!(read_json_input(Some("  ".to_string())).unwrap(), json!({}));
    }

    #[test]
    fn reports_bad_json() {
        assert!(read_json_input(Some("{".to_string())).is_err());
    }
}
