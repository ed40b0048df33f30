//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

/// Print a command report
///
/// JSON output wraps the report as `{"success": true, "result": ...}`;
/// human output lists its top-level fields under `title`.
pub fn print_report<T: Serialize>(title: &str, report: &T, json: bool) -> Result<(), CliError> {
    let value = serde_json::to_value(report)?;
    if json {
        let output = json!({
            "success": true,
            "result": value
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", title.bold());
    if let Value::Object(fields) = &value {
        let width = fields.keys().map(String::len).max().unwrap_or(0);
        for (name, field) in fields {
            println!("  {:<width$}  {}", name.dimmed(), format_value(field));
        }
    }
    Ok(())
}

/// Print a warning; JSON mode sends it to stderr so stdout stays parseable
pub fn print_warning(message: &str, json: bool) {
    if json {
        eprintln!("{}", json!({ "warning": message }));
    } else {
        eprintln!("{} {}", "⚠".yellow(), message.yellow());
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".dimmed().to_string(),
        other => other.to_string(),
    }
}

fn error_type_name(error: &Error) -> String {
    match error.downcast_ref::<CliError>() {
        Some(CliError::NotFound(_)) => "not_found",
        Some(CliError::AlreadyExists(_)) => "already_exists",
        Some(CliError::InvalidKey(_)) => "invalid_key",
        Some(CliError::InvalidContainer(_)) => "invalid_container",
        Some(CliError::ValidationError(_)) => "validation",
        Some(CliError::Container(_)) => "container",
        Some(CliError::IoError(_)) => "io",
        Some(CliError::JsonError(_)) => "json",
        None => "generic",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_type_names() {
        let err = Error::new(CliError::InvalidKey("short".into()));
        assert_eq!(error_type_name(&err), "invalid_key");

        let generic = anyhow::anyhow!("boom");
        assert_eq!(error_type_name(&generic), "generic");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!("cbc-size-prefixed")), "cbc-size-prefixed");
        assert_eq!(format_value(&json!(52)), "52");
        assert_eq!(format_value(&json!(true)), "true");
    }
}
