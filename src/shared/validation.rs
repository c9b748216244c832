//! Validation Utilities

use validator::ValidationErrors;

struct FieldError {
    field: String,
    message: String,
}

fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e.message.clone().map(|m| m.to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

/// Render validation errors as a single human-readable line.
pub fn describe(errors: &ValidationErrors) -> String {
    field_errors(errors)
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into())
}
