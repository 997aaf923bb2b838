//! Validation Utilities

use validator::ValidationErrors;

use super::error::{AppError, FieldError};

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();

    // HashMap order is not stable
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    AppError::from_field_errors(field_errors)
}

/// Validate a request body, mapping failures to [`AppError::Validation`].
pub fn validate_body<T: validator::Validate>(body: &T) -> Result<(), AppError> {
    body.validate().map_err(validation_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "too short"))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn collects_field_errors_sorted() {
        let sample = Sample {
            name: "a".into(),
            email: "nope".into(),
        };
        match validate_body(&sample) {
            Err(AppError::Validation { errors, .. }) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "email");
                assert_eq!(errors[0].message, "email");
                assert_eq!(errors[1].message, "too short");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
