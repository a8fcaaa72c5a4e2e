use crate::errors::repository::RepositoryError;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Repository error: {0}")]
    Repo(#[from] RepositoryError),

    #[error("Validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Call to {0} timed out")]
    Timeout(String),

    #[error("Circuit open for {0}")]
    CircuitOpen(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Call to {0} was cancelled")]
    Cancelled(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found() -> Self {
        ServiceError::Repo(RepositoryError::NotFound)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(vec![message.into()])
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::Repo(RepositoryError::NotFound))
    }

    /// Transport or availability failures that a retry may fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, ServiceError::Timeout(_) | ServiceError::Unavailable(_))
    }

    /// Whether the failure says something about the health of the callee.
    /// Semantic errors mean the downstream answered correctly.
    pub fn is_downstream_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout(_) | ServiceError::Unavailable(_) | ServiceError::Internal(_)
        )
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut messages = Vec::new();
        collect_validation_messages("", &errors, &mut messages);

        if messages.is_empty() {
            messages.push("invalid request".to_string());
        }

        messages.sort();
        ServiceError::Validation(messages)
    }
}

fn collect_validation_messages(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    out.push(format!("{path}: {message}"));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_validation_messages(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_messages(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}
