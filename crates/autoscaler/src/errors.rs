use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutoscaleError {
    #[error("usage probe for {service} failed: {message}")]
    Probe { service: String, message: String },

    #[error("scale command for {service} failed: {message}")]
    Scale { service: String, message: String },
}

impl AutoscaleError {
    pub fn probe(service: &str, message: impl Into<String>) -> Self {
        AutoscaleError::Probe {
            service: service.to_string(),
            message: message.into(),
        }
    }

    pub fn scale(service: &str, message: impl Into<String>) -> Self {
        AutoscaleError::Scale {
            service: service.to_string(),
            message: message.into(),
        }
    }
}
