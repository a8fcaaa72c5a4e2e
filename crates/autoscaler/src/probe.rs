use crate::{config::ServicePolicy, errors::AutoscaleError};
use async_trait::async_trait;
use shared::utils::ResourceUsage;
use std::{sync::Arc, time::Duration};

pub type DynUsageProbe = Arc<dyn UsageProbe + Send + Sync>;

#[async_trait]
pub trait UsageProbe {
    async fn sample(&self, policy: &ServicePolicy) -> Result<ResourceUsage, AutoscaleError>;
}

/// Reads the JSON load sample a service publishes on its metrics port.
#[derive(Debug, Clone)]
pub struct HttpUsageProbe {
    client: reqwest::Client,
}

impl HttpUsageProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UsageProbe for HttpUsageProbe {
    async fn sample(&self, policy: &ServicePolicy) -> Result<ResourceUsage, AutoscaleError> {
        let response = self
            .client
            .get(&policy.usage_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AutoscaleError::probe(&policy.name, e.to_string()))?;

        response
            .json::<ResourceUsage>()
            .await
            .map_err(|e| AutoscaleError::probe(&policy.name, format!("invalid usage body: {e}")))
    }
}
