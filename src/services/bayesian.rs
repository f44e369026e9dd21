use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::services::client::{JsonClient, ServiceConfig};
use crate::types::{Service, UpstreamError};

/// Typed input for the sepsis prediction model. Field names and units
/// follow the inference service's model schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SepsisVitals {
    /// Temperature in Celsius.
    pub temp: f64,
    /// Heart rate in beats per minute.
    pub hr: i64,
    /// White blood cell count in K/uL.
    pub wbc: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<i64>,
}

/// Client for the Bayesian inference service (`POST /bayesian/models/{model}`).
pub struct BayesianClient {
    client: JsonClient,
}

impl BayesianClient {
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: JsonClient::new(config, Service::Inference)?,
        })
    }

    pub async fn predict_sepsis(&self, vitals: &SepsisVitals) -> Result<Value, UpstreamError> {
        self.client.post("/bayesian/models/sepsis", vitals).await
    }
}

/// Schemas of the models the inference service hosts, for agent discovery.
pub fn model_schemas() -> Value {
    json!({
        "sepsis": {
            "description": "Sepsis prediction model",
            "required_fields": ["temp", "hr", "wbc"],
            "optional_fields": ["systolic_bp", "diastolic_bp", "respiratory_rate"],
            "field_descriptions": {
                "temp": "Temperature in Celsius",
                "hr": "Heart rate in beats per minute",
                "wbc": "White blood cell count in K/uL",
                "systolic_bp": "Systolic blood pressure in mmHg",
                "diastolic_bp": "Diastolic blood pressure in mmHg",
                "respiratory_rate": "Respiratory rate in breaths per minute"
            }
        }
    })
}
