use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::services::client::{JsonClient, ServiceConfig};
use crate::types::{Service, UpstreamError};

/// Imaging view / angle accepted by the vision service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageView {
    #[serde(rename = "AP")]
    Ap,
    #[serde(rename = "PA")]
    Pa,
    Lateral,
    DermCloseUp,
    Other,
}

impl ImageView {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AP" => Some(ImageView::Ap),
            "PA" => Some(ImageView::Pa),
            "Lateral" => Some(ImageView::Lateral),
            "DermCloseUp" => Some(ImageView::DermCloseUp),
            "Other" => Some(ImageView::Other),
            _ => None,
        }
    }
}

/// An image reference must be an absolute http(s) URL with a host.
pub fn validate_image_url(raw: &str) -> Result<Url, String> {
    if raw.trim().is_empty() {
        return Err("Invalid image URL provided".to_string());
    }

    let url = Url::parse(raw).map_err(|_| "Invalid URL format".to_string())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err("Invalid URL format".to_string());
    }
    Ok(url)
}

/// Client for the medical vision-language service.
pub struct VisionClient {
    client: JsonClient,
}

impl VisionClient {
    pub fn new(config: ServiceConfig) -> Result<Self, UpstreamError> {
        Ok(Self {
            client: JsonClient::new(config, Service::Vision)?,
        })
    }

    pub async fn analyze(
        &self,
        image_url: &Url,
        view: Option<ImageView>,
        prompt: Option<&str>,
    ) -> Result<Value, UpstreamError> {
        self.client
            .post(
                "/vision/analyze",
                &json!({
                    "image_url": image_url.as_str(),
                    "view": view,
                    "prompt": prompt,
                }),
            )
            .await
    }
}
