use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub image_url: String,
    pub brand_id: Option<i64>,
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdInsightsRequest {
    pub image_url: String,
    pub brand_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}
