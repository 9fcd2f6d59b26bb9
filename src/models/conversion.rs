use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub source_image: String,
    pub to_format: String,
}

/// Where a converted image can be retrieved. For asynchronous requests the
/// path is predicted and only resolves once the conversion has succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub format: String,
    pub path: String,
}
