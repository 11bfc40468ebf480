//! Courier lookup by tracking code through the KDNiao e-business API.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, instrument};

use crate::config::TrackingConfig;
use crate::errors::ServiceError;

/// Courier recognition request.
const REQUEST_TYPE: u32 = 2002;
/// JSON request and response bodies.
const DATA_TYPE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipper {
    #[serde(rename = "ShipperName", default)]
    pub name: String,
    #[serde(rename = "ShipperCode", default)]
    pub code: String,
}

/// Couriers that may have issued a tracking code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResponse {
    #[serde(rename = "LogisticCode", default)]
    pub logistic_code: String,
    #[serde(rename = "Shippers", default)]
    pub shippers: Vec<Shipper>,
    #[serde(rename = "EBusinessID", default)]
    pub business_id: String,
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Success", default)]
    pub success: bool,
}

#[async_trait]
pub trait CourierTracking: Send + Sync {
    async fn source_by_track(&self, track_code: &str) -> Result<SourceResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct KdniaoClient {
    client: reqwest::Client,
    endpoint: String,
    business_id: String,
    api_secret: String,
}

impl KdniaoClient {
    pub fn new(config: &TrackingConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("tracking client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            business_id: config.business_id.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    /// base64 of the hex md5 digest of `payload` followed by the secret.
    pub fn sign(&self, payload: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(payload.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        STANDARD.encode(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl CourierTracking for KdniaoClient {
    #[instrument(skip(self))]
    async fn source_by_track(&self, track_code: &str) -> Result<SourceResponse, ServiceError> {
        let payload = serde_json::json!({ "LogisticCode": track_code }).to_string();
        let sign = self.sign(&payload);
        let data_type = DATA_TYPE.to_string();
        let request_type = REQUEST_TYPE.to_string();

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("EBusinessID", self.business_id.as_str()),
                ("DataType", data_type.as_str()),
                ("DataSign", sign.as_str()),
                ("RequestType", request_type.as_str()),
                ("RequestData", payload.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "courier service unreachable");
                ServiceError::ExternalServiceError(e.to_string()).into_api(
                    "Courier service is unavailable",
                    "Try again later",
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "courier service returned {}",
                status
            ))
            .into_api("Courier service is unavailable", "Try again later"));
        }

        response.json::<SourceResponse>().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("courier response: {}", e))
                .into_api("Courier service returned an unexpected answer", "Try again later")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(endpoint: String) -> KdniaoClient {
        KdniaoClient::new(&TrackingConfig {
            business_id: "1613169".into(),
            api_secret: "secret".into(),
            endpoint,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn signature_is_base64_of_hex_digest() {
        let signed = client("http://localhost".into()).sign("{}");
        let decoded = String::from_utf8(STANDARD.decode(signed).unwrap()).unwrap();
        assert_eq!(decoded.len(), 32);
        assert!(decoded.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            decoded,
            hex::encode(Md5::digest(b"{}secret".as_slice()))
        );
    }

    #[tokio::test]
    async fn looks_up_the_courier() {
        let server = MockServer::start().await;
        let api = client(format!("{}/Ebusiness/EbusinessOrderHandle.aspx", server.uri()));
        let sign = api.sign(r#"{"LogisticCode":"SF1192131829831"}"#);

        Mock::given(method("POST"))
            .and(path("/Ebusiness/EbusinessOrderHandle.aspx"))
            .and(query_param("EBusinessID", "1613169"))
            .and(query_param("RequestType", "2002"))
            .and(query_param("DataType", "2"))
            .and(query_param("DataSign", sign.as_str()))
            .and(query_param("RequestData", r#"{"LogisticCode":"SF1192131829831"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "LogisticCode": "SF1192131829831",
                "Shippers": [{"ShipperName": "顺丰速运", "ShipperCode": "SF"}],
                "EBusinessID": "1613169",
                "Code": "100",
                "Success": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = api.source_by_track("SF1192131829831").await.unwrap();
        assert!(response.success);
        assert_eq!(response.shippers[0].code, "SF");
    }

    #[tokio::test]
    async fn server_errors_are_external_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(server.uri()).source_by_track("X").await.unwrap_err();
        assert!(matches!(err.root(), ServiceError::ExternalServiceError(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
