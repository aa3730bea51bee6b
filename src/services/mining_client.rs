//! Mining Simulation / Sync HTTP Clients
//!
//! Two seams the SessionController is composed from:
//!
//! - `MiningApi`: the external simulation server (`/connect`, `/status`, `/complete_task`)
//! - `SyncApi`: this crate's own account endpoints (`/api/user/:userId/...`)
//!
//! Both return `Result<T, ClientError>` instead of callbacks, so the controller's
//! scheduling loop decides what a failure means (backoff vs. reset).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ClientError;
use crate::types::{Ack, SyncSnapshot, TelemetryReport, UserProfile};

/// 연결 시작 응답 (`{"status": "connecting"}`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectAck {
    pub status: String,
}

impl ConnectAck {
    pub const CONNECTING: &'static str = "connecting";

    pub fn is_connecting(&self) -> bool {
        self.status == Self::CONNECTING
    }
}

/// `/status` 응답
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MiningStatus {
    pub is_mining: bool,
    /// 0.0 ~ 1.0 비율
    #[serde(default)]
    pub mining_speed: f64,
    #[serde(default)]
    pub bandwidth: BandwidthReport,
    #[serde(default)]
    pub last_mining: Option<MiningEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BandwidthReport {
    /// raw capacity (정규화 전)
    #[serde(default)]
    pub unused: f64,
}

/// 마지막 채굴 이벤트
///
/// 시뮬레이터가 amount를 숫자 또는 문자열로 보냄
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MiningEvent {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

impl MiningEvent {
    /// 같은 이벤트가 여러 폴링에 걸쳐 보고될 때 중복 적립 방지용 키
    pub fn dedupe_key(&self) -> Option<String> {
        self.id
            .as_ref()
            .or(self.timestamp.as_ref())
            .map(|v| v.to_string())
    }
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let amount = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(amount.filter(|a| a.is_finite()))
}

#[derive(Debug, Serialize)]
struct TaskRequest<'a> {
    task: &'a str,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    message: String,
}

/// 시뮬레이션 서버 인터페이스
#[async_trait]
pub trait MiningApi: Send + Sync {
    /// POST /connect
    async fn connect(&self) -> Result<ConnectAck, ClientError>;

    /// 종료 요청. 시뮬레이터의 /connect는 토글이므로 같은 엔드포인트를 한 번 더 호출
    async fn disconnect(&self) -> Result<(), ClientError>;

    /// GET /status
    async fn status(&self) -> Result<MiningStatus, ClientError>;

    /// POST /complete_task → message
    async fn complete_task(&self, task: &str) -> Result<String, ClientError>;
}

/// 계정 sync 인터페이스
#[async_trait]
pub trait SyncApi: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ClientError>;

    async fn push_snapshot(&self, user_id: &str, snapshot: &SyncSnapshot)
        -> Result<(), ClientError>;

    async fn push_telemetry(
        &self,
        user_id: &str,
        report: &TelemetryReport,
    ) -> Result<(), ClientError>;
}

/// 2xx가 아니면 Rejected, 아니면 JSON 디코드
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// reqwest 기반 시뮬레이션 서버 클라이언트
#[derive(Debug, Clone)]
pub struct HttpMiningClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMiningClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

#[async_trait]
impl MiningApi for HttpMiningClient {
    async fn connect(&self) -> Result<ConnectAck, ClientError> {
        let response = self.http.post(self.url("/connect")).send().await?;
        decode(response).await
    }

    async fn disconnect(&self) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/connect")).send().await?;
        decode::<serde_json::Value>(response).await.map(|_| ())
    }

    async fn status(&self) -> Result<MiningStatus, ClientError> {
        let response = self.http.get(self.url("/status")).send().await?;
        decode(response).await
    }

    async fn complete_task(&self, task: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/complete_task"))
            .json(&TaskRequest { task })
            .send()
            .await?;
        let body: TaskResponse = decode(response).await?;
        Ok(body.message)
    }
}

/// reqwest 기반 계정 API 클라이언트
#[derive(Debug, Clone)]
pub struct HttpAccountClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAccountClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
        }
    }

    fn user_url(&self, user_id: &str, suffix: &str) -> String {
        join_url(&self.base_url, &format!("/api/user/{}{}", user_id, suffix))
    }
}

#[async_trait]
impl SyncApi for HttpAccountClient {
    async fn fetch_profile(&self, user_id: &str) -> Result<UserProfile, ClientError> {
        let response = self.http.get(self.user_url(user_id, "")).send().await?;
        decode(response).await
    }

    async fn push_snapshot(
        &self,
        user_id: &str,
        snapshot: &SyncSnapshot,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.user_url(user_id, "/update"))
            .json(snapshot)
            .send()
            .await?;
        decode::<Ack>(response).await.map(|_| ())
    }

    async fn push_telemetry(
        &self,
        user_id: &str,
        report: &TelemetryReport,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.user_url(user_id, "/bandwidth"))
            .json(report)
            .send()
            .await?;
        decode::<Ack>(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        let json = r#"{"is_mining":true,"mining_speed":0.437,"bandwidth":{"unused":6250}}"#;
        let status: MiningStatus = serde_json::from_str(json).unwrap();
        assert!(status.is_mining);
        assert_eq!(status.bandwidth.unused, 6250.0);
        assert!(status.last_mining.is_none());
    }

    #[test]
    fn test_status_idle_minimal() {
        let status: MiningStatus = serde_json::from_str(r#"{"is_mining":false}"#).unwrap();
        assert!(!status.is_mining);
        assert_eq!(status.mining_speed, 0.0);
    }

    #[test]
    fn test_amount_number_or_string() {
        let numeric: MiningEvent = serde_json::from_str(r#"{"amount":0.25}"#).unwrap();
        assert_eq!(numeric.amount, Some(0.25));

        let text: MiningEvent = serde_json::from_str(r#"{"amount":"0.75"}"#).unwrap();
        assert_eq!(text.amount, Some(0.75));

        let garbage: MiningEvent = serde_json::from_str(r#"{"amount":"abc"}"#).unwrap();
        assert_eq!(garbage.amount, None);

        let missing: MiningEvent = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(missing.amount, None);
    }

    #[test]
    fn test_dedupe_key_prefers_id() {
        let event: MiningEvent =
            serde_json::from_str(r#"{"amount":1,"id":7,"timestamp":"2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(event.dedupe_key().as_deref(), Some("7"));

        let event: MiningEvent = serde_json::from_str(r#"{"amount":1}"#).unwrap();
        assert_eq!(event.dedupe_key(), None);
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://localhost:5000/", "/status"), "http://localhost:5000/status");
        let client = HttpAccountClient::new("http://localhost:3000");
        assert_eq!(
            client.user_url("user_1", "/update"),
            "http://localhost:3000/api/user/user_1/update"
        );
    }
}
