//! Common Types Module
//!
//! 서버(SyncEndpoint)와 클라이언트(SessionController)가 공유하는 wire 타입 정의

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 7일 rolling history 슬롯 수
pub const HISTORY_DAYS: usize = 7;

/// 단순 성공 응답 (`{"success": true}`)
///
/// 서버 상태를 echo 하지 않음 → 클라이언트가 자신이 쓴 값의 source of truth
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// 7-slot 수익 히스토리
///
/// # Slot Convention
///
/// - slot 6: 계정의 `lastActive` 날짜 (실행 중인 클라이언트에서는 "오늘")
/// - slot 0: 그로부터 6일 전
///
/// 서버는 이 매핑을 검증하지 않음. 길이 7만 보장.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct EarningsHistory([f64; HISTORY_DAYS]);

impl EarningsHistory {
    pub const TODAY: usize = HISTORY_DAYS - 1;

    pub fn new(days: [f64; HISTORY_DAYS]) -> Self {
        Self(days)
    }

    pub fn zeroed() -> Self {
        Self([0.0; HISTORY_DAYS])
    }

    pub fn days(&self) -> &[f64; HISTORY_DAYS] {
        &self.0
    }

    pub fn today(&self) -> f64 {
        self.0[Self::TODAY]
    }

    /// 오늘 슬롯에 수익 적립
    pub fn credit_today(&mut self, amount: f64) {
        self.0[Self::TODAY] += amount;
    }

    /// 날짜가 바뀐 만큼 왼쪽으로 밀고 새 슬롯은 0으로 채움
    pub fn shift_days(&mut self, days: usize) {
        if days >= HISTORY_DAYS {
            self.0 = [0.0; HISTORY_DAYS];
            return;
        }
        self.0.rotate_left(days);
        for slot in &mut self.0[HISTORY_DAYS - days..] {
            *slot = 0.0;
        }
    }
}

impl TryFrom<Vec<f64>> for EarningsHistory {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let len = values.len();
        let days: [f64; HISTORY_DAYS] = values
            .try_into()
            .map_err(|_| format!("earnings history must have {} entries, got {}", HISTORY_DAYS, len))?;
        Ok(Self(days))
    }
}

impl From<EarningsHistory> for Vec<f64> {
    fn from(history: EarningsHistory) -> Self {
        history.0.to_vec()
    }
}

// ============ SyncEndpoint Wire Types ============

/// 클라이언트 snapshot (`POST /api/user/:userId/update`)
///
/// `earningsHistory`는 길이를 여기서 강제하지 않음. 길이가 7이 아니면 서버가 무시.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub earnings: f64,
    pub bandwidth_shared: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings_history: Option<Vec<f64>>,
    /// 0 이상, 상한 없음 (BIGINT)
    pub daily_goal: i64,
}

/// 추천 수익 추가 요청 (`POST /api/user/:userId/referral`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferralRequest {
    pub earnings: f64,
}

/// 대역폭 텔레메트리 샘플 (`POST /api/user/:userId/bandwidth`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReport {
    pub timestamp: DateTime<Utc>,
    pub speed_mbps: f64,
    pub duration_seconds: f64,
    #[serde(rename = "bandwidthMB")]
    pub bandwidth_mb: f64,
}

// ============ Auth Wire Types ============

/// 회원가입 요청
///
/// 필드 누락을 axum 422가 아니라 400 "Please fill in all fields"로 처리하기 위해 Option
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// 회원가입/로그인 응답의 `user` 객체
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub email: String,
    pub name: String,
    pub user_id: String,
    pub referral_code: String,
    pub is_admin: bool,
    /// 로그인 응답에만 포함
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earnings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_goal: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: SessionUser,
}

// ============ Read Path ============

/// `GET /api/user/:userId` 의 `user` 객체
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub email: String,
    pub name: String,
    pub user_id: String,
    pub referral_code: String,
    pub is_admin: bool,
    pub earnings: f64,
    pub bandwidth_shared: f64,
    pub daily_goal: i64,
    pub last_active: Option<DateTime<Utc>>,
}

/// 추천 수익 레코드 (읽기 전용 뷰)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralView {
    pub referral_id: String,
    pub earnings: f64,
    pub created_at: DateTime<Utc>,
}

/// 계정 + 7-slot 히스토리 + 추천 수익 목록
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user: UserSummary,
    pub earnings_history: EarningsHistory,
    /// history를 마지막으로 덮어쓴 시각. slot 6 = 이 시각의 날짜
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_updated_at: Option<DateTime<Utc>>,
    pub referrals: Vec<ReferralView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_rejects_wrong_length() {
        assert!(EarningsHistory::try_from(vec![1.0; 5]).is_err());
        assert!(EarningsHistory::try_from(vec![1.0; 8]).is_err());
        assert!(EarningsHistory::try_from(vec![1.0; 7]).is_ok());
    }

    #[test]
    fn test_history_shift_days() {
        let mut history = EarningsHistory::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        history.shift_days(2);
        assert_eq!(history.days(), &[3.0, 4.0, 5.0, 6.0, 7.0, 0.0, 0.0]);

        history.shift_days(30);
        assert_eq!(history, EarningsHistory::zeroed());
    }

    #[test]
    fn test_history_credit_today() {
        let mut history = EarningsHistory::zeroed();
        history.credit_today(0.25);
        history.credit_today(0.5);
        assert!((history.today() - 0.75).abs() < 1e-9);
        assert_eq!(history.days()[0], 0.0);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let json = r#"{"earnings":12.5,"bandwidthShared":300,"dailyGoal":10}"#;
        let snapshot: SyncSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.earnings_history, None);
        assert_eq!(snapshot.daily_goal, 10);

        let report = TelemetryReport {
            timestamp: Utc::now(),
            speed_mbps: 1.5,
            duration_seconds: 30.0,
            bandwidth_mb: 5.625,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("bandwidthMB").is_some());
        assert!(value.get("speedMbps").is_some());
    }
}
