//! Database Models
//!
//! Row models for the four persisted tables: users, earnings_history,
//! referrals and bandwidth_data. Identity is split in two: `id` is the internal
//! autoincrement key used for joins, `user_id` is the opaque external token clients see.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{EarningsHistory, ReferralView, SessionUser, UserSummary};

/// 사용자 계정 (users 테이블)
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// 내부 row id (autoincrement)
    pub id: i64,

    pub name: String,

    /// unique
    pub email: String,

    /// 평문 저장 (알려진 보안 이슈, 해싱 미적용)
    /// admin dump에도 노출하지 않음
    #[serde(skip_serializing)]
    pub password: String,

    pub is_admin: bool,

    /// 외부 식별자 (클라이언트가 사용하는 opaque token)
    pub user_id: String,

    /// DUB-XXXX-XXXX
    pub referral_code: String,

    /// 누적 수익
    pub earnings: f64,

    /// 누적 공유 대역폭 (MB)
    pub bandwidth_shared: f64,

    pub daily_goal: i64,

    /// 마지막 sync/login 시간 (history 기준 날짜와는 별개)
    pub last_active: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Account {
    /// 읽기 경로(`GET /api/user/:userId`)용 뷰
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            email: self.email.clone(),
            name: self.name.clone(),
            user_id: self.user_id.clone(),
            referral_code: self.referral_code.clone(),
            is_admin: self.is_admin,
            earnings: self.earnings,
            bandwidth_shared: self.bandwidth_shared,
            daily_goal: self.daily_goal,
            last_active: self.last_active,
        }
    }

    /// 회원가입 응답용 (수익 필드 없음)
    pub fn registered_user(&self) -> SessionUser {
        SessionUser {
            email: self.email.clone(),
            name: self.name.clone(),
            user_id: self.user_id.clone(),
            referral_code: self.referral_code.clone(),
            is_admin: self.is_admin,
            earnings: None,
            daily_goal: None,
        }
    }

    /// 로그인 응답용
    pub fn logged_in_user(&self) -> SessionUser {
        SessionUser {
            earnings: Some(self.earnings),
            daily_goal: Some(self.daily_goal),
            ..self.registered_user()
        }
    }
}

/// earnings_history row
///
/// slot 6은 `updated_at`의 날짜. login 등으로 `last_active`가 바뀌어도 그대로
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRecord {
    pub days: EarningsHistory,
    pub updated_at: DateTime<Utc>,
}

/// 신규 계정 insert 값
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub user_id: String,
    pub referral_code: String,
}

/// snapshot으로 덮어쓰는 집계 필드
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountTotals {
    pub earnings: f64,
    pub bandwidth_shared: f64,
    pub daily_goal: i64,
}

/// 추천 수익 레코드 (referrals 테이블, append-only)
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralCredit {
    pub id: i64,
    pub account_id: i64,
    /// unique 제약 없음 → 같은 referral이 여러 번 기록될 수 있음
    pub referral_id: String,
    #[serde(rename = "earnings")]
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

impl ReferralCredit {
    pub fn view(&self) -> ReferralView {
        ReferralView {
            referral_id: self.referral_id.clone(),
            earnings: self.amount,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewReferralCredit {
    pub account_id: i64,
    pub referral_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// 대역폭 텔레메트리 샘플 (bandwidth_data 테이블, append-only)
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub id: i64,
    pub account_id: i64,
    pub captured_at: DateTime<Utc>,
    pub speed_mbps: f64,
    pub duration_seconds: f64,
    #[serde(rename = "bandwidthMB")]
    pub bandwidth_mb: f64,
}

#[derive(Debug, Clone)]
pub struct NewTelemetrySample {
    pub account_id: i64,
    pub captured_at: DateTime<Utc>,
    pub speed_mbps: f64,
    pub duration_seconds: f64,
    pub bandwidth_mb: f64,
}
