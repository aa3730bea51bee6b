//! Repository Pattern Implementation
//!
//! `AccountStore` abstracts the four tables behind one async trait so the
//! service layer can run against PostgreSQL (`Database`) or memory (`MemoryStore`).
//!
//! Every method is a single independent write or read. No method updates totals
//! and history together; the sync path issues two writes, and a crash between
//! them leaves the history stale.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{
    Account, AccountTotals, HistoryRecord, NewAccount, NewReferralCredit, NewTelemetrySample,
    ReferralCredit, TelemetrySample,
};
use crate::types::EarningsHistory;

/// 저장소 에러
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    /// user_id / referral_code unique 충돌 (재생성 후 재시도 가능)
    #[error("duplicate key: {0}")]
    DuplicateKey(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Account / ReferralLedger / TelemetryLog 저장소 인터페이스
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // ============ AccountStore ============

    /// 계정 생성 (email, user_id, referral_code unique)
    async fn create_account(&self, account: NewAccount) -> StoreResult<Account>;

    /// 0으로 채운 history row 생성 (계정 생성과 별도 write)
    async fn init_history(&self, account_id: i64, at: DateTime<Utc>) -> StoreResult<()>;

    async fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Account>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;

    async fn touch_last_active(&self, account_id: i64, at: DateTime<Utc>) -> StoreResult<()>;

    /// earnings, bandwidth_shared, daily_goal, last_active 무조건 덮어쓰기
    async fn update_totals(
        &self,
        account_id: i64,
        totals: &AccountTotals,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// history row가 없으면 None
    async fn load_history(&self, account_id: i64) -> StoreResult<Option<HistoryRecord>>;

    /// 7개 슬롯 전체 덮어쓰기 + updated_at 갱신
    async fn replace_history(
        &self,
        account_id: i64,
        history: &EarningsHistory,
        at: DateTime<Utc>,
    ) -> StoreResult<()>;

    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;

    // ============ ReferralLedger ============

    async fn append_referral(&self, credit: NewReferralCredit) -> StoreResult<ReferralCredit>;

    async fn list_referrals(&self, account_id: i64) -> StoreResult<Vec<ReferralCredit>>;

    // ============ TelemetryLog ============

    async fn append_telemetry(&self, sample: NewTelemetrySample) -> StoreResult<TelemetrySample>;

    async fn list_telemetry(&self) -> StoreResult<Vec<TelemetrySample>>;
}
