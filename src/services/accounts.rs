//! Account Service
//!
//! Server-side accounting: registration/login, the read-only profile
//! aggregation, snapshot sync (last-writer-wins), and the append-only referral
//! and telemetry logs.
//!
//! # Known gaps
//!
//! - Passwords are stored and compared as plain text.
//! - Referral credits have no duplicate-submission guard, and adding one does
//!   not touch `earnings`; the client syncs the aggregate separately.

use std::sync::Arc;

use chrono::Utc;

use crate::db::{
    Account, AccountStore, AccountTotals, NewAccount, NewReferralCredit, NewTelemetrySample,
    ReferralCredit, StoreError, TelemetrySample,
};
use crate::error::ApiError;
use crate::services::ids::IdGenerator;
use crate::types::{
    EarningsHistory, LoginRequest, RegisterRequest, SyncSnapshot, TelemetryReport, UserProfile,
};

/// 최소 비밀번호 길이
pub const MIN_PASSWORD_LEN: usize = 8;

/// user_id / referral_code 충돌 시 재생성 횟수
const MAX_ID_ATTEMPTS: usize = 5;

/// sync 결과 (로그용)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryUpdate {
    Replaced,
    /// 길이가 7이 아니거나 없음 → 기존 history 유지
    Skipped,
}

pub struct AccountService {
    store: Arc<dyn AccountStore>,
    ids: Arc<dyn IdGenerator>,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store.health_check().await
    }

    // ============ Auth ============

    /// 회원가입
    ///
    /// # Flow
    ///
    /// 1. 필드 누락 / 비밀번호 길이 검증
    /// 2. user_id, referral_code 생성 후 insert (충돌 시 재생성)
    /// 3. 0으로 채운 history row 생성 (별도 write)
    pub async fn register(&self, req: RegisterRequest) -> Result<Account, ApiError> {
        let (name, email, password) = match (
            non_blank(req.name),
            non_blank(req.email),
            non_blank(req.password),
        ) {
            (Some(name), Some(email), Some(password)) => (name, email, password),
            _ => {
                return Err(ApiError::ValidationError(
                    "Please fill in all fields".to_string(),
                ))
            }
        };

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let account = self.insert_account(name, email, password, false).await?;
        self.store.init_history(account.id, account.created_at).await?;

        tracing::info!(user_id = %account.user_id, "Account registered");
        Ok(account)
    }

    /// 로그인 (평문 비교)
    pub async fn login(&self, req: LoginRequest) -> Result<Account, ApiError> {
        let (Some(email), Some(password)) = (req.email, req.password) else {
            return Err(ApiError::AuthError);
        };

        let mut account = match self.store.find_by_email(&email).await? {
            Some(account) if account.password == password => account,
            _ => return Err(ApiError::AuthError),
        };

        let now = Utc::now();
        self.store.touch_last_active(account.id, now).await?;
        account.last_active = Some(now);

        Ok(account)
    }

    /// 관리자 계정 시드 (이미 있으면 아무것도 안 함)
    ///
    /// 생성했으면 true
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, ApiError> {
        if self.store.find_by_email(email).await?.is_some() {
            return Ok(false);
        }

        let account = self
            .insert_account("Admin".to_string(), email.to_string(), password.to_string(), true)
            .await?;
        self.store.init_history(account.id, account.created_at).await?;

        tracing::info!(user_id = %account.user_id, "Admin account created");
        Ok(true)
    }

    async fn insert_account(
        &self,
        name: String,
        email: String,
        password: String,
        is_admin: bool,
    ) -> Result<Account, ApiError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let new_account = NewAccount {
                name: name.clone(),
                email: email.clone(),
                password: password.clone(),
                is_admin,
                user_id: if is_admin {
                    self.ids.admin_id()
                } else {
                    self.ids.user_id()
                },
                referral_code: self.ids.referral_code(),
            };

            match self.store.create_account(new_account).await {
                Ok(account) => return Ok(account),
                Err(StoreError::DuplicateKey(key)) => {
                    tracing::warn!(attempt, key, "Generated identifier collided, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(ApiError::StorageError(
            "could not allocate unique account identifiers".to_string(),
        ))
    }

    // ============ Read Path ============

    /// 계정 + history + referral 목록 (읽기 전용)
    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, ApiError> {
        let account = self.resolve(user_id).await?;

        let (earnings_history, history_updated_at) =
            match self.store.load_history(account.id).await? {
                Some(record) => (record.days, Some(record.updated_at)),
                None => (EarningsHistory::zeroed(), None),
            };

        let referrals = self.store.list_referrals(account.id).await?;

        Ok(UserProfile {
            user: account.summary(),
            earnings_history,
            history_updated_at,
            referrals: referrals.iter().map(ReferralCredit::view).collect(),
        })
    }

    // ============ SyncEndpoint ============

    /// Snapshot 반영
    ///
    /// - totals: 무조건 덮어쓰기 (delta merge 아님)
    /// - history: 길이 7일 때만 전체 덮어쓰기, 아니면 그대로 둠 (에러 아님).
    ///   덮어쓸 때 updated_at도 갱신 (slot 6의 기준 날짜)
    ///
    /// 두 write는 독립적, 트랜잭션 없음
    pub async fn sync(
        &self,
        user_id: &str,
        snapshot: SyncSnapshot,
    ) -> Result<HistoryUpdate, ApiError> {
        let account = self.resolve(user_id).await?;

        validate_amount("earnings", snapshot.earnings)?;
        validate_amount("bandwidthShared", snapshot.bandwidth_shared)?;
        if snapshot.daily_goal < 0 {
            return Err(ApiError::ValidationError(
                "dailyGoal must be a non-negative integer".to_string(),
            ));
        }

        let now = Utc::now();
        let totals = AccountTotals {
            earnings: snapshot.earnings,
            bandwidth_shared: snapshot.bandwidth_shared,
            daily_goal: snapshot.daily_goal,
        };
        self.store
            .update_totals(account.id, &totals, now)
            .await?;

        let history = snapshot
            .earnings_history
            .and_then(|days| EarningsHistory::try_from(days).ok());

        let update = match history {
            Some(history) => {
                self.store.replace_history(account.id, &history, now).await?;
                HistoryUpdate::Replaced
            }
            None => HistoryUpdate::Skipped,
        };

        tracing::debug!(user_id, ?update, "Snapshot synced");
        Ok(update)
    }

    /// 추천 수익 추가 (append-only)
    ///
    /// `earnings`는 갱신하지 않음. 호출자가 별도로 sync 해야 함
    pub async fn add_referral(
        &self,
        user_id: &str,
        amount: f64,
    ) -> Result<ReferralCredit, ApiError> {
        let account = self.resolve(user_id).await?;
        validate_amount("earnings", amount)?;

        let credit = self
            .store
            .append_referral(NewReferralCredit {
                account_id: account.id,
                referral_id: self.ids.referral_id(),
                amount,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(user_id, referral_id = %credit.referral_id, amount, "Referral credited");
        Ok(credit)
    }

    /// 텔레메트리 샘플 추가 (검증 없이 그대로 저장)
    pub async fn add_telemetry(
        &self,
        user_id: &str,
        report: TelemetryReport,
    ) -> Result<TelemetrySample, ApiError> {
        let account = self.resolve(user_id).await?;

        let sample = self
            .store
            .append_telemetry(NewTelemetrySample {
                account_id: account.id,
                captured_at: report.timestamp,
                speed_mbps: report.speed_mbps,
                duration_seconds: report.duration_seconds,
                bandwidth_mb: report.bandwidth_mb,
            })
            .await?;

        Ok(sample)
    }

    // ============ Admin ============

    pub async fn all_accounts(&self) -> Result<Vec<Account>, ApiError> {
        Ok(self.store.list_accounts().await?)
    }

    pub async fn all_telemetry(&self) -> Result<Vec<TelemetrySample>, ApiError> {
        Ok(self.store.list_telemetry().await?)
    }

    async fn resolve(&self, user_id: &str) -> Result<Account, ApiError> {
        self.store
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User".to_string()))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_amount(field: &str, value: f64) -> Result<(), ApiError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!(
            "{} must be a non-negative number",
            field
        )))
    }
}
