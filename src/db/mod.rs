//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 PostgreSQL을 선택했는가?
//! A: 원래 SQLite 단일 파일이었지만 서버 여러 대에서 같은 계정을 sync 하려면
//!    공유 DB가 필요함
//!
//!    1. unique 제약: email / userId / referralCode 중복을 DB가 보장
//!    2. FOREIGN KEY ... ON DELETE CASCADE: referral / bandwidth row는 계정과 수명 공유
//!    3. 커넥션 풀: 동시 sync 요청 처리
//!
//! Q: 동시 sync 경쟁은 어떻게 처리하는가?
//! A: 처리하지 않음 (last-writer-wins)
//!    - 같은 userId로 두 기기가 동시에 sync 하면 나중 쓰기가 이김
//!    - totals UPDATE와 history UPSERT는 별도 쿼리, 트랜잭션 없음
//!    - 그 사이 장애 시 totals만 반영되고 history는 이전 값
//!
//! Q: 커넥션 풀은 어떻게 관리하는가?
//! A: SQLx의 PgPool 사용
//!    - 최소/최대 커넥션 수 설정
//!    - 커넥션 재사용 (오버헤드 감소)
//!    - 타임아웃 처리

mod memory;
mod models;
mod repository;

pub use memory::MemoryStore;
pub use models::*;
pub use repository::{AccountStore, StoreError, StoreResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::types::EarningsHistory;

/// PostgreSQL 저장소
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// unique 위반을 constraint 이름으로 구분
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") => StoreError::DuplicateEmail,
                Some("users_user_id_key") => StoreError::DuplicateKey("user_id"),
                Some("users_referral_code_key") => StoreError::DuplicateKey("referral_code"),
                _ => StoreError::Database(err),
            };
        }
    }
    StoreError::Database(err)
}

const ACCOUNT_COLUMNS: &str = r#"
    id, name, email, password, is_admin, user_id, referral_code,
    earnings, bandwidth_shared, daily_goal, last_active, created_at
"#;

#[async_trait]
impl AccountStore for Database {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password, is_admin, user_id, referral_code)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        );

        sqlx::query_as::<_, Account>(&sql)
            .bind(&account.name)
            .bind(&account.email)
            .bind(&account.password)
            .bind(account.is_admin)
            .bind(&account.user_id)
            .bind(&account.referral_code)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)
    }

    async fn init_history(&self, account_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO earnings_history (account_id, updated_at)
            VALUES ($1, $2)
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {} FROM users WHERE user_id = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    async fn touch_last_active(&self, account_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_active = $1 WHERE id = $2")
            .bind(at)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_totals(
        &self,
        account_id: i64,
        totals: &AccountTotals,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                earnings = $1,
                bandwidth_shared = $2,
                daily_goal = $3,
                last_active = $4
            WHERE id = $5
            "#,
        )
        .bind(totals.earnings)
        .bind(totals.bandwidth_shared)
        .bind(totals.daily_goal)
        .bind(at)
        .bind(account_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_history(&self, account_id: i64) -> StoreResult<Option<HistoryRecord>> {
        let row: Option<(f64, f64, f64, f64, f64, f64, f64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT day_0, day_1, day_2, day_3, day_4, day_5, day_6, updated_at
            FROM earnings_history
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(d0, d1, d2, d3, d4, d5, d6, updated_at)| HistoryRecord {
            days: EarningsHistory::new([d0, d1, d2, d3, d4, d5, d6]),
            updated_at,
        }))
    }

    async fn replace_history(
        &self,
        account_id: i64,
        history: &EarningsHistory,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let days = history.days();
        sqlx::query(
            r#"
            INSERT INTO earnings_history (
                account_id, day_0, day_1, day_2, day_3, day_4, day_5, day_6, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (account_id)
            DO UPDATE SET
                day_0 = EXCLUDED.day_0,
                day_1 = EXCLUDED.day_1,
                day_2 = EXCLUDED.day_2,
                day_3 = EXCLUDED.day_3,
                day_4 = EXCLUDED.day_4,
                day_5 = EXCLUDED.day_5,
                day_6 = EXCLUDED.day_6,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account_id)
        .bind(days[0])
        .bind(days[1])
        .bind(days[2])
        .bind(days[3])
        .bind(days[4])
        .bind(days[5])
        .bind(days[6])
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", ACCOUNT_COLUMNS);
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts)
    }

    async fn append_referral(&self, credit: NewReferralCredit) -> StoreResult<ReferralCredit> {
        let row = sqlx::query_as::<_, ReferralCredit>(
            r#"
            INSERT INTO referrals (account_id, referral_id, amount, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, account_id, referral_id, amount, created_at
            "#,
        )
        .bind(credit.account_id)
        .bind(&credit.referral_id)
        .bind(credit.amount)
        .bind(credit.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_referrals(&self, account_id: i64) -> StoreResult<Vec<ReferralCredit>> {
        let rows = sqlx::query_as::<_, ReferralCredit>(
            r#"
            SELECT id, account_id, referral_id, amount, created_at
            FROM referrals
            WHERE account_id = $1
            ORDER BY id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn append_telemetry(&self, sample: NewTelemetrySample) -> StoreResult<TelemetrySample> {
        let row = sqlx::query_as::<_, TelemetrySample>(
            r#"
            INSERT INTO bandwidth_data (
                account_id, captured_at, speed_mbps, duration_seconds, bandwidth_mb
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, account_id, captured_at, speed_mbps, duration_seconds, bandwidth_mb
            "#,
        )
        .bind(sample.account_id)
        .bind(sample.captured_at)
        .bind(sample.speed_mbps)
        .bind(sample.duration_seconds)
        .bind(sample.bandwidth_mb)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_telemetry(&self) -> StoreResult<Vec<TelemetrySample>> {
        let rows = sqlx::query_as::<_, TelemetrySample>(
            r#"
            SELECT id, account_id, captured_at, speed_mbps, duration_seconds, bandwidth_mb
            FROM bandwidth_data
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
