//! In-memory AccountStore
//!
//! Used by tests and when the server starts without `DATABASE_URL`.
//! Enforces the same unique constraints as the Postgres schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::models::{
    Account, AccountTotals, HistoryRecord, NewAccount, NewReferralCredit, NewTelemetrySample,
    ReferralCredit, TelemetrySample,
};
use super::repository::{AccountStore, StoreError, StoreResult};
use crate::types::EarningsHistory;

#[derive(Default)]
struct Tables {
    users: Vec<Account>,
    earnings_history: HashMap<i64, HistoryRecord>,
    referrals: Vec<ReferralCredit>,
    bandwidth_data: Vec<TelemetrySample>,
    next_user_id: i64,
    next_referral_id: i64,
    next_sample_id: i64,
}

impl Tables {
    fn account_mut(&mut self, account_id: i64) -> StoreResult<&mut Account> {
        self.users
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| StoreError::Backend(format!("no account row {}", account_id)))
    }

    fn ensure_account(&self, account_id: i64) -> StoreResult<()> {
        if self.users.iter().any(|a| a.id == account_id) {
            Ok(())
        } else {
            // Postgres라면 foreign key 위반
            Err(StoreError::Backend(format!("no account row {}", account_id)))
        }
    }
}

/// 메모리 저장소
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|a| a.email == account.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if tables.users.iter().any(|a| a.user_id == account.user_id) {
            return Err(StoreError::DuplicateKey("user_id"));
        }
        if tables.users.iter().any(|a| a.referral_code == account.referral_code) {
            return Err(StoreError::DuplicateKey("referral_code"));
        }

        tables.next_user_id += 1;
        let row = Account {
            id: tables.next_user_id,
            name: account.name,
            email: account.email,
            password: account.password,
            is_admin: account.is_admin,
            user_id: account.user_id,
            referral_code: account.referral_code,
            earnings: 0.0,
            bandwidth_shared: 0.0,
            daily_goal: 0,
            last_active: None,
            created_at: Utc::now(),
        };
        tables.users.push(row.clone());

        Ok(row)
    }

    async fn init_history(&self, account_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_account(account_id)?;
        tables
            .earnings_history
            .entry(account_id)
            .or_insert(HistoryRecord {
                days: EarningsHistory::zeroed(),
                updated_at: at,
            });
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|a| a.user_id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|a| a.email == email).cloned())
    }

    async fn touch_last_active(&self, account_id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.account_mut(account_id)?.last_active = Some(at);
        Ok(())
    }

    async fn update_totals(
        &self,
        account_id: i64,
        totals: &AccountTotals,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let account = tables.account_mut(account_id)?;
        account.earnings = totals.earnings;
        account.bandwidth_shared = totals.bandwidth_shared;
        account.daily_goal = totals.daily_goal;
        account.last_active = Some(at);
        Ok(())
    }

    async fn load_history(&self, account_id: i64) -> StoreResult<Option<HistoryRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.earnings_history.get(&account_id).copied())
    }

    async fn replace_history(
        &self,
        account_id: i64,
        history: &EarningsHistory,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.ensure_account(account_id)?;
        tables.earnings_history.insert(
            account_id,
            HistoryRecord {
                days: *history,
                updated_at: at,
            },
        );
        Ok(())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.users.clone())
    }

    async fn append_referral(&self, credit: NewReferralCredit) -> StoreResult<ReferralCredit> {
        let mut tables = self.tables.write().await;
        tables.ensure_account(credit.account_id)?;

        tables.next_referral_id += 1;
        let row = ReferralCredit {
            id: tables.next_referral_id,
            account_id: credit.account_id,
            referral_id: credit.referral_id,
            amount: credit.amount,
            created_at: credit.created_at,
        };
        tables.referrals.push(row.clone());

        Ok(row)
    }

    async fn list_referrals(&self, account_id: i64) -> StoreResult<Vec<ReferralCredit>> {
        let tables = self.tables.read().await;
        Ok(tables
            .referrals
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn append_telemetry(&self, sample: NewTelemetrySample) -> StoreResult<TelemetrySample> {
        let mut tables = self.tables.write().await;
        tables.ensure_account(sample.account_id)?;

        tables.next_sample_id += 1;
        let row = TelemetrySample {
            id: tables.next_sample_id,
            account_id: sample.account_id,
            captured_at: sample.captured_at,
            speed_mbps: sample.speed_mbps,
            duration_seconds: sample.duration_seconds,
            bandwidth_mb: sample.bandwidth_mb,
        };
        tables.bandwidth_data.push(row.clone());

        Ok(row)
    }

    async fn list_telemetry(&self) -> StoreResult<Vec<TelemetrySample>> {
        let tables = self.tables.read().await;
        Ok(tables.bandwidth_data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(email: &str, user_id: &str, code: &str) -> NewAccount {
        NewAccount {
            name: "Tester".to_string(),
            email: email.to_string(),
            password: "password1".to_string(),
            is_admin: false,
            user_id: user_id.to_string(),
            referral_code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let store = MemoryStore::new();
        store
            .create_account(new_account("a@x.com", "user_1", "DUB-AAAA-AAAA"))
            .await
            .unwrap();

        let dup_email = store
            .create_account(new_account("a@x.com", "user_2", "DUB-BBBB-BBBB"))
            .await;
        assert!(matches!(dup_email, Err(StoreError::DuplicateEmail)));

        let dup_code = store
            .create_account(new_account("b@x.com", "user_2", "DUB-AAAA-AAAA"))
            .await;
        assert!(matches!(dup_code, Err(StoreError::DuplicateKey("referral_code"))));
    }

    #[tokio::test]
    async fn test_history_absent_until_initialized() {
        let store = MemoryStore::new();
        let account = store
            .create_account(new_account("a@x.com", "user_1", "DUB-AAAA-AAAA"))
            .await
            .unwrap();

        assert_eq!(store.load_history(account.id).await.unwrap(), None);

        store.init_history(account.id, account.created_at).await.unwrap();
        assert_eq!(
            store.load_history(account.id).await.unwrap(),
            Some(HistoryRecord {
                days: EarningsHistory::zeroed(),
                updated_at: account.created_at,
            })
        );

        // 다시 init해도 기존 row 유지
        let later = account.created_at + chrono::Duration::days(2);
        let days = EarningsHistory::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        store.replace_history(account.id, &days, later).await.unwrap();
        store.init_history(account.id, Utc::now()).await.unwrap();

        let record = store.load_history(account.id).await.unwrap().unwrap();
        assert_eq!(record.days, days);
        assert_eq!(record.updated_at, later);
    }

    #[tokio::test]
    async fn test_children_require_parent() {
        let store = MemoryStore::new();
        let orphan = store
            .append_referral(NewReferralCredit {
                account_id: 42,
                referral_id: "ref_x".to_string(),
                amount: 1.0,
                created_at: Utc::now(),
            })
            .await;
        assert!(matches!(orphan, Err(StoreError::Backend(_))));
    }
}
