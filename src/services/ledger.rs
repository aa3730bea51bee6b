//! Client-side Account Ledger
//!
//! Running totals the client believes the server holds. Seeded from
//! `GET /api/user/:userId`, advanced by every credited mining event, and
//! written back wholesale as a `SyncSnapshot`.
//!
//! History slot 6 is the day the server last stored the ring
//! (`historyUpdatedAt`), not `lastActive`, which login also moves. When the
//! calendar day moves on the ring is shifted left before crediting.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::types::{EarningsHistory, SyncSnapshot, TelemetryReport, UserProfile};

/// Mbps × 초 → MB
const BITS_PER_BYTE: f64 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountLedger {
    user_id: String,
    earnings: f64,
    bandwidth_shared: f64,
    daily_goal: i64,
    history: EarningsHistory,
    /// slot 6이 가리키는 날짜
    history_day: NaiveDate,
}

impl AccountLedger {
    pub fn new(user_id: &str, today: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            earnings: 0.0,
            bandwidth_shared: 0.0,
            daily_goal: 0,
            history: EarningsHistory::zeroed(),
            history_day: today,
        }
    }

    /// 서버 프로필로 초기화
    pub fn from_profile(profile: &UserProfile, today: NaiveDate) -> Self {
        let anchor = profile
            .history_updated_at
            .map(|at| at.date_naive())
            .unwrap_or(today);

        let mut ledger = Self {
            user_id: profile.user.user_id.clone(),
            earnings: profile.user.earnings,
            bandwidth_shared: profile.user.bandwidth_shared,
            daily_goal: profile.user.daily_goal,
            history: profile.earnings_history,
            history_day: anchor,
        };
        ledger.roll_to(today);
        ledger
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn earnings(&self) -> f64 {
        self.earnings
    }

    pub fn bandwidth_shared(&self) -> f64 {
        self.bandwidth_shared
    }

    pub fn history(&self) -> &EarningsHistory {
        &self.history
    }

    pub fn set_daily_goal(&mut self, goal: i64) {
        self.daily_goal = goal;
    }

    /// 날짜가 바뀌었으면 history를 밀어냄 (과거 날짜는 무시)
    pub fn roll_to(&mut self, today: NaiveDate) {
        let days = (today - self.history_day).num_days();
        if days > 0 {
            self.history.shift_days(days as usize);
            self.history_day = today;
        }
    }

    /// 채굴 수익 적립 (누적 + 오늘 슬롯)
    pub fn credit(&mut self, amount: f64, today: NaiveDate) {
        self.roll_to(today);
        self.earnings += amount;
        self.history.credit_today(amount);
    }

    /// 지난 구간의 대역폭 샘플
    ///
    /// 공유량 = speed × 초 / 8 (MB). bandwidth_shared에도 누적
    pub fn sample_interval(
        &mut self,
        speed_mbps: f64,
        elapsed: Duration,
        at: DateTime<Utc>,
    ) -> Option<TelemetryReport> {
        let seconds = elapsed.as_secs_f64();
        if seconds <= 0.0 || !speed_mbps.is_finite() || speed_mbps < 0.0 {
            return None;
        }

        let bandwidth_mb = speed_mbps * seconds / BITS_PER_BYTE;
        self.bandwidth_shared += bandwidth_mb;

        Some(TelemetryReport {
            timestamp: at,
            speed_mbps,
            duration_seconds: seconds,
            bandwidth_mb,
        })
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            earnings: self.earnings,
            bandwidth_shared: self.bandwidth_shared,
            earnings_history: Some(self.history.into()),
            daily_goal: self.daily_goal,
        }
    }
}
