//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `AccountService`: 계정 / sync / referral / 텔레메트리 (서버)
//! - `IdGenerator`: userId, referralCode, referralId 발급
//! - `SessionController`: connect → poll → disconnect (클라이언트)
//! - `SessionState`: 순수 상태 전이 함수
//! - `AccountLedger`: 클라이언트 측 누적값 + snapshot
//! - `MiningApi` / `SyncApi`: 외부 HTTP 경계

mod accounts;
mod controller;
mod ids;
mod ledger;
mod mining_client;
mod session;

pub use accounts::{AccountService, HistoryUpdate, MIN_PASSWORD_LEN};
pub use controller::{SessionController, TASKS};
pub use ids::{is_valid_referral_code, IdGenerator, RandomIds};
pub use ledger::AccountLedger;
pub use mining_client::{
    BandwidthReport, ConnectAck, HttpAccountClient, HttpMiningClient, MiningApi, MiningEvent,
    MiningStatus, SyncApi,
};
pub use session::{
    speed_percent, status_line, unused_mbps, PollOutcome, PollSettings, SessionPhase,
    SessionState, CONNECTING_TEXT, CONNECT_FAILED_TEXT, DEFAULT_BANDWIDTH_NORMALIZATION,
    DEFAULT_CHART_REFRESH, DEFAULT_POLL_BACKOFF, DEFAULT_POLL_INTERVAL, DISCONNECT_FAILED_TEXT,
    TASK_FAILED_TEXT,
};
