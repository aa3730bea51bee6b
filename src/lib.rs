//! DUB Share API Library
//!
//! # Overview
//!
//! 대역폭 공유 보상(DUB) 계정 서비스와 그 세션 클라이언트.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐   /connect /status    ┌─────────────────────┐
//! │  SessionController   │ ────────────────────▶ │ Simulation server   │
//! │  (dub-client)        │                       └─────────────────────┘
//! │                      │   /api/user/:id/*     ┌─────────────────────┐
//! │  SessionState        │ ────────────────────▶ │ dub-share-api       │
//! │  AccountLedger       │                       │  Routes → Services  │
//! └──────────────────────┘                       │  → AccountStore     │
//!                                                └──────────┬──────────┘
//!                                                           ▼
//!                                                 PostgreSQL / in-memory
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리 (서버 / 클라이언트)
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 계정 로직, 세션 상태 머신, HTTP 클라이언트
//! - `db`: AccountStore (Postgres / 메모리)
//! - `types`: 공통 wire 타입
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dub_share_api::{db::MemoryStore, routes, services::{AccountService, RandomIds}, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let accounts = AccountService::new(Arc::new(MemoryStore::new()), Arc::new(RandomIds));
//!     let app = routes::create_router(AppState::new(accounts, config));
//!
//!     // ... 서버 시작
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::{ClientConfig, Config};
pub use db::{AccountStore, Database, MemoryStore};
pub use error::{ApiError, ClientError};
pub use services::{AccountService, SessionController};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(accounts: AccountService, config: Config) -> Self {
        Self {
            accounts: Arc::new(accounts),
            config: Arc::new(config),
        }
    }
}
