//! Configuration Module
//!
//! # Interview Q&A
//!
//! Q: 환경변수 vs 설정 파일, 어떤 방식을 선택했고 왜인가?
//! A: 환경변수 (+ `.env`는 dotenvy로 로드)
//!    - 서버와 터미널 클라이언트가 같은 방식으로 설정됨
//!    - 관리자 비밀번호 등 민감 정보를 코드에 포함하지 않음
//!
//! Q: 설정 검증은 어떻게 하는가?
//! A: from_env()에서 파싱 / 범위 검증 → 실패하면 시작하지 않음 (fail-fast)
//!    - 예: backoff가 poll 간격보다 길지 않으면 거부

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::services::{
    PollSettings, DEFAULT_BANDWIDTH_NORMALIZATION, DEFAULT_CHART_REFRESH, DEFAULT_POLL_BACKOFF,
    DEFAULT_POLL_INTERVAL,
};

/// 계정 sync 기본 주기
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(30_000);

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 서버 포트 (기본값: 3000)
    pub port: u16,

    /// PostgreSQL 연결 문자열
    /// 없으면 in-memory store 사용 (재시작 시 데이터 유실)
    pub database_url: Option<String>,

    /// 환경 (development, staging, production)
    pub environment: Environment,

    /// 프로덕션 CORS 허용 origin 목록
    pub allowed_origins: Vec<String>,

    /// 시작 시 생성할 관리자 계정
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "production" => Environment::Production,
            "staging" => Environment::Staging,
            _ => Environment::Development,
        }
    }
}

impl Config {
    /// 환경변수에서 설정 로드
    ///
    /// # Optional Environment Variables
    ///
    /// - `PORT`: 서버 포트 (기본값: 3000)
    /// - `DATABASE_URL`: PostgreSQL 연결 문자열
    /// - `ENVIRONMENT`: development | staging | production
    /// - `ALLOWED_ORIGINS`: 콤마 구분 origin 목록
    /// - `ADMIN_EMAIL`, `ADMIN_PASSWORD`: 관리자 시드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let environment = Environment::parse(
            &lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        );

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Config {
            port: lookup("PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("PORT must be a valid number")?,

            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),

            environment,
            allowed_origins,

            admin_email: lookup("ADMIN_EMAIL").filter(|s| !s.trim().is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|s| !s.is_empty()),
        })
    }

    /// 프로덕션 환경인지 확인
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// 관리자 시드 정보 (둘 다 있을 때만)
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}

/// 터미널 클라이언트 설정
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 시뮬레이션 서버
    pub mining_api_url: String,
    /// 이 크레이트의 계정 API
    pub account_api_url: String,
    /// 없으면 sync 없이 세션만 진행
    pub user_id: Option<String>,
    pub poll_interval: Duration,
    pub poll_backoff: Duration,
    pub chart_refresh: Duration,
    pub sync_interval: Duration,
    pub bandwidth_normalization: f64,
}

impl ClientConfig {
    /// # Optional Environment Variables
    ///
    /// - `MINING_API_URL` (기본값: http://localhost:5000)
    /// - `ACCOUNT_API_URL` (기본값: http://localhost:3000)
    /// - `DUB_USER_ID`
    /// - `POLL_INTERVAL_MS`, `POLL_BACKOFF_MS`, `CHART_REFRESH_MS`, `SYNC_INTERVAL_MS`
    /// - `BANDWIDTH_NORMALIZATION` (기본값: 12500)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{} must be a number of milliseconds", key)),
                None => Ok(default),
            }
        };

        let config = ClientConfig {
            mining_api_url: lookup("MINING_API_URL")
                .unwrap_or_else(|| "http://localhost:5000".to_string()),
            account_api_url: lookup("ACCOUNT_API_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            user_id: lookup("DUB_USER_ID").filter(|s| !s.trim().is_empty()),
            poll_interval: millis("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL)?,
            poll_backoff: millis("POLL_BACKOFF_MS", DEFAULT_POLL_BACKOFF)?,
            chart_refresh: millis("CHART_REFRESH_MS", DEFAULT_CHART_REFRESH)?,
            sync_interval: millis("SYNC_INTERVAL_MS", DEFAULT_SYNC_INTERVAL)?,
            bandwidth_normalization: match lookup("BANDWIDTH_NORMALIZATION") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .context("BANDWIDTH_NORMALIZATION must be a number")?,
                None => DEFAULT_BANDWIDTH_NORMALIZATION,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("POLL_INTERVAL_MS must be greater than zero");
        }
        if self.poll_backoff <= self.poll_interval {
            bail!(
                "POLL_BACKOFF_MS ({:?}) must be longer than POLL_INTERVAL_MS ({:?})",
                self.poll_backoff,
                self.poll_interval
            );
        }
        if !(self.bandwidth_normalization.is_finite() && self.bandwidth_normalization > 0.0) {
            bail!("BANDWIDTH_NORMALIZATION must be a positive number");
        }
        Ok(())
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            poll_interval: self.poll_interval,
            backoff: self.poll_backoff,
            chart_refresh: self.chart_refresh,
            bandwidth_normalization: self.bandwidth_normalization,
        }
    }
}
