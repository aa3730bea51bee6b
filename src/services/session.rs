//! Session State Machine
//!
//! # State Diagram
//!
//! ```text
//!            connect                 ack(status=connecting)
//!   ┌──────┐ ───────▶ ┌────────────┐ ─────────────────────▶ ┌───────────┐
//!   │ Idle │          │ Connecting │                         │ Connected │◀─┐ poll ok / poll failure
//!   └──────┘ ◀─────── └────────────┘                         └───────────┘──┘
//!      ▲      failure                                          │ disconnect
//!      │                          ┌───────────────┐            │
//!      └───────────────────────── │ Disconnecting │ ◀──────────┘
//!        terminal request done    └───────────────┘
//! ```
//!
//! Every transition takes the current `SessionState` by value and returns the
//! next one; nothing here performs I/O or reads a clock. The controller owns
//! the single live value and feeds it the results of its requests.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::services::mining_client::{ConnectAck, MiningStatus};

/// 원래 클라이언트의 기본값
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_POLL_BACKOFF: Duration = Duration::from_millis(5000);
pub const DEFAULT_CHART_REFRESH: Duration = Duration::from_millis(5000);
/// raw capacity → Mbps 정규화 계수
pub const DEFAULT_BANDWIDTH_NORMALIZATION: f64 = 12_500.0;

pub const CONNECTING_TEXT: &str = "Establishing connection...";
pub const CONNECT_FAILED_TEXT: &str = "Connection failed";
pub const DISCONNECT_FAILED_TEXT: &str = "Disconnect failed";
pub const TASK_FAILED_TEXT: &str = "Task failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
}

/// 폴링 / 표시 파라미터
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollSettings {
    /// 성공 후 다음 폴링까지 (T_poll)
    pub poll_interval: Duration,
    /// 실패 후 재시도까지 (항상 poll_interval보다 큼)
    pub backoff: Duration,
    /// 차트 갱신 최소 간격
    pub chart_refresh: Duration,
    pub bandwidth_normalization: f64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff: DEFAULT_POLL_BACKOFF,
            chart_refresh: DEFAULT_CHART_REFRESH,
            bandwidth_normalization: DEFAULT_BANDWIDTH_NORMALIZATION,
        }
    }
}

/// 폴링 결과를 상태에 적용한 뒤 컨트롤러가 할 일
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Applied {
        /// 이번 응답에서 적립된 금액
        credited: Option<f64>,
        refresh_chart: bool,
        next_poll: Duration,
    },
    /// 상태 변화 없음, backoff 후 재시도
    Failed { retry_in: Duration },
    /// 이미 Connected가 아니거나 이전 세션의 응답 → 버림, 폴링 종료
    Stale,
}

impl PollOutcome {
    /// 다음 폴링까지 대기 시간 (None이면 루프 종료)
    pub fn next_delay(&self) -> Option<Duration> {
        match self {
            PollOutcome::Applied { next_poll, .. } => Some(*next_poll),
            PollOutcome::Failed { retry_in } => Some(*retry_in),
            PollOutcome::Stale => None,
        }
    }
}

/// 클라이언트 세션 상태 (저장되지 않음)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Connected 진입마다 증가. 폴링 결과는 같은 epoch일 때만 적용
    pub epoch: u64,
    /// Idle로 돌아가면 0
    pub session_earnings: f64,
    /// 연결 상태 문구 (예: "44% speed (0.50 Mbps unused)")
    pub status_text: String,
    /// 사용자에게 보여줄 에러 메시지
    pub message: Option<String>,
    pub speed_percent: Option<u32>,
    pub unused_mbps: Option<f64>,
    pub last_event_key: Option<String>,
    /// 컨트롤러 monotonic clock 기준 ms
    pub last_chart_refresh_ms: Option<u64>,
    pub chart_refreshes: u64,
    pub last_poll_failed: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            epoch: 0,
            session_earnings: 0.0,
            status_text: String::new(),
            message: None,
            speed_percent: None,
            unused_mbps: None,
            last_event_key: None,
            last_chart_refresh_ms: None,
            chart_refreshes: 0,
            last_poll_failed: false,
        }
    }
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        self.phase == SessionPhase::Connected
    }

    /// 상태 표시 라벨
    pub fn connection_label(&self) -> &'static str {
        match self.phase {
            SessionPhase::Connected => "CONNECTED",
            SessionPhase::Connecting => "CONNECTING",
            SessionPhase::Idle | SessionPhase::Disconnecting => "OFFLINE",
        }
    }

    pub fn earnings_display(&self) -> String {
        format!("{:.2} $DUB", self.session_earnings)
    }

    /// Idle → Connecting
    ///
    /// 다른 상태에서는 거부 (None). 중복 클릭은 no-op
    pub fn begin_connect(self) -> Option<Self> {
        if self.phase != SessionPhase::Idle {
            return None;
        }
        Some(Self {
            phase: SessionPhase::Connecting,
            status_text: CONNECTING_TEXT.to_string(),
            message: None,
            ..self
        })
    }

    /// Connecting → Connected (ack.status == "connecting") 또는 Idle
    pub fn connect_acknowledged(self, ack: &ConnectAck) -> Self {
        if self.phase != SessionPhase::Connecting {
            return self;
        }
        if !ack.is_connecting() {
            return self.connect_failed();
        }

        Self {
            phase: SessionPhase::Connected,
            epoch: self.epoch + 1,
            ..Self::idle_from(&self)
        }
    }

    /// Connecting → Idle (네트워크/파싱 에러). 자동 재시도 없음
    pub fn connect_failed(self) -> Self {
        if self.phase != SessionPhase::Connecting {
            return self;
        }
        Self {
            status_text: CONNECT_FAILED_TEXT.to_string(),
            message: Some(CONNECT_FAILED_TEXT.to_string()),
            ..Self::idle_from(&self)
        }
    }

    /// Connected → Disconnecting
    pub fn begin_disconnect(self) -> Option<Self> {
        if self.phase != SessionPhase::Connected {
            return None;
        }
        Some(Self {
            phase: SessionPhase::Disconnecting,
            ..self
        })
    }

    /// Disconnecting → Idle
    ///
    /// 종료 요청 성공 여부와 관계없이 세션 적립금 초기화
    pub fn disconnected(self) -> Self {
        if self.phase != SessionPhase::Disconnecting {
            return self;
        }
        Self::idle_from(&self)
    }

    /// Disconnecting → Idle (종료 요청 실패)
    ///
    /// 세션은 그대로 종료하고 메시지만 남김
    pub fn disconnect_failed(self) -> Self {
        if self.phase != SessionPhase::Disconnecting {
            return self;
        }
        Self {
            message: Some(DISCONNECT_FAILED_TEXT.to_string()),
            ..Self::idle_from(&self)
        }
    }

    /// 부스트 요청 실패. phase는 그대로
    pub fn task_failed(self) -> Self {
        Self {
            message: Some(TASK_FAILED_TEXT.to_string()),
            ..self
        }
    }

    /// 폴링 결과 적용
    ///
    /// - Connected가 아니거나 epoch가 다르면 Stale (상태 그대로)
    /// - 실패: 상태 유지, backoff 후 재시도
    /// - 성공 + is_mining: 표시값 갱신, 이벤트 금액 1회 적립, 차트 갱신 여부 판단
    pub fn on_poll(
        self,
        epoch: u64,
        result: &Result<MiningStatus, ClientError>,
        now_ms: u64,
        settings: &PollSettings,
    ) -> (Self, PollOutcome) {
        if self.phase != SessionPhase::Connected || epoch != self.epoch {
            return (self, PollOutcome::Stale);
        }

        let status = match result {
            Ok(status) => status,
            Err(_) => {
                let next = Self {
                    last_poll_failed: true,
                    ..self
                };
                return (
                    next,
                    PollOutcome::Failed {
                        retry_in: settings.backoff,
                    },
                );
            }
        };

        let mut next = Self {
            last_poll_failed: false,
            ..self
        };

        if !status.is_mining {
            return (
                next,
                PollOutcome::Applied {
                    credited: None,
                    refresh_chart: false,
                    next_poll: settings.poll_interval,
                },
            );
        }

        let pct = speed_percent(status.mining_speed);
        let mbps = unused_mbps(status.bandwidth.unused, settings.bandwidth_normalization);
        next.speed_percent = Some(pct);
        next.unused_mbps = Some(mbps);
        next.status_text = status_line(pct, mbps);

        let mut credited = None;
        if let Some(event) = &status.last_mining {
            let key = event.dedupe_key();
            let repeated = key.is_some() && key == next.last_event_key;
            match event.amount {
                Some(amount) if amount >= 0.0 && !repeated => {
                    next.session_earnings += amount;
                    next.last_event_key = key;
                    credited = Some(amount);
                }
                _ => {}
            }
        }

        let refresh_chart = chart_refresh_due(next.last_chart_refresh_ms, now_ms, settings.chart_refresh);
        if refresh_chart {
            next.last_chart_refresh_ms = Some(now_ms);
            next.chart_refreshes += 1;
        }

        (
            next,
            PollOutcome::Applied {
                credited,
                refresh_chart,
                next_poll: settings.poll_interval,
            },
        )
    }

    /// Idle 상태 (epoch, 차트 카운터만 유지)
    fn idle_from(prev: &Self) -> Self {
        Self {
            epoch: prev.epoch,
            chart_refreshes: prev.chart_refreshes,
            ..Self::default()
        }
    }
}

/// `round(miningSpeed * 100)`
pub fn speed_percent(mining_speed: f64) -> u32 {
    (mining_speed * 100.0).round().max(0.0) as u32
}

/// raw capacity / 정규화 계수, 소수 둘째 자리 반올림
pub fn unused_mbps(raw_unused: f64, normalization: f64) -> f64 {
    if normalization <= 0.0 {
        return 0.0;
    }
    (raw_unused / normalization * 100.0).round() / 100.0
}

pub fn status_line(speed_percent: u32, unused_mbps: f64) -> String {
    format!("{}% speed ({:.2} Mbps unused)", speed_percent, unused_mbps)
}

/// 별도 타이머 없이 성공한 폴링마다 판단
fn chart_refresh_due(last_ms: Option<u64>, now_ms: u64, min_interval: Duration) -> bool {
    match last_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= min_interval.as_millis() as u64,
    }
}
