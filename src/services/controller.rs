//! Session Controller
//!
//! Drives the client session against the simulation server:
//!
//! - owns the single live `SessionState` and publishes every change on a
//!   `watch` channel for the UI
//! - runs one polling task per connected session; the next poll is scheduled
//!   only after the previous one resolved, so at most one request is in flight
//! - results that arrive after the session left `Connected` are discarded by
//!   `SessionState::on_poll` (epoch check), never applied
//! - when bound to an account, pushes telemetry + snapshot every `sync_interval`
//!   and once more on disconnect

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::error::ClientError;
use crate::services::ledger::AccountLedger;
use crate::services::mining_client::{MiningApi, SyncApi};
use crate::services::session::{PollOutcome, PollSettings, SessionState};

/// 완료 가능한 부스트 태스크
pub const TASKS: [&str; 3] = ["extension", "telegram", "desktop"];

/// 계정 sync 바인딩
struct SyncBinding {
    api: Arc<dyn SyncApi>,
    interval: Duration,
    book: Mutex<SyncBook>,
}

struct SyncBook {
    ledger: AccountLedger,
    /// 마지막 sync 시각 (controller clock, ms). 세션 밖에서는 None
    last_sync_ms: Option<u64>,
}

pub struct SessionController {
    mining: Arc<dyn MiningApi>,
    settings: PollSettings,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionState>,
    origin: Instant,
    sync: Option<SyncBinding>,
    boosts: Mutex<BTreeSet<String>>,
}

impl SessionController {
    /// 계정 sync 없이 생성
    pub fn new(mining: Arc<dyn MiningApi>, settings: PollSettings) -> Arc<Self> {
        Arc::new(Self::build(mining, settings, None))
    }

    /// 계정에 바인딩해서 생성
    ///
    /// 서버 프로필을 한 번 읽어 ledger 초기화
    pub async fn with_sync(
        mining: Arc<dyn MiningApi>,
        settings: PollSettings,
        sync_api: Arc<dyn SyncApi>,
        user_id: &str,
        sync_interval: Duration,
    ) -> Result<Arc<Self>, ClientError> {
        let profile = sync_api.fetch_profile(user_id).await?;
        let ledger = AccountLedger::from_profile(&profile, Utc::now().date_naive());
        tracing::info!(
            user_id,
            earnings = ledger.earnings(),
            "Account ledger loaded"
        );

        let binding = SyncBinding {
            api: sync_api,
            interval: sync_interval,
            book: Mutex::new(SyncBook {
                ledger,
                last_sync_ms: None,
            }),
        };

        Ok(Arc::new(Self::build(mining, settings, Some(binding))))
    }

    fn build(mining: Arc<dyn MiningApi>, settings: PollSettings, sync: Option<SyncBinding>) -> Self {
        let initial = SessionState::default();
        let (updates, _) = watch::channel(initial.clone());

        Self {
            mining,
            settings,
            state: Mutex::new(initial),
            updates,
            origin: Instant::now(),
            sync,
            boosts: Mutex::new(BTreeSet::new()),
        }
    }

    /// 상태 변경 구독 (UI)
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    /// 현재 상태 복사본
    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// 바인딩된 계정의 현재 ledger
    pub async fn ledger(&self) -> Option<AccountLedger> {
        match &self.sync {
            Some(binding) => Some(binding.book.lock().await.ledger.clone()),
            None => None,
        }
    }

    pub async fn active_boosts(&self) -> Vec<String> {
        self.boosts.lock().await.iter().cloned().collect()
    }

    /// transition 함수 적용 후 바뀌었으면 publish
    async fn apply<T>(&self, transition: impl FnOnce(SessionState) -> (SessionState, T)) -> T {
        let mut current = self.state.lock().await;
        let (next, value) = transition(current.clone());
        if next != *current {
            *current = next.clone();
            self.updates.send_replace(next);
        }
        value
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    // ============ Connect / Disconnect ============

    /// Idle → Connecting → Connected, 폴링 시작
    ///
    /// Idle이 아니면 no-op. 실패 시 Idle + "Connection failed", 재시도 없음
    pub async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        let started = self
            .apply(|s| match s.clone().begin_connect() {
                Some(next) => (next, true),
                None => (s, false),
            })
            .await;
        if !started {
            tracing::debug!("Connect ignored, session is not idle");
            return Ok(());
        }

        tracing::info!("🔌 Connecting to mining server");

        let ack = match self.mining.connect().await {
            Ok(ack) => ack,
            Err(err) => {
                tracing::warn!(error = %err, "Connect request failed");
                self.apply(|s| (s.connect_failed(), ())).await;
                return Err(err);
            }
        };

        let connected = self
            .apply(|s| {
                let next = s.connect_acknowledged(&ack);
                let epoch = next.is_connected().then_some(next.epoch);
                (next, epoch)
            })
            .await;

        let Some(epoch) = connected else {
            tracing::warn!(status = %ack.status, "Unexpected connect acknowledgement");
            return Err(ClientError::UnexpectedAck(ack.status));
        };

        if let Some(binding) = &self.sync {
            binding.book.lock().await.last_sync_ms = Some(self.now_ms());
        }

        tracing::info!(epoch, "✅ Connected, polling every {:?}", self.settings.poll_interval);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.poll_loop(epoch).await });

        Ok(())
    }

    /// Connected → Disconnecting → Idle
    ///
    /// 종료 요청 1회 후 결과와 관계없이 세션 적립금 초기화.
    /// 요청이 실패하면 state.message에 표시.
    /// 진행 중인 폴링은 취소하지 않음 (도착하면 버려짐)
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let started = self
            .apply(|s| match s.clone().begin_disconnect() {
                Some(next) => (next, true),
                None => (s, false),
            })
            .await;
        if !started {
            return Ok(());
        }

        let result = self.mining.disconnect().await;
        if let Err(err) = &result {
            tracing::warn!(error = %err, "Disconnect request failed");
        }

        if let Some(binding) = &self.sync {
            let unused = self.state().await.unused_mbps;
            self.sync_now(binding, unused, self.now_ms()).await;
            binding.book.lock().await.last_sync_ms = None;
        }

        let failed = result.is_err();
        self.apply(|s| {
            let next = if failed {
                s.disconnect_failed()
            } else {
                s.disconnected()
            };
            (next, ())
        })
        .await;
        tracing::info!("🔌 Disconnected");

        result
    }

    // ============ Polling ============

    async fn poll_loop(self: Arc<Self>, epoch: u64) {
        loop {
            let result = self.mining.status().await;
            if let Err(err) = &result {
                tracing::warn!(epoch, error = %err, "Status poll failed, backing off");
            }

            let now_ms = self.now_ms();
            let settings = self.settings;
            let (outcome, unused_mbps) = self
                .apply(|s| {
                    let (next, outcome) = s.on_poll(epoch, &result, now_ms, &settings);
                    let unused = next.unused_mbps;
                    (next, (outcome, unused))
                })
                .await;

            let Some(delay) = outcome.next_delay() else {
                tracing::debug!(epoch, "Discarded poll result for finished session");
                break;
            };

            if let PollOutcome::Applied {
                credited,
                refresh_chart,
                ..
            } = outcome
            {
                if refresh_chart {
                    tracing::debug!(epoch, "Chart refresh");
                }
                self.after_poll(credited, unused_mbps, now_ms).await;
            }

            tokio::time::sleep(delay).await;

            if !self.is_current(epoch).await {
                break;
            }
        }

        tracing::info!(epoch, "Polling stopped");
    }

    async fn is_current(&self, epoch: u64) -> bool {
        let state = self.state.lock().await;
        state.is_connected() && state.epoch == epoch
    }

    /// 적립 반영 + sync 주기 확인 (별도 타이머 없음)
    async fn after_poll(&self, credited: Option<f64>, unused_mbps: Option<f64>, now_ms: u64) {
        let Some(binding) = &self.sync else {
            return;
        };

        let due = {
            let mut book = binding.book.lock().await;
            if let Some(amount) = credited {
                book.ledger.credit(amount, Utc::now().date_naive());
            }
            book.last_sync_ms.map_or(false, |last| {
                now_ms.saturating_sub(last) >= binding.interval.as_millis() as u64
            })
        };

        if due {
            self.sync_now(binding, unused_mbps, now_ms).await;
        }
    }

    /// 텔레메트리 샘플 + snapshot 전송
    ///
    /// 실패해도 세션 상태는 그대로. snapshot은 전체 값이므로 다음 주기에 자연히 재전송
    async fn sync_now(&self, binding: &SyncBinding, unused_mbps: Option<f64>, now_ms: u64) {
        let (user_id, report, snapshot) = {
            let mut book = binding.book.lock().await;
            let elapsed = book
                .last_sync_ms
                .map(|last| Duration::from_millis(now_ms.saturating_sub(last)))
                .unwrap_or_default();
            book.last_sync_ms = Some(now_ms);

            let report = book
                .ledger
                .sample_interval(unused_mbps.unwrap_or(0.0), elapsed, Utc::now());
            (book.ledger.user_id().to_string(), report, book.ledger.snapshot())
        };

        if let Some(report) = report {
            if let Err(err) = binding.api.push_telemetry(&user_id, &report).await {
                tracing::warn!(user_id = %user_id, error = %err, "Telemetry push failed");
            }
        }

        match binding.api.push_snapshot(&user_id, &snapshot).await {
            Ok(()) => tracing::debug!(user_id = %user_id, earnings = snapshot.earnings, "Snapshot synced"),
            Err(err) => tracing::warn!(user_id = %user_id, error = %err, "Snapshot sync failed"),
        }
    }

    // ============ Tasks ============

    /// 부스트 태스크 완료
    ///
    /// 이미 완료됐거나 요청 중인 태스크는 다시 요청하지 않음 (Ok(None)).
    /// 요청 전에 예약하고, 실패하면 예약 해제 후 state.message에 표시
    pub async fn complete_task(&self, task: &str) -> Result<Option<String>, ClientError> {
        if !self.boosts.lock().await.insert(task.to_string()) {
            return Ok(None);
        }

        match self.mining.complete_task(task).await {
            Ok(message) => {
                tracing::info!(task, "Task completed");
                Ok(Some(message))
            }
            Err(err) => {
                self.boosts.lock().await.remove(task);
                tracing::warn!(task, error = %err, "Task request failed");
                self.apply(|s| (s.task_failed(), ())).await;
                Err(err)
            }
        }
    }
}
