//! # Solitaire Engine
//!
//! 成语接龙的状态机。每次作答都在会话锁内按固定顺序判定：
//!
//! 1. 会话已结束 → `Canceled`
//! 2. 超过 TTL 未访问 → `Timeout`，会话被移除
//! 3. 答案不在词库或首字不匹配 → 记一次失误，达到上限时由机器人代接
//! 4. 答案正确 → 记分，轮数用尽则结算，否则机器人接下一个词

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dictionary::IdiomDictionary;
use crate::error::SolitaireResult;
use crate::session::{unix_now, GameSession, HitCount, SessionState, SessionStore};

/// 引擎参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 一局的最大轮数
    pub max_turn: u32,
    /// 连续失误多少次后由机器人代接，0 表示不代接
    pub max_miss: u32,
    /// 会话闲置超时
    pub ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turn: 5,
            max_miss: 3,
            ttl: Duration::from_secs(300),
        }
    }
}

/// 一次作答的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 答错了
    Failed,
    /// 连续答错，机器人代接了 `next`
    FailedToNext { next: String },
    /// 答对了，机器人接了 `next`
    Succeed { next: String },
    /// 答对了，但机器人接不上来，本局结束
    End,
    /// 答对了并且轮数用尽
    Completed,
    /// 会话超时
    Timeout,
    /// 会话已经结束
    Canceled,
    /// 连续答错，机器人代接后轮数用尽
    FailedAndCompleted { next: String },
    /// 连续答错，但当前成语已经没有可接的词
    Stalled,
}

impl Outcome {
    /// 本局是否因这次作答结束并需要结算排行
    pub fn is_settlement(&self) -> bool {
        matches!(
            self,
            Outcome::End
                | Outcome::Completed
                | Outcome::FailedAndCompleted { .. }
                | Outcome::Timeout
        )
    }
}

/// 作答结果和结算排行，非结算时 `ranking` 为空
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub ranking: Vec<HitCount>,
}

impl Verdict {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            ranking: Vec::new(),
        }
    }
}

/// 开局结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Started {
    /// 当前等待被接的成语
    pub phrase: String,
    /// 会话已经存在，本次只是继续
    pub resumed: bool,
}

pub struct SolitaireEngine {
    store: Arc<SessionStore>,
    dictionary: Arc<IdiomDictionary>,
    config: EngineConfig,
}

impl SolitaireEngine {
    pub fn new(store: Arc<SessionStore>, config: EngineConfig) -> Self {
        let dictionary = Arc::clone(store.dictionary());
        Self {
            store,
            dictionary,
            config,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn ttl_secs(&self) -> i64 {
        i64::try_from(self.config.ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// 开始或继续一局
    pub fn start(&self, key: &str) -> SolitaireResult<Started> {
        self.start_at(key, unix_now())
    }

    pub fn start_at(&self, key: &str, now: i64) -> SolitaireResult<Started> {
        loop {
            let (session, existed) = self.store.get_or_create_at(key, now)?;
            let mut state = session.lock();

            // 已结束或已过期、但还留在存储里的旧局作废后重新开局
            if existed && (state.finished || now - session.last_access() >= self.ttl_secs()) {
                state.finished = true;
                self.store.remove_session(&session);
                debug!(key, "Stale session replaced on start");
                continue;
            }

            session.touch(now);
            return Ok(Started {
                phrase: state.current_phrase.clone(),
                resumed: existed,
            });
        }
    }

    /// 退出并返回排行；没有进行中的游戏时返回 `None`
    pub fn exit(&self, key: &str) -> Option<Vec<HitCount>> {
        match self.store.delete_and_finish(key) {
            (Some(session), true) => {
                info!(key, "Game exited");
                Some(session.ranking())
            }
            _ => None,
        }
    }

    /// 对进行中的游戏作答；没有进行中的游戏时返回 `None`
    pub fn answer(&self, key: &str, answer: &str, participant: &str) -> Option<Verdict> {
        let session = self.store.get(key)?;
        Some(self.submit(&session, answer, participant))
    }

    pub fn submit(&self, session: &Arc<GameSession>, answer: &str, participant: &str) -> Verdict {
        self.submit_at(session, answer, participant, unix_now())
    }

    /// 在会话锁内完成一次判定
    pub fn submit_at(
        &self,
        session: &Arc<GameSession>,
        answer: &str,
        participant: &str,
        now: i64,
    ) -> Verdict {
        let mut state = session.lock();

        if state.finished {
            return Verdict::new(Outcome::Canceled);
        }

        if now - session.last_access() >= self.ttl_secs() {
            self.settle(session, &mut state);
            info!(key = session.key(), "Game timed out");
            return Verdict {
                outcome: Outcome::Timeout,
                ranking: state.ranking(),
            };
        }
        session.touch(now);

        let answer = answer.trim();
        if !self.dictionary.accepts(answer, state.last_unit) {
            return self.miss(session, &mut state);
        }

        state.turn_count += 1;
        state.miss_count = 0;
        state.record_hit(participant);

        if state.turn_count >= self.config.max_turn {
            self.settle(session, &mut state);
            return Verdict {
                outcome: Outcome::Completed,
                ranking: state.ranking(),
            };
        }

        match self.dictionary.next_continuable(answer) {
            Some((next, last_unit)) => {
                state.current_phrase = next.to_string();
                state.last_unit = last_unit;
                Verdict::new(Outcome::Succeed {
                    next: next.to_string(),
                })
            }
            None => {
                self.settle(session, &mut state);
                Verdict {
                    outcome: Outcome::End,
                    ranking: state.ranking(),
                }
            }
        }
    }

    fn miss(&self, session: &Arc<GameSession>, state: &mut SessionState) -> Verdict {
        state.miss_count += 1;

        if self.config.max_miss == 0 || state.miss_count < self.config.max_miss {
            return Verdict::new(Outcome::Failed);
        }

        let Some((next, last_unit)) = self.dictionary.next_continuable(&state.current_phrase)
        else {
            debug!(
                key = session.key(),
                phrase = %state.current_phrase,
                "No phrase to advance to"
            );
            return Verdict::new(Outcome::Stalled);
        };
        let next = next.to_string();

        state.turn_count += 1;
        state.miss_count = 0;
        state.current_phrase = next.clone();
        state.last_unit = last_unit;

        if state.turn_count >= self.config.max_turn {
            self.settle(session, state);
            Verdict {
                outcome: Outcome::FailedAndCompleted { next },
                ranking: state.ranking(),
            }
        } else {
            Verdict::new(Outcome::FailedToNext { next })
        }
    }

    /// 标记结束并从存储中移除（调用方持有会话锁）
    fn settle(&self, session: &Arc<GameSession>, state: &mut SessionState) {
        state.finished = true;
        self.store.remove_session(session);
    }

    /// 后台定期清理过期会话，取消后在下一次 tick 退出
    pub fn spawn_sweeper(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let ttl = self.ttl_secs();

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = store.sweep_expired(unix_now(), ttl);
                        if removed > 0 {
                            info!("Swept {} expired game sessions", removed);
                        }
                    }
                }
            }
        })
    }
}
