//! # Session Store
//!
//! 按会话 key（群、用户或子频道）保存成语接龙的游戏状态。
//!
//! - 存储本身使用分片的 `DashMap`，不同会话之间互不阻塞
//! - 每个会话自带一把互斥锁，同一会话的状态变更串行执行
//! - `last_access` 是原子变量，过期扫描无需持有会话锁即可读取；
//!   这是唯一在锁外读写的字段，扫描结果只是近似值，最终由引擎在锁内复核

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::dictionary::IdiomDictionary;
use crate::error::{SolitaireError, SolitaireResult};

/// 当前 unix 时间（秒）
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// 参与者的接龙成功次数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitCount {
    pub participant: String,
    pub count: u32,
}

/// 受会话锁保护的状态
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) current_phrase: String,
    pub(crate) last_unit: char,
    pub(crate) miss_count: u32,
    pub(crate) turn_count: u32,
    /// 按首次答对的先后顺序排列
    pub(crate) hits: Vec<HitCount>,
    pub(crate) finished: bool,
}

impl SessionState {
    pub(crate) fn record_hit(&mut self, participant: &str) {
        match self.hits.iter_mut().find(|h| h.participant == participant) {
            Some(hit) => hit.count += 1,
            None => self.hits.push(HitCount {
                participant: participant.to_string(),
                count: 1,
            }),
        }
    }

    /// 按次数降序；次数相同时先答对的排在前面（稳定排序保留首次命中顺序）
    pub(crate) fn ranking(&self) -> Vec<HitCount> {
        let mut ranking = self.hits.clone();
        ranking.sort_by(|a, b| b.count.cmp(&a.count));
        ranking
    }
}

/// 一局成语接龙
#[derive(Debug)]
pub struct GameSession {
    key: String,
    last_access: AtomicI64,
    state: Mutex<SessionState>,
}

/// 会话状态快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub key: String,
    pub current_phrase: String,
    pub last_unit: char,
    pub miss_count: u32,
    pub turn_count: u32,
    pub last_access: i64,
    pub finished: bool,
}

impl GameSession {
    fn new(key: &str, phrase: &str, last_unit: char, now: i64) -> Self {
        Self {
            key: key.to_string(),
            last_access: AtomicI64::new(now),
            state: Mutex::new(SessionState {
                current_phrase: phrase.to_string(),
                last_unit,
                miss_count: 0,
                turn_count: 0,
                hits: Vec::new(),
                finished: false,
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// 上次访问时间，不加锁读取
    pub fn last_access(&self) -> i64 {
        self.last_access.load(Ordering::Acquire)
    }

    pub(crate) fn touch(&self, now: i64) {
        self.last_access.store(now, Ordering::Release);
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    /// 当前等待被接的成语
    pub fn current_phrase(&self) -> String {
        self.lock().current_phrase.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// 在会话锁内标记结束
    pub fn finish(&self) {
        self.lock().finished = true;
    }

    /// 结算排行
    pub fn ranking(&self) -> Vec<HitCount> {
        self.lock().ranking()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            key: self.key.clone(),
            current_phrase: state.current_phrase.clone(),
            last_unit: state.last_unit,
            miss_count: state.miss_count,
            turn_count: state.turn_count,
            last_access: self.last_access(),
            finished: state.finished,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_phrase(&self, phrase: &str, last_unit: char) {
        let mut state = self.lock();
        state.current_phrase = phrase.to_string();
        state.last_unit = last_unit;
    }
}

/// 会话存储
#[derive(Debug)]
pub struct SessionStore {
    dictionary: Arc<IdiomDictionary>,
    sessions: DashMap<String, Arc<GameSession>>,
}

impl SessionStore {
    pub fn new(dictionary: Arc<IdiomDictionary>) -> Self {
        Self {
            dictionary,
            sessions: DashMap::new(),
        }
    }

    /// 获取或创建会话，返回值第二项表示会话是否已经存在
    pub fn get_or_create(&self, key: &str) -> SolitaireResult<(Arc<GameSession>, bool)> {
        self.get_or_create_at(key, unix_now())
    }

    /// 同 [`get_or_create`](Self::get_or_create)，显式指定当前时间
    pub fn get_or_create_at(
        &self,
        key: &str,
        now: i64,
    ) -> SolitaireResult<(Arc<GameSession>, bool)> {
        match self.sessions.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok((Arc::clone(entry.get()), true)),
            Entry::Vacant(entry) => {
                let (phrase, last_unit) = self
                    .dictionary
                    .random_starter()
                    .ok_or(SolitaireError::NoContinuablePhrase)?;
                let session = Arc::new(GameSession::new(key, phrase, last_unit, now));
                entry.insert(Arc::clone(&session));
                debug!(key, phrase, "Game session created");
                Ok((session, false))
            }
        }
    }

    /// 查找会话，不会创建
    pub fn get(&self, key: &str) -> Option<Arc<GameSession>> {
        self.sessions.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// 删除会话并标记结束，重复调用时返回 `(None, false)`
    pub fn delete_and_finish(&self, key: &str) -> (Option<Arc<GameSession>>, bool) {
        match self.sessions.remove(key) {
            Some((_, session)) => {
                session.finish();
                (Some(session), true)
            }
            None => (None, false),
        }
    }

    /// 仅当 key 仍指向这个会话时才删除，避免误删同 key 的新一局
    pub(crate) fn remove_session(&self, session: &Arc<GameSession>) -> bool {
        self.sessions
            .remove_if(session.key(), |_, current| Arc::ptr_eq(current, session))
            .is_some()
    }

    /// 清理过期会话，返回清理数量
    pub fn sweep_expired(&self, now: i64, ttl_secs: i64) -> usize {
        let is_expired = |session: &GameSession| now - session.last_access() >= ttl_secs;

        let expired: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| is_expired(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut removed = 0;
        for key in expired {
            if let Some((_, session)) = self
                .sessions
                .remove_if(&key, |_, session| is_expired(session))
            {
                session.finish();
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn dictionary(&self) -> &Arc<IdiomDictionary> {
        &self.dictionary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(phrases: &[&str]) -> SessionStore {
        SessionStore::new(Arc::new(IdiomDictionary::from_phrases(phrases.iter().copied())))
    }

    #[test]
    fn test_get_or_create_seeds_continuable_phrase() {
        let store = store(&[
            "一心一意", "意气风发", "发愤图强", "强人所难", "难能可贵", "贵在坚持", "马到成功",
        ]);
        let dictionary = Arc::clone(store.dictionary());

        for i in 0..50 {
            let (session, existed) = store.get_or_create_at(&format!("group-{}", i), 100).unwrap();
            assert!(!existed);
            let snapshot = session.snapshot();
            assert_eq!(dictionary.last_unit(&snapshot.current_phrase), Some(snapshot.last_unit));
            assert!(!dictionary.starting_with(snapshot.last_unit).is_empty());
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn test_get_or_create_returns_existing() {
        let store = store(&["一心一意", "意气风发"]);
        let (first, existed) = store.get_or_create_at("g", 100).unwrap();
        assert!(!existed);
        let (second, existed) = store.get_or_create_at("g", 200).unwrap();
        assert!(existed);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.last_access(), 100);
    }

    #[test]
    fn test_get_or_create_without_starter_fails() {
        let store = store(&[]);
        assert!(matches!(
            store.get_or_create("g"),
            Err(SolitaireError::NoContinuablePhrase)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_starts_share_one_session() {
        let store = Arc::new(store(&["一心一意", "意气风发", "发愤图强", "强人所难"]));
        let sessions: Vec<Arc<GameSession>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || store.get_or_create_at("shared", 1).unwrap().0)
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(store.len(), 1);
        assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_delete_and_finish_is_idempotent() {
        let store = store(&["一心一意", "意气风发"]);
        let (session, _) = store.get_or_create("g").unwrap();

        let (removed, existed) = store.delete_and_finish("g");
        assert!(existed);
        assert!(removed.is_some());
        assert!(session.is_finished());
        assert!(store.get("g").is_none());

        let (removed, existed) = store.delete_and_finish("g");
        assert!(!existed);
        assert!(removed.is_none());
    }

    #[test]
    fn test_sweep_expired_removes_only_stale_sessions() {
        let store = store(&["一心一意", "意气风发"]);
        let (stale, _) = store.get_or_create_at("stale", 100).unwrap();
        let (fresh, _) = store.get_or_create_at("fresh", 150).unwrap();

        assert_eq!(store.sweep_expired(160, 60), 1);
        assert!(!store.contains("stale"));
        assert!(store.contains("fresh"));
        assert!(stale.is_finished());
        assert!(!fresh.is_finished());

        assert_eq!(store.sweep_expired(160, 60), 0);
    }

    #[test]
    fn test_remove_session_ignores_newer_game_under_same_key() {
        let store = store(&["一心一意", "意气风发"]);
        let (old, _) = store.get_or_create_at("g", 1).unwrap();
        store.delete_and_finish("g");
        let (new, _) = store.get_or_create_at("g", 2).unwrap();

        assert!(!store.remove_session(&old));
        assert!(store.contains("g"));
        assert!(store.remove_session(&new));
        assert!(store.is_empty());
    }

    #[test]
    fn test_ranking_breaks_ties_by_first_hit() {
        let store = store(&["一心一意", "意气风发"]);
        let (session, _) = store.get_or_create("g").unwrap();
        {
            let mut state = session.lock();
            for participant in ["B", "C", "A", "B", "C", "A", "B", "C", "B", "C", "B", "C"] {
                state.record_hit(participant);
            }
        }

        let ranking = session.ranking();
        let summary: Vec<(&str, u32)> = ranking
            .iter()
            .map(|h| (h.participant.as_str(), h.count))
            .collect();
        assert_eq!(summary, vec![("B", 5), ("C", 5), ("A", 2)]);
    }
}
