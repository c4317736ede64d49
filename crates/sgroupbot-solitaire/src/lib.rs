//! 成语接龙：词库、按会话隔离的游戏状态以及判定引擎

pub mod dictionary;
pub mod engine;
pub mod error;
pub mod session;

pub use dictionary::{Idiom, IdiomDictionary};
pub use engine::{EngineConfig, Outcome, SolitaireEngine, Started, Verdict};
pub use error::{SolitaireError, SolitaireResult};
pub use session::{unix_now, GameSession, HitCount, SessionSnapshot, SessionStore};
