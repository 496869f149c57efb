//! 对手 AI：候选池过滤与强制进化。

pub mod rival;

pub use rival::{RivalAgent, RivalDecision, RIVAL_FORCED_EVOLUTION_TURN};
