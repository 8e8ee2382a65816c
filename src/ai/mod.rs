//! 电脑对手的启发式选点。

pub mod heuristic;

pub use heuristic::{choose_move, select_move, AiConfig, AiDecision, HeuristicAgent, MoveTier};
