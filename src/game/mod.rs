//! 游戏核心逻辑模块（棋盘、历史、回合规则）。

pub mod board;
pub mod history;
pub mod rules;
pub mod state;

pub use board::{detect_winner, Board, Cell, Mark, CELL_COUNT, WINNING_LINES};
pub use history::{step_label, HistoryError, HistoryPolicy, MoveHistory};
pub use rules::{RuleEngine, RuleError, RuleResolution};
pub use state::{
    ClickRejection,
    GameConfig,
    GameEvent,
    GameOutcome,
    GameState,
    GameVariant,
    IntegrityError,
};
