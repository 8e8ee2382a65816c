use serde::{Deserialize, Serialize};

use crate::game::{Board, Mark, WINNING_LINES};

/// 启发式选点命中的优先级层级，按声明顺序依次尝试。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveTier {
    /// 自己已有两子且第三格为空，直接取胜。
    WinNow,
    /// 对手已有两子且第三格为空，封堵。
    Block,
    /// 自己恰有一子且另两格为空，延伸连线。
    Extend,
    /// 以上均不满足时取编号最小的空格。
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    /// 电脑方使用的标记。
    pub own: Mark,
    /// 人类玩家使用的标记。
    pub opponent: Mark,
}

impl AiConfig {
    pub fn playing(own: Mark) -> Self {
        Self {
            own,
            opponent: own.opponent(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::playing(Mark::O)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<MoveTier>,
    pub mark: Mark,
}

/// 贪心启发式对手：不识别双活，也不保证不败。
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAgent {
    config: AiConfig,
}

impl HeuristicAgent {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> AiConfig {
        self.config
    }

    pub fn decide(&self, board: &Board) -> AiDecision {
        let choice = choose_move(board, self.config.own, self.config.opponent);
        AiDecision {
            index: choice.map(|(index, _)| index),
            tier: choice.map(|(_, tier)| tier),
            mark: self.config.own,
        }
    }
}

/// 以 O 为电脑方、X 为人类方计算下一步落点。
///
/// 调用方需保证棋盘未满且尚无赢家；棋盘已满时返回 `None`。
pub fn select_move(board: &Board) -> Option<usize> {
    HeuristicAgent::default().decide(board).index
}

pub fn choose_move(board: &Board, own: Mark, opponent: Mark) -> Option<(usize, MoveTier)> {
    completing_cell(board, own)
        .map(|index| (index, MoveTier::WinNow))
        .or_else(|| completing_cell(board, opponent).map(|index| (index, MoveTier::Block)))
        .or_else(|| extending_cell(board, own).map(|index| (index, MoveTier::Extend)))
        .or_else(|| board.first_empty().map(|index| (index, MoveTier::Fallback)))
}

/// 第一条 `mark` 占两格、剩余一格为空的连线中的空格。
fn completing_cell(board: &Board, mark: Mark) -> Option<usize> {
    let m = Some(mark);
    WINNING_LINES.iter().find_map(|&[a, b, c]| match board.line([a, b, c]) {
        [x, y, None] if x == m && y == m => Some(c),
        [x, None, z] if x == m && z == m => Some(b),
        [None, y, z] if y == m && z == m => Some(a),
        _ => None,
    })
}

/// 第一条 `mark` 恰占一格、另两格为空的连线中应落子的格子。
///
/// 子在首格时取末格，否则取首格。
fn extending_cell(board: &Board, mark: Mark) -> Option<usize> {
    let m = Some(mark);
    WINNING_LINES.iter().find_map(|&[a, b, c]| match board.line([a, b, c]) {
        [x, None, None] if x == m => Some(c),
        [None, y, None] if y == m => Some(a),
        [None, None, z] if z == m => Some(a),
        _ => None,
    })
}
