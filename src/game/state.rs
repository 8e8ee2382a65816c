use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::board::{Board, Mark};
use super::history::{step_label, HistoryError, HistoryPolicy, MoveHistory};
use crate::ai::MoveTier;

/// 三种玩法：无历史的双人对局、带历史回溯的双人对局、人机对局。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    Basic,
    Tutorial,
    VersusComputer,
}

impl GameVariant {
    pub fn history_policy(self) -> HistoryPolicy {
        match self {
            GameVariant::Basic => HistoryPolicy::CurrentOnly,
            GameVariant::Tutorial => HistoryPolicy::AppendOnly,
            GameVariant::VersusComputer => HistoryPolicy::TruncateOnMove,
        }
    }

    pub fn has_history(self) -> bool {
        !matches!(self, GameVariant::Basic)
    }

    pub fn has_computer(self) -> bool {
        matches!(self, GameVariant::VersusComputer)
    }
}

impl Default for GameVariant {
    fn default() -> Self {
        GameVariant::VersusComputer
    }
}

impl FromStr for GameVariant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" | "simple" => Ok(GameVariant::Basic),
            "tutorial" | "history" => Ok(GameVariant::Tutorial),
            "versus_computer" | "computer" | "ai" => Ok(GameVariant::VersusComputer),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameConfig {
    #[serde(default)]
    pub variant: GameVariant,
    #[serde(default = "default_human")]
    pub human: Mark,
    #[serde(default = "default_computer")]
    pub computer: Mark,
}

fn default_human() -> Mark {
    Mark::X
}

fn default_computer() -> Mark {
    Mark::O
}

impl GameConfig {
    pub fn from_variant(variant: GameVariant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), IntegrityError> {
        if self.human == self.computer {
            return Err(IntegrityError::SameMarks { mark: self.human });
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            variant: GameVariant::default(),
            human: default_human(),
            computer: default_computer(),
        }
    }
}

/// 点击被忽略的原因。忽略的点击不改变任何状态。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClickRejection {
    GameFinished,
    CellOccupied { index: usize },
    OutOfRange { index: usize },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameOutcome {
    InProgress,
    Won { winner: Mark },
    Draw,
}

impl GameOutcome {
    pub fn of(board: &Board) -> Self {
        match board.winner() {
            Some(winner) => GameOutcome::Won { winner },
            None if board.is_full() => GameOutcome::Draw,
            None => GameOutcome::InProgress,
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, GameOutcome::InProgress)
    }
}

/// 状态变化事件流，供前端渲染或调试。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    MarkPlaced {
        index: usize,
        mark: Mark,
    },
    ComputerMoved {
        index: usize,
        mark: Mark,
        tier: MoveTier,
    },
    ClickIgnored {
        index: usize,
        reason: ClickRejection,
    },
    HistoryTruncated {
        dropped: usize,
    },
    StepSelected {
        step: usize,
    },
    GameWon {
        winner: Mark,
    },
    GameDrawn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    SameMarks { mark: Mark },
    History { error: HistoryError },
}

/// 一局游戏的完整状态：配置加上棋盘历史与游标。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GameState {
    #[serde(default)]
    pub config: GameConfig,
    #[serde(default)]
    pub history: MoveHistory,
}

impl GameState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            history: MoveHistory::new(),
        }
    }

    pub fn variant(&self) -> GameVariant {
        self.config.variant
    }

    pub fn current_board(&self) -> &Board {
        self.history.current()
    }

    pub fn step(&self) -> usize {
        self.history.cursor()
    }

    pub fn winner(&self) -> Option<Mark> {
        self.current_board().winner()
    }

    pub fn outcome(&self) -> GameOutcome {
        GameOutcome::of(self.current_board())
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_finished()
    }

    /// 当前棋盘上轮到落子的一方。
    ///
    /// 人机对局中总是人类方；双人对局由棋子数推出，X 先手。
    pub fn next_mark(&self) -> Mark {
        if self.variant().has_computer() {
            return self.config.human;
        }
        let board = self.current_board();
        if board.count(Mark::X) <= board.count(Mark::O) {
            Mark::X
        } else {
            Mark::O
        }
    }

    /// 状态栏文字。平局不单独提示。
    pub fn status(&self) -> String {
        if let Some(winner) = self.winner() {
            return format!("Winner: {winner}");
        }
        if self.variant().has_computer() {
            String::new()
        } else {
            format!("Next player: {}", self.next_mark())
        }
    }

    pub fn history_labels(&self) -> Vec<String> {
        if !self.variant().has_history() {
            return Vec::new();
        }
        (0..self.history.len()).map(step_label).collect()
    }

    pub fn reset(&mut self) {
        self.history = MoveHistory::new();
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        self.config.validate()?;
        self.history
            .integrity_check(self.variant().history_policy())
            .map_err(|error| IntegrityError::History { error })
    }
}
