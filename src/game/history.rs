use serde::{Deserialize, Serialize};

use super::board::Board;

/// 新一步落子时如何处理游标之后的历史。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// 只保留当前棋盘。
    CurrentOnly,
    /// 只追加，游标之后的记录保留。
    AppendOnly,
    /// 先截断游标之后的记录再追加。
    TruncateOnMove,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum HistoryError {
    Empty,
    CursorOutOfRange { cursor: usize, len: usize },
    StartNotEmpty,
    MarksCleared { step: usize },
}

/// 每回合一个棋盘快照的历史，第 0 项总是空棋盘。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoveHistory {
    entries: Vec<Board>,
    cursor: usize,
}

impl MoveHistory {
    pub fn new() -> Self {
        Self {
            entries: vec![Board::empty()],
            cursor: 0,
        }
    }

    pub fn entries(&self) -> &[Board] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_at_latest(&self) -> bool {
        self.cursor + 1 == self.entries.len()
    }

    pub fn current(&self) -> &Board {
        &self.entries[self.cursor]
    }

    pub fn get(&self, step: usize) -> Option<&Board> {
        self.entries.get(step)
    }

    /// 移动游标，不修改任何记录。越界时返回 `false`。
    pub fn jump_to(&mut self, step: usize) -> bool {
        if step >= self.entries.len() {
            return false;
        }
        self.cursor = step;
        true
    }

    /// 按策略记录新棋盘并把游标移到新记录上，返回被丢弃的记录数。
    pub fn record(&mut self, board: Board, policy: HistoryPolicy) -> usize {
        match policy {
            HistoryPolicy::CurrentOnly => {
                let dropped = self.entries.len();
                self.entries.clear();
                self.entries.push(board);
                self.cursor = 0;
                dropped
            }
            HistoryPolicy::AppendOnly => {
                self.entries.push(board);
                self.cursor = self.entries.len() - 1;
                0
            }
            HistoryPolicy::TruncateOnMove => {
                let keep = self.cursor + 1;
                let dropped = self.entries.len().saturating_sub(keep);
                self.entries.truncate(keep);
                self.entries.push(board);
                self.cursor = self.entries.len() - 1;
                dropped
            }
        }
    }

    /// 从外部（JSON）恢复的历史需要满足的结构约束。
    ///
    /// 只保留当前棋盘时不检查起点与落子顺序；其余策略下第 0 项必须为空棋盘，
    /// 且每一项都保留其前驱上的全部棋子。追加策略的前驱可以是任一更早的记录，
    /// 截断策略的前驱必须是上一项。
    pub fn integrity_check(&self, policy: HistoryPolicy) -> Result<(), HistoryError> {
        let first = self.entries.first().ok_or(HistoryError::Empty)?;
        if self.cursor >= self.entries.len() {
            return Err(HistoryError::CursorOutOfRange {
                cursor: self.cursor,
                len: self.entries.len(),
            });
        }
        if policy == HistoryPolicy::CurrentOnly {
            return Ok(());
        }
        if *first != Board::empty() {
            return Err(HistoryError::StartNotEmpty);
        }
        for (step, board) in self.entries.iter().enumerate().skip(1) {
            let keeps_marks = match policy {
                HistoryPolicy::TruncateOnMove => board.extends(&self.entries[step - 1]),
                _ => self.entries[..step]
                    .iter()
                    .any(|earlier| board.extends(earlier)),
            };
            if !keeps_marks {
                return Err(HistoryError::MarksCleared { step });
            }
        }
        Ok(())
    }
}

impl Default for MoveHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// 历史列表按钮上的文字。
pub fn step_label(step: usize) -> String {
    if step == 0 {
        "Go to game start".to_string()
    } else {
        format!("Go to move #{step}")
    }
}
