use std::fmt;

use serde::{Deserialize, Serialize};

/// 棋盘格子数量。
pub const CELL_COUNT: usize = 9;

/// 全部 8 条连线：三行、三列、两条对角线，按固定顺序扫描。
pub const WINNING_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// 棋子标记。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn opponent(self) -> Mark {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个格子：`None` 表示空格。
pub type Cell = Option<Mark>;

/// 3x3 棋盘，按行优先存储（index = row * 3 + col）。
///
/// 序列化为长度为 9 的数组，元素为 `"X"`、`"O"` 或 `null`，
/// 与前端 squares 数组的形状一致。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn is_empty_at(&self, index: usize) -> bool {
        matches!(self.cells.get(index), Some(None))
    }

    /// 返回在 `index` 落下 `mark` 后的新棋盘，原棋盘保持不变。
    ///
    /// 越界或格子已被占用时返回 `None`，已落下的棋子不会被覆盖。
    pub fn with_mark(&self, index: usize, mark: Mark) -> Option<Board> {
        if !self.is_empty_at(index) {
            return None;
        }
        let mut next = *self;
        next.cells[index] = Some(mark);
        Some(next)
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(index, _)| index)
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.empty_cells().next()
    }

    pub fn count(&self, mark: Mark) -> usize {
        self.cells.iter().filter(|cell| **cell == Some(mark)).count()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn winner(&self) -> Option<Mark> {
        detect_winner(self)
    }

    /// 没有赢家且没有空格。
    pub fn is_draw(&self) -> bool {
        self.winner().is_none() && self.is_full()
    }

    /// X 与 O 互换后的棋盘。
    pub fn relabeled(&self) -> Board {
        let mut cells = self.cells;
        for cell in &mut cells {
            *cell = cell.map(Mark::opponent);
        }
        Board { cells }
    }

    /// 是否保留了 `earlier` 上的全部棋子（可以多出新落的棋子）。
    pub fn extends(&self, earlier: &Board) -> bool {
        earlier
            .cells
            .iter()
            .zip(self.cells.iter())
            .all(|(before, after)| before.is_none() || before == after)
    }

    pub fn line(&self, line: [usize; 3]) -> [Cell; 3] {
        line.map(|index| self.cells[index])
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, chunk) in self.cells.chunks(3).enumerate() {
            if row > 0 {
                writeln!(f)?;
            }
            for cell in chunk {
                let symbol = cell.map(Mark::as_str).unwrap_or(".");
                f.write_str(symbol)?;
            }
        }
        Ok(())
    }
}

/// 按固定顺序检查 8 条连线，返回第一条三子同色连线的标记。
///
/// 同时存在两条连线时（正常对局中不会出现）以先扫描到的为准。
pub fn detect_winner(board: &Board) -> Option<Mark> {
    WINNING_LINES.iter().find_map(|line| match board.line(*line) {
        [Some(a), Some(b), Some(c)] if a == b && b == c => Some(a),
        _ => None,
    })
}

/// 由 `"XO. ... ..."` 形式的字符串构造棋盘，空白被忽略，`X`/`O` 以外的字符为空格。
#[cfg(test)]
pub(crate) fn board_from_pattern(pattern: &str) -> Board {
    let mut cells = [None; CELL_COUNT];
    for (index, ch) in pattern.chars().filter(|c| !c.is_whitespace()).enumerate() {
        cells[index] = match ch {
            'X' => Some(Mark::X),
            'O' => Some(Mark::O),
            _ => None,
        };
    }
    Board::from_cells(cells)
}
