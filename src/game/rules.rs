use serde::{Deserialize, Serialize};

use super::{
    board::CELL_COUNT,
    state::{ClickRejection, GameEvent, GameOutcome, GameState, IntegrityError},
};
use crate::ai::{AiConfig, HeuristicAgent};
use crate::utils;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    HistoryUnavailable,
    StepOutOfRange { step: usize, len: usize },
    InvalidState { message: String },
    IntegrityViolation { error: IntegrityError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub accepted: bool,
    pub events: Vec<GameEvent>,
    pub outcome: GameOutcome,
    pub status: String,
}

impl RuleResolution {
    pub fn new(state: GameState, accepted: bool, mut events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome();
        if accepted {
            let has_event = events.iter().any(|event| {
                matches!(event, GameEvent::GameWon { .. } | GameEvent::GameDrawn)
            });
            if !has_event {
                match outcome {
                    GameOutcome::Won { winner } => events.push(GameEvent::GameWon { winner }),
                    GameOutcome::Draw => events.push(GameEvent::GameDrawn),
                    GameOutcome::InProgress => {}
                }
            }
        }
        let status = state.status();

        Self {
            state,
            accepted,
            events,
            outcome,
            status,
        }
    }

    /// 只移动游标或重开时使用：棋盘没有新落子，不再补发胜负事件。
    pub fn navigated(state: GameState, events: Vec<GameEvent>) -> Self {
        let outcome = state.outcome();
        let status = state.status();
        Self {
            state,
            accepted: true,
            events,
            outcome,
            status,
        }
    }

    fn ignored(state: &GameState, index: usize, reason: ClickRejection) -> Self {
        utils::warn(&format!("click on cell {index} ignored: {reason:?}"));
        Self::new(
            state.clone(),
            false,
            vec![GameEvent::ClickIgnored { index, reason }],
        )
    }
}

/// 回合控制：接收格子点击，生成下一个状态。
///
/// 所有操作都以写时复制方式进行，传入的状态不会被修改。
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    fn ensure_integrity(state: &GameState) -> Result<(), RuleError> {
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn check_click(state: &GameState, index: usize) -> Result<(), ClickRejection> {
        if index >= CELL_COUNT {
            return Err(ClickRejection::OutOfRange { index });
        }
        if state.winner().is_some() {
            return Err(ClickRejection::GameFinished);
        }
        if !state.current_board().is_empty_at(index) {
            return Err(ClickRejection::CellOccupied { index });
        }
        Ok(())
    }

    pub fn handle_click(&self, state: &GameState, index: usize) -> RuleResolution {
        if let Err(reason) = Self::check_click(state, index) {
            return RuleResolution::ignored(state, index, reason);
        }

        let mark = state.next_mark();
        let mut board = match state.current_board().with_mark(index, mark) {
            Some(board) => board,
            None => {
                return RuleResolution::ignored(state, index, ClickRejection::CellOccupied { index })
            }
        };
        let mut events = vec![GameEvent::MarkPlaced { index, mark }];

        if state.variant().has_computer() && board.winner().is_none() {
            let agent = HeuristicAgent::new(AiConfig {
                own: state.config.computer,
                opponent: state.config.human,
            });
            let decision = agent.decide(&board);
            // 棋盘已满时没有可下的格子
            let reply = decision.index.zip(decision.tier).and_then(|(cell, tier)| {
                board
                    .with_mark(cell, decision.mark)
                    .map(|next| (cell, tier, next))
            });
            if let Some((cell, tier, next)) = reply {
                utils::log(&format!(
                    "computer plays {} at cell {cell} ({tier:?})",
                    decision.mark
                ));
                board = next;
                events.push(GameEvent::ComputerMoved {
                    index: cell,
                    mark: decision.mark,
                    tier,
                });
            }
        }

        let mut next = state.clone();
        let dropped = next
            .history
            .record(board, state.variant().history_policy());
        if dropped > 0 && state.variant().has_history() {
            utils::log(&format!("history truncated: {dropped} later step(s) dropped"));
            events.push(GameEvent::HistoryTruncated { dropped });
        }

        let resolution = RuleResolution::new(next, true, events);
        match resolution.outcome {
            GameOutcome::Won { winner } => utils::log(&format!("game won by {winner}")),
            GameOutcome::Draw => utils::log("game drawn"),
            GameOutcome::InProgress => {}
        }
        resolution
    }

    /// 移动历史游标；不截断任何记录。
    pub fn jump_to(&self, state: &GameState, step: usize) -> Result<RuleResolution, RuleError> {
        if !state.variant().has_history() {
            return Err(RuleError::HistoryUnavailable);
        }
        let mut next = state.clone();
        if !next.history.jump_to(step) {
            return Err(RuleError::StepOutOfRange {
                step,
                len: state.history.len(),
            });
        }
        Ok(RuleResolution::navigated(
            next,
            vec![GameEvent::StepSelected { step }],
        ))
    }

    pub fn restart(&self, state: &GameState) -> RuleResolution {
        let mut next = state.clone();
        next.reset();
        RuleResolution::navigated(next, Vec::new())
    }

    /// 校验并接受外部传入的完整状态。
    pub fn load(&self, state: GameState) -> Result<GameState, RuleError> {
        Self::ensure_integrity(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MoveTier;
    use crate::game::board::board_from_pattern;
    use crate::game::{
        Board, GameConfig, GameVariant, HistoryError, HistoryPolicy, Mark, MoveHistory,
    };

    fn new_game(variant: GameVariant) -> GameState {
        GameState::new(GameConfig::from_variant(variant))
    }

    fn click(state: &GameState, index: usize) -> GameState {
        let resolution = RuleEngine::new().handle_click(state, index);
        assert!(resolution.accepted, "click on {index} should be accepted");
        resolution.state
    }

    #[test]
    fn tutorial_alternates_marks() {
        let state = new_game(GameVariant::Tutorial);
        let state = click(&state, 4);
        let state = click(&state, 0);

        let board = state.current_board();
        assert_eq!(board.get(4), Some(Some(Mark::X)));
        assert_eq!(board.get(0), Some(Some(Mark::O)));
        assert_eq!(state.status(), "Next player: X");
    }

    #[test]
    fn clicking_occupied_cell_is_a_no_op() {
        let state = click(&new_game(GameVariant::Tutorial), 4);
        let resolution = RuleEngine::new().handle_click(&state, 4);

        assert!(!resolution.accepted);
        assert_eq!(resolution.state, state, "state must stay unchanged");
        assert_eq!(
            resolution.events,
            vec![GameEvent::ClickIgnored {
                index: 4,
                reason: ClickRejection::CellOccupied { index: 4 },
            }]
        );
    }

    #[test]
    fn out_of_range_click_is_ignored() {
        let state = new_game(GameVariant::Basic);
        let resolution = RuleEngine::new().handle_click(&state, 9);
        assert!(!resolution.accepted);
        assert_eq!(resolution.state, state);
    }

    #[test]
    fn clicks_after_a_win_are_ignored() {
        let mut state = new_game(GameVariant::Tutorial);
        for index in [0, 3, 1, 4, 2] {
            state = click(&state, index);
        }
        assert_eq!(state.winner(), Some(Mark::X));
        assert_eq!(state.status(), "Winner: X");

        let resolution = RuleEngine::new().handle_click(&state, 8);
        assert!(!resolution.accepted);
        assert!(resolution.events.iter().any(|event| matches!(
            event,
            GameEvent::ClickIgnored {
                reason: ClickRejection::GameFinished,
                ..
            }
        )));
        assert_eq!(resolution.state, state);
    }

    #[test]
    fn winning_click_emits_game_won() {
        let mut state = new_game(GameVariant::Basic);
        for index in [0, 3, 1, 4] {
            state = click(&state, index);
        }
        let resolution = RuleEngine::new().handle_click(&state, 2);
        assert_eq!(resolution.outcome, GameOutcome::Won { winner: Mark::X });
        assert!(resolution
            .events
            .contains(&GameEvent::GameWon { winner: Mark::X }));
    }

    #[test]
    fn history_records_each_turn() {
        let state = new_game(GameVariant::Tutorial);
        let state = click(&state, 4);
        let state = click(&state, 0);

        let entries = state.history.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0], Board::empty());
        assert_eq!(entries[1].count(Mark::X) + entries[1].count(Mark::O), 1);
        assert_eq!(entries[2].count(Mark::X) + entries[2].count(Mark::O), 2);
        assert_eq!(state.step(), 2);
    }

    #[test]
    fn tutorial_jump_keeps_later_entries() {
        let engine = RuleEngine::new();
        let state = click(&click(&new_game(GameVariant::Tutorial), 4), 0);

        let jumped = engine.jump_to(&state, 1).expect("step 1 exists").state;
        assert_eq!(jumped.history.len(), 3, "jumping never truncates");
        assert_eq!(jumped.status(), "Next player: O");

        let branched = click(&jumped, 8);
        assert_eq!(branched.history.len(), 4);
        assert_eq!(branched.step(), 3);
        assert_eq!(branched.current_board().get(8), Some(Some(Mark::O)));
    }

    #[test]
    fn computer_replies_in_the_same_turn() {
        let state = new_game(GameVariant::VersusComputer);
        let resolution = RuleEngine::new().handle_click(&state, 4);

        assert!(resolution.accepted);
        assert_eq!(
            resolution.events[..2],
            [
                GameEvent::MarkPlaced {
                    index: 4,
                    mark: Mark::X
                },
                GameEvent::ComputerMoved {
                    index: 0,
                    mark: Mark::O,
                    tier: MoveTier::Fallback
                },
            ]
        );
        let history = resolution.state.history.entries();
        assert_eq!(history.len(), 2, "one entry per click");
        assert_eq!(history[1].get(0), Some(Some(Mark::O)));
        assert_eq!(history[1].get(4), Some(Some(Mark::X)));
    }

    #[test]
    fn computer_extends_then_wins() {
        let state = new_game(GameVariant::VersusComputer);
        // X 4 -> O 0 兜底；X 8 -> O 沿第一行延伸到 2。
        let state = click(&state, 4);
        let state = click(&state, 8);
        assert_eq!(state.current_board().get(2), Some(Some(Mark::O)));

        let resolution = RuleEngine::new().handle_click(&state, 5);
        assert_eq!(resolution.outcome, GameOutcome::Won { winner: Mark::O });
        assert_eq!(resolution.state.current_board().get(1), Some(Some(Mark::O)));
    }

    #[test]
    fn computer_does_not_move_after_human_wins() {
        let cells = [
            Some(Mark::X),
            Some(Mark::X),
            None,
            Some(Mark::O),
            Some(Mark::O),
            Some(Mark::X),
            Some(Mark::O),
            None,
            None,
        ];
        let mut state = new_game(GameVariant::VersusComputer);
        let mut history = MoveHistory::new();
        history.record(Board::from_cells(cells), HistoryPolicy::AppendOnly);
        state.history = history;

        let resolution = RuleEngine::new().handle_click(&state, 2);
        assert_eq!(resolution.outcome, GameOutcome::Won { winner: Mark::X });
        assert!(!resolution
            .events
            .iter()
            .any(|event| matches!(event, GameEvent::ComputerMoved { .. })));
        assert_eq!(resolution.state.current_board().count(Mark::O), 3);
    }

    #[test]
    fn computer_does_not_move_when_human_fills_the_board() {
        let mut history = MoveHistory::new();
        history.record(board_from_pattern("XOX XOO OX."), HistoryPolicy::AppendOnly);
        let mut state = new_game(GameVariant::VersusComputer);
        state.history = history;

        let resolution = RuleEngine::new().handle_click(&state, 8);
        assert!(resolution.accepted);
        assert_eq!(resolution.outcome, GameOutcome::Draw);
        assert!(resolution.state.current_board().is_full());
        assert!(!resolution
            .events
            .iter()
            .any(|event| matches!(event, GameEvent::ComputerMoved { .. })));
        assert_eq!(
            resolution.events,
            vec![
                GameEvent::MarkPlaced {
                    index: 8,
                    mark: Mark::X
                },
                GameEvent::GameDrawn,
            ]
        );
    }

    #[test]
    fn jumping_to_a_won_step_does_not_announce_the_win_again() {
        let engine = RuleEngine::new();
        let mut state = new_game(GameVariant::Tutorial);
        for index in [0, 3, 1, 4, 2] {
            state = click(&state, index);
        }
        let back = engine.jump_to(&state, 2).expect("step 2 exists").state;

        let resolution = engine.jump_to(&back, 5).expect("step 5 exists");
        assert_eq!(resolution.outcome, GameOutcome::Won { winner: Mark::X });
        assert_eq!(resolution.status, "Winner: X");
        assert_eq!(resolution.events, vec![GameEvent::StepSelected { step: 5 }]);
    }

    #[test]
    fn computer_variant_truncates_after_cursor() {
        let engine = RuleEngine::new();
        let state = click(&click(&new_game(GameVariant::VersusComputer), 4), 8);
        assert_eq!(state.history.len(), 3);

        let jumped = engine.jump_to(&state, 1).expect("step 1 exists").state;
        let resolution = engine.handle_click(&jumped, 6);

        assert!(resolution.accepted);
        assert!(resolution
            .events
            .contains(&GameEvent::HistoryTruncated { dropped: 1 }));
        let history = resolution.state.history.entries();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1], state.history.entries()[1]);
        assert_eq!(history[2].get(6), Some(Some(Mark::X)));
        assert_eq!(history[2].get(8), Some(None));
    }

    #[test]
    fn basic_variant_has_no_history_navigation() {
        let state = click(&new_game(GameVariant::Basic), 4);
        assert_eq!(state.history.len(), 1);
        assert_eq!(
            RuleEngine::new().jump_to(&state, 0).map(|_| ()),
            Err(RuleError::HistoryUnavailable)
        );
    }

    #[test]
    fn jump_out_of_range_is_an_error() {
        let state = new_game(GameVariant::Tutorial);
        assert_eq!(
            RuleEngine::new().jump_to(&state, 5).map(|_| ()),
            Err(RuleError::StepOutOfRange { step: 5, len: 1 })
        );
    }

    #[test]
    fn restart_returns_to_empty_board() {
        let engine = RuleEngine::new();
        let state = click(&new_game(GameVariant::Tutorial), 4);
        let restarted = engine.restart(&state).state;
        assert_eq!(restarted.history.entries(), &[Board::empty()]);
        assert_eq!(restarted.config, state.config);
    }

    #[test]
    fn load_rejects_history_that_does_not_start_empty() {
        let json = serde_json::json!({
            "config": { "variant": "tutorial" },
            "history": { "entries": [board_from_pattern("XXX ... ...")], "cursor": 0 }
        });
        let state: GameState = serde_json::from_value(json).expect("parse state");
        assert_eq!(
            RuleEngine::new().load(state),
            Err(RuleError::IntegrityViolation {
                error: IntegrityError::History {
                    error: HistoryError::StartNotEmpty
                }
            })
        );
    }

    #[test]
    fn load_accepts_started_board_for_basic_variant() {
        let json = serde_json::json!({
            "config": { "variant": "basic" },
            "history": { "entries": [board_from_pattern("X.. .O. ...")], "cursor": 0 }
        });
        let state: GameState = serde_json::from_value(json).expect("parse state");
        assert!(RuleEngine::new().load(state).is_ok());
    }

    #[test]
    fn load_rejects_history_that_clears_a_cell() {
        let json = serde_json::json!({
            "config": { "variant": "versus_computer" },
            "history": {
                "entries": [
                    Board::empty(),
                    board_from_pattern("O.. .X. ..."),
                    board_from_pattern("O.. ... ..X")
                ],
                "cursor": 2
            }
        });
        let state: GameState = serde_json::from_value(json).expect("parse state");
        assert_eq!(
            RuleEngine::new().load(state),
            Err(RuleError::IntegrityViolation {
                error: IntegrityError::History {
                    error: HistoryError::MarksCleared { step: 2 }
                }
            })
        );
    }

    #[test]
    fn load_rejects_broken_state() {
        let mut state = new_game(GameVariant::VersusComputer);
        state.config.computer = Mark::X;
        assert!(matches!(
            RuleEngine::new().load(state),
            Err(RuleError::IntegrityViolation { .. })
        ));
    }
}
