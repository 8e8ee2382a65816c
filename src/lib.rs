pub mod ai;
pub mod game;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use std::str::FromStr;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{choose_move, select_move, AiConfig, AiDecision, HeuristicAgent, MoveTier};
pub use game::{
    detect_winner, Board, Cell, ClickRejection, GameConfig, GameEvent, GameOutcome, GameState,
    GameVariant, HistoryError, HistoryPolicy, IntegrityError, Mark, MoveHistory, RuleEngine,
    RuleError, RuleResolution, CELL_COUNT, WINNING_LINES,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
}

/// 以 JSON 兼容的形式转换为 JS 值，`None` 输出为 `null`。
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn to_js_error(error: RuleError) -> JsValue {
    to_js(&error).unwrap_or_else(|serialize_err| serialize_err)
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: &RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(resolution).map_err(serde_to_js_error)
}

fn parse_config(json: &str) -> Result<GameConfig, RuleError> {
    let config: GameConfig = serde_json::from_str(json).map_err(|error| RuleError::InvalidState {
        message: error.to_string(),
    })?;
    config
        .validate()
        .map_err(|error| RuleError::IntegrityViolation { error })?;
    Ok(config)
}

fn parse_state(json: &str) -> Result<GameState, RuleError> {
    let state: GameState = serde_json::from_str(json).map_err(|error| RuleError::InvalidState {
        message: error.to_string(),
    })?;
    RuleEngine::new().load(state)
}

fn think(state: &GameState) -> AiDecision {
    if state.is_finished() {
        return AiDecision {
            index: None,
            tier: None,
            mark: state.config.computer,
        };
    }
    let agent = HeuristicAgent::new(AiConfig {
        own: state.config.computer,
        opponent: state.config.human,
    });
    agent.decide(state.current_board())
}

/// 一局游戏的 JS 句柄。每次操作都用新状态整体替换旧状态。
#[wasm_bindgen]
pub struct GameEngine {
    state: GameState,
    rules: RuleEngine,
}

impl GameEngine {
    fn from_state(state: GameState) -> Self {
        Self {
            state,
            rules: RuleEngine::new(),
        }
    }

    fn apply(&mut self, resolution: RuleResolution) -> Result<String, JsValue> {
        let json = make_resolution_json(&resolution)?;
        if resolution.accepted {
            self.state = resolution.state;
        }
        Ok(json)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => parse_config(&json).map_err(to_js_error)?,
            None => GameConfig::default(),
        };
        utils::log(&format!("new {:?} game", config.variant));
        Ok(GameEngine::from_state(GameState::new(config)))
    }

    #[wasm_bindgen(js_name = "withVariant")]
    pub fn with_variant(variant: &str) -> GameEngine {
        let variant = GameVariant::from_str(variant).unwrap_or_else(|_| {
            utils::warn(&format!("unknown variant {variant:?}, using default"));
            GameVariant::default()
        });
        GameEngine::from_state(GameState::new(GameConfig::from_variant(variant)))
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        self.state = parse_state(json).map_err(to_js_error)?;
        Ok(())
    }

    /// 处理一次格子点击，返回 `RuleResolution` 的 JSON。被忽略的点击不改变状态。
    pub fn handle_click(&mut self, index: usize) -> Result<String, JsValue> {
        let resolution = self.rules.handle_click(&self.state, index);
        self.apply(resolution)
    }

    pub fn jump_to(&mut self, step: usize) -> Result<String, JsValue> {
        let resolution = self
            .rules
            .jump_to(&self.state, step)
            .map_err(to_js_error)?;
        self.apply(resolution)
    }

    pub fn restart(&mut self) -> Result<String, JsValue> {
        let resolution = self.rules.restart(&self.state);
        self.apply(resolution)
    }

    pub fn squares(&self) -> Result<JsValue, JsValue> {
        to_js(self.state.current_board())
    }

    pub fn winner(&self) -> Option<String> {
        self.state.winner().map(|mark| mark.to_string())
    }

    pub fn status(&self) -> String {
        self.state.status()
    }

    pub fn outcome_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.outcome()).map_err(serde_to_js_error)
    }

    pub fn step_number(&self) -> usize {
        self.state.step()
    }

    pub fn history_len(&self) -> usize {
        self.state.history.len()
    }

    pub fn history_labels(&self) -> Result<JsValue, JsValue> {
        to_js(&self.state.history_labels())
    }

    pub fn history_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.state.history.entries()).map_err(serde_to_js_error)
    }

    /// 在可选延迟后给出电脑方对当前棋盘的选点，不修改状态。
    #[wasm_bindgen(js_name = "thinkMove")]
    pub fn think_move(&self, delay_ms: Option<u32>) -> Promise {
        let state = self.state.clone();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let decision = think(&state);
            let json = serde_json::to_string(&decision).map_err(serde_to_js_error)?;
            Ok(JsValue::from_str(&json))
        })
    }
}

#[wasm_bindgen(js_name = "createBoard")]
pub fn create_board() -> Result<JsValue, JsValue> {
    to_js(&Board::empty())
}

/// 传入 squares 数组，返回 `"X"`、`"O"` 或 `null`。
#[wasm_bindgen(js_name = "calculateWinner")]
pub fn calculate_winner(squares: JsValue) -> Result<Option<String>, JsValue> {
    let board: Board = from_value(squares).map_err(JsValue::from)?;
    Ok(detect_winner(&board).map(|mark| mark.to_string()))
}

/// 电脑方（O）对 squares 的选点；棋盘已满时返回 `undefined`。
#[wasm_bindgen(js_name = "calculateNextMove")]
pub fn calculate_next_move(squares: JsValue) -> Result<Option<u32>, JsValue> {
    let board: Board = from_value(squares).map_err(JsValue::from)?;
    Ok(select_move(&board).map(|index| index as u32))
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    RuleEngine::new().load(state).map_err(to_js_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_applies_accepted_clicks_only() {
        let mut engine = GameEngine::with_variant("tutorial");
        engine.handle_click(4).expect("click should resolve");
        assert_eq!(engine.history_len(), 2);
        assert_eq!(engine.status(), "Next player: O");

        let json = engine.handle_click(4).expect("ignored click still resolves");
        let resolution: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(resolution["accepted"], false);
        assert_eq!(resolution["events"][0]["type"], "ClickIgnored");
        assert_eq!(engine.history_len(), 2);
    }

    #[test]
    fn engine_state_round_trips_through_json() {
        let mut engine = GameEngine::with_variant("ai");
        engine.handle_click(4).expect("click should resolve");
        let json = engine.state_json().expect("serialize state");

        let mut restored = GameEngine::with_variant("basic");
        restored.set_state_json(&json).expect("state should load");
        assert_eq!(restored.state(), engine.state());
        assert_eq!(restored.step_number(), 1);
    }

    #[test]
    fn think_reports_no_move_on_finished_game() {
        let mut engine = GameEngine::with_variant("tutorial");
        for index in [0, 3, 1, 4, 2] {
            engine.handle_click(index).expect("click should resolve");
        }
        assert_eq!(engine.winner().as_deref(), Some("X"));
        let decision = think(engine.state());
        assert_eq!(decision.index, None);
    }

    #[test]
    fn config_json_is_validated() {
        assert!(parse_config(r#"{ "variant": "basic" }"#).is_ok());
        assert!(matches!(
            parse_config(r#"{ "human": "X", "computer": "X" }"#),
            Err(RuleError::IntegrityViolation { .. })
        ));
        assert!(matches!(
            parse_config("not json"),
            Err(RuleError::InvalidState { .. })
        ));
    }
}
