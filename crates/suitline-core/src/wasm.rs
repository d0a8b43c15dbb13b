//! WebAssembly bindings for the suitline engine.
//!
//! Everything crosses the boundary as JSON strings in the same camelCase
//! shape the native API serializes to.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::Action;
#[cfg(feature = "wasm")]
use crate::bot::{Bot, BotDifficulty};
#[cfg(feature = "wasm")]
use crate::combat::{calculate_damage, CombatRules, RuleVariant};
#[cfg(feature = "wasm")]
use crate::deck::Card;
#[cfg(feature = "wasm")]
use crate::game::ApplyOptions;
#[cfg(feature = "wasm")]
use crate::state::{GameConfig, GameState};

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed match wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmMatch {
    state: GameState,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmMatch {
    /// Start a match from a `GameConfig` JSON document
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmMatch, JsValue> {
        let config: GameConfig = serde_json::from_str(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

        Ok(WasmMatch {
            state: GameState::start_match(config),
        })
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.state).unwrap_or_else(|_| "{}".to_string())
    }

    /// Index of the player to move
    #[wasm_bindgen(js_name = getActivePlayer)]
    pub fn get_active_player(&self) -> usize {
        self.state.active_player_index
    }

    /// Get valid actions for the active player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        serde_json::to_string(&self.state.valid_actions()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Apply an action from JSON, returns the new log entry as JSON or an error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, action_json: &str, timestamp: f64) -> Result<String, JsValue> {
        let action: Action = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;

        let options = ApplyOptions::default().at(timestamp.max(0.0) as u64);
        let next = self
            .state
            .apply_action(&action, &options)
            .map_err(|e| JsValue::from_str(&format!("Action failed: {}", e)))?;
        self.state = next;

        let entry = self.state.transaction_log.last();
        Ok(serde_json::to_string(&entry).unwrap_or_else(|_| "null".to_string()))
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Get the winner (if game is finished)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<usize> {
        self.state.winner()
    }

    /// Get the current phase as a string
    #[wasm_bindgen(js_name = getPhase)]
    pub fn get_phase(&self) -> String {
        self.state.phase.to_string()
    }

    /// Get a bot's suggested action for the active player
    /// difficulty: "Easy" or "Medium"
    #[wasm_bindgen(js_name = getBotAction)]
    pub fn get_bot_action(&self, difficulty: &str) -> String {
        let diff = difficulty.parse().unwrap_or(BotDifficulty::Medium);

        let mut bot = Bot::new(self.state.active_player_index, diff);
        match bot.choose_action(&self.state) {
            Some(action) => serde_json::to_string(&action).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }
}

/// Run the reference damage calculator; cards use codes like "TC" or "9♠"
#[cfg(feature = "wasm")]
#[wasm_bindgen(js_name = calculateDamage)]
pub fn calculate_damage_js(
    attacker: &str,
    front: Option<String>,
    back: Option<String>,
    lifepoints: u32,
    intro_rules: bool,
) -> Result<String, JsValue> {
    let parse = |code: &str| {
        code.parse::<Card>()
            .map_err(|e| JsValue::from_str(&format!("Invalid card: {}", e)))
    };
    let attacker = parse(attacker)?;
    let front = front.as_deref().map(parse).transpose()?;
    let back = back.as_deref().map(parse).transpose()?;

    let rules = if intro_rules {
        CombatRules::variant_only(RuleVariant::IntroRules)
    } else {
        CombatRules::reference()
    };
    let result = calculate_damage(attacker, front, back, lifepoints, &rules);
    Ok(serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string()))
}
