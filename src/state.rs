use std::collections::VecDeque;

use crate::model::{Postcard, ProTarget, Region, ResultPayload};

pub const STARTING_MESSAGE: &str = "Starting...";
const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Idle,
    Loading {
        progress: String,
        rate_limit: Option<String>,
    },
    Success(Box<ResultPayload>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,
    Results,
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub view: ViewState,
    /// Generation of the request the view currently belongs to.
    pub generation: u64,
    pub card_index: usize,
    pub input: String,
    pub region: Region,
    pub comparison_enabled: bool,
    pub pro_targets: Vec<ProTarget>,
    pub pro_selected: Option<usize>,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Search,
            view: ViewState::Idle,
            generation: 0,
            card_index: 0,
            input: String::new(),
            region: Region::default(),
            comparison_enabled: false,
            pro_targets: Vec::new(),
            pro_selected: None,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.view, ViewState::Loading { .. })
    }

    pub fn result(&self) -> Option<&ResultPayload> {
        match &self.view {
            ViewState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn postcards(&self) -> &[Postcard] {
        self.result()
            .map(|r| r.postcards.as_slice())
            .unwrap_or_default()
    }

    pub fn current_card(&self) -> Option<&Postcard> {
        self.postcards().get(self.card_index)
    }

    pub fn next_card(&mut self) {
        let len = self.postcards().len();
        if self.card_index + 1 < len {
            self.card_index += 1;
        }
    }

    pub fn prev_card(&mut self) {
        self.card_index = self.card_index.saturating_sub(1);
    }

    pub fn go_to_card(&mut self, index: usize) {
        if index < self.postcards().len() {
            self.card_index = index;
        }
    }

    pub fn card_position_label(&self) -> Option<String> {
        let len = self.postcards().len();
        if len == 0 {
            return None;
        }
        Some(format!("{} / {}", self.card_index + 1, len))
    }

    pub fn selected_pro(&self) -> Option<&ProTarget> {
        if !self.comparison_enabled {
            return None;
        }
        self.pro_selected.and_then(|idx| self.pro_targets.get(idx))
    }

    /// Cycles none -> first -> ... -> last -> none.
    pub fn cycle_pro_target(&mut self, forward: bool) {
        if !self.comparison_enabled || self.pro_targets.is_empty() {
            self.pro_selected = None;
            return;
        }
        let len = self.pro_targets.len();
        self.pro_selected = match (self.pro_selected, forward) {
            (None, true) => Some(0),
            (None, false) => Some(len - 1),
            (Some(idx), true) if idx + 1 < len => Some(idx + 1),
            (Some(idx), false) if idx > 0 => Some(idx - 1),
            _ => None,
        };
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Started {
        generation: u64,
    },
    Progress {
        generation: u64,
        message: Option<String>,
        rate_limit: Option<String>,
    },
    Finished {
        generation: u64,
        result: Box<ResultPayload>,
    },
    Failed {
        generation: u64,
        error: String,
    },
    Cancelled {
        generation: u64,
    },
    SetProTargets(Vec<ProTarget>),
    Log(String),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::Started { generation } => {
            if generation < state.generation {
                return;
            }
            state.generation = generation;
            state.view = ViewState::Loading {
                progress: STARTING_MESSAGE.to_string(),
                rate_limit: None,
            };
            state.card_index = 0;
        }
        Delta::Progress {
            generation,
            message,
            rate_limit,
        } => {
            if generation != state.generation {
                return;
            }
            if let ViewState::Loading {
                progress,
                rate_limit: advisory,
            } = &mut state.view
            {
                if let Some(message) = message {
                    *progress = message;
                }
                *advisory = rate_limit;
            }
        }
        Delta::Finished { generation, result } => {
            if generation != state.generation {
                return;
            }
            state.view = ViewState::Success(result);
            state.card_index = 0;
            state.screen = Screen::Results;
        }
        Delta::Failed { generation, error } => {
            if generation != state.generation {
                return;
            }
            state.view = ViewState::Failed(error);
            state.screen = Screen::Search;
        }
        Delta::Cancelled { generation } => {
            if generation < state.generation {
                return;
            }
            state.generation = generation;
            if state.is_loading() {
                state.view = ViewState::Idle;
            }
        }
        Delta::SetProTargets(targets) => {
            state.pro_selected = None;
            state.pro_targets = targets;
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
