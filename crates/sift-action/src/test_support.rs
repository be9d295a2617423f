//! Shared fixtures for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sift_core::types::{ExecutionContext, UserInputRequest};

use crate::action::ActionRegistry;
use crate::env::DispatchEnv;
use crate::ui::{LogLevel, UiBridge, UserInterface};

/// UI double that records every call.
#[derive(Default)]
pub struct RecordingUi {
    pub answers: Mutex<HashMap<String, Option<String>>>,
    pub logs: Mutex<Vec<(LogLevel, String)>>,
    pub results: Mutex<Vec<(String, String, ExecutionContext)>>,
}

impl RecordingUi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answer(&self, key: &str, value: Option<&str>) {
        self.answers
            .lock()
            .unwrap()
            .insert(key.to_string(), value.map(str::to_string));
    }

    pub fn logged(&self, level: LogLevel) -> Vec<String> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl UserInterface for RecordingUi {
    async fn confirm(&self, _title: &str, _message: &str) -> bool {
        true
    }

    async fn prompt_input(&self, request: &UserInputRequest) -> Option<String> {
        match self.answers.lock().unwrap().get(&request.key) {
            Some(answer) => answer.clone(),
            None => request.default_value.clone(),
        }
    }

    fn show_result(&self, screen_id: &str, title: &str, context: &ExecutionContext) {
        self.results
            .lock()
            .unwrap()
            .push((screen_id.to_string(), title.to_string(), context.clone()));
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.logs.lock().unwrap().push((level, message.to_string()));
    }
}

/// Environment with the built-in actions and a recording UI.
pub fn env_with(ui: Arc<RecordingUi>) -> DispatchEnv {
    let bridge = UiBridge::new(ui);
    let mut actions = ActionRegistry::new();
    actions.register_defaults(bridge.clone());
    DispatchEnv::new(Arc::new(actions), bridge)
}

pub fn ctx(pairs: &[(&str, &str)]) -> ExecutionContext {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
