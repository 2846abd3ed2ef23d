// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::human_input::{HumanInput, NoHumanInput};

/// Explicit handles to the side channels an environment and its agents may use.
#[derive(Clone)]
pub struct EnvContext {
    pub events: EventBus,
    pub human: Arc<dyn HumanInput>,
}

impl EnvContext {
    pub fn new(events: EventBus, human: Arc<dyn HumanInput>) -> Self {
        Self { events, human }
    }

    pub fn with_human(mut self, human: Arc<dyn HumanInput>) -> Self {
        self.human = human;
        self
    }
}

impl Default for EnvContext {
    fn default() -> Self {
        Self {
            events: EventBus::default(),
            human: Arc::new(NoHumanInput),
        }
    }
}

impl std::fmt::Debug for EnvContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvContext")
            .field("event_subscribers", &self.events.subscriber_count())
            .finish_non_exhaustive()
    }
}
