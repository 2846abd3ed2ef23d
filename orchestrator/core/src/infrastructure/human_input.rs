// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Human Input - Infrastructure for human-in-the-loop questions
//!
//! Agents that need a person's answer go through a [`HumanInput`] provider
//! handed to them in the environment context, never through a process-wide hook.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

#[async_trait]
pub trait HumanInput: Send + Sync {
    /// Show `prompt` and wait for one line of answer.
    async fn ask(&self, prompt: &str) -> Result<String, HumanInputError>;
}

/// Reads answers from the process's standard input.
#[derive(Debug, Default)]
pub struct StdinHumanInput;

#[async_trait]
impl HumanInput for StdinHumanInput {
    async fn ask(&self, prompt: &str) -> Result<String, HumanInputError> {
        info!(prompt = %prompt, "Human input requested");

        let mut stdout = tokio::io::stdout();
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            return Err(HumanInputError::Closed);
        }
        Ok(line.trim_end().to_string())
    }
}

/// Replays queued answers; falls back to a fixed default once exhausted.
#[derive(Debug, Default)]
pub struct ScriptedHumanInput {
    answers: Mutex<VecDeque<String>>,
    default_answer: Option<String>,
}

impl ScriptedHumanInput {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            default_answer: None,
        }
    }

    pub fn with_default(mut self, answer: impl Into<String>) -> Self {
        self.default_answer = Some(answer.into());
        self
    }
}

#[async_trait]
impl HumanInput for ScriptedHumanInput {
    async fn ask(&self, prompt: &str) -> Result<String, HumanInputError> {
        let answer = self.answers.lock().pop_front();
        debug!(prompt = %prompt, answered = answer.is_some(), "Scripted human input");
        answer
            .or_else(|| self.default_answer.clone())
            .ok_or(HumanInputError::Closed)
    }
}

/// Provider for contexts where nobody can answer.
#[derive(Debug, Default)]
pub struct NoHumanInput;

#[async_trait]
impl HumanInput for NoHumanInput {
    async fn ask(&self, _prompt: &str) -> Result<String, HumanInputError> {
        Err(HumanInputError::Unavailable)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HumanInputError {
    #[error("No human input provider is configured")]
    Unavailable,

    #[error("Human input stream closed")]
    Closed,

    #[error("Human input I/O error: {0}")]
    Io(#[from] std::io::Error),
}
