// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;

/// Blocking validation notice; the request is never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTone {
    Info,
    Error,
}

/// Inline message a screen shows under its controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenMessage {
    pub tone: MessageTone,
    pub text: String,
}

impl ScreenMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            tone: MessageTone::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            tone: MessageTone::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitPhase {
    #[default]
    Idle,
    Submitting,
}

/// Single-flight guard for one form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionState {
    phase: SubmitPhase,
}

impl SubmissionState {
    pub fn phase(&self) -> SubmitPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == SubmitPhase::Submitting
    }

    /// Returns false while another submission is still in flight.
    pub fn begin(&mut self) -> bool {
        if self.is_submitting() {
            return false;
        }
        self.phase = SubmitPhase::Submitting;
        true
    }

    pub fn finish(&mut self) {
        self.phase = SubmitPhase::Idle;
    }
}
