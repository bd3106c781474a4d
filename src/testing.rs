use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::display::{Clock, Sleeper};
use crate::prompt::UserInteraction;

/// Scripted terminal: answers come from queues, output is recorded.
#[derive(Default)]
pub struct FakeUi {
    pub lines: Vec<String>,
    pub prompts: Vec<String>,
    pub answers: VecDeque<String>,
    pub confirms: VecDeque<bool>,
    pub clears: usize,
}

impl FakeUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(mut self, answer: &str) -> Self {
        self.answers.push_back(answer.to_string());
        self
    }

    pub fn confirming(mut self, answer: bool) -> Self {
        self.confirms.push_back(answer);
        self
    }

    pub fn output(&self) -> String {
        self.lines.join("\n")
    }
}

impl UserInteraction for FakeUi {
    fn prompt_text(&mut self, text: &str, default: &str) -> Result<String> {
        self.prompts.push(text.to_string());
        match self.answers.pop_front() {
            Some(answer) if !answer.is_empty() => Ok(answer),
            Some(_) => Ok(default.to_string()),
            None => Err(anyhow!("unexpected prompt: {text}")),
        }
    }

    fn confirm(&mut self, text: &str, _default: bool) -> Result<bool> {
        self.prompts.push(text.to_string());
        self.confirms
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected confirmation: {text}"))
    }

    fn print_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn clear(&mut self) {
        self.clears += 1;
    }
}

pub struct FixedClock(pub Duration);

impl Clock for FixedClock {
    fn now(&self) -> Duration {
        self.0
    }
}

/// Lets the live loop run `ticks` times, recording each requested wait.
pub struct StopAfter {
    pub ticks: usize,
    pub waits: Vec<Duration>,
}

impl StopAfter {
    pub fn new(ticks: usize) -> Self {
        StopAfter {
            ticks,
            waits: Vec::new(),
        }
    }
}

impl Sleeper for StopAfter {
    fn sleep<U: UserInteraction>(&mut self, wait: Duration, _ui: &mut U) -> ControlFlow<()> {
        self.waits.push(wait);
        if self.waits.len() >= self.ticks {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
