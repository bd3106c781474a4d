use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;

const PROGRESS_WIDTH: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Previous,
    Current,
    Next,
    Success,
    Notice,
    Failure,
}

/// Everything the commands and the display loop need from a terminal.
pub trait UserInteraction {
    /// Asks for a line of text; an empty answer yields `default`.
    fn prompt_text(&mut self, text: &str, default: &str) -> Result<String>;

    fn confirm(&mut self, text: &str, default: bool) -> Result<bool>;

    fn print_line(&mut self, line: &str);

    fn style(&self, text: &str, _style: Style) -> String {
        text.to_string()
    }

    fn print_styled(&mut self, line: &str, style: Style) {
        let styled = self.style(line, style);
        self.print_line(&styled);
    }

    fn clear(&mut self) {}

    fn progress(&mut self, _label: &str, _done: u64, _total: u64) {}
}

pub struct Console {
    color: bool,
}

impl Console {
    pub fn new(color: bool) -> Self {
        Console { color }
    }
}

impl UserInteraction for Console {
    fn prompt_text(&mut self, text: &str, default: &str) -> Result<String> {
        let answer = read_answer(&format!("{text} [{default}]: "))?;
        Ok(match answer {
            Some(s) if !s.is_empty() => s,
            _ => default.to_string(),
        })
    }

    fn confirm(&mut self, text: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = match read_answer(&format!("{text} [{hint}]: "))? {
                Some(s) => s.to_lowercase(),
                None => return Ok(default),
            };
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Error: invalid input"),
            }
        }
    }

    fn print_line(&mut self, line: &str) {
        println!("{line}");
    }

    fn style(&self, text: &str, style: Style) -> String {
        if !self.color {
            return text.to_string();
        }
        match style {
            Style::Previous => text.red().dimmed(),
            Style::Current => text.bright_green().bold(),
            Style::Next => text.blue().dimmed(),
            Style::Success => text.bright_green(),
            Style::Notice => text.bright_blue(),
            Style::Failure => text.bright_red(),
        }
        .to_string()
    }

    fn clear(&mut self) {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }

    fn progress(&mut self, label: &str, done: u64, total: u64) {
        let filled = if total == 0 {
            PROGRESS_WIDTH
        } else {
            done.min(total) * PROGRESS_WIDTH / total
        };
        let bar = format!(
            "{}{}",
            "#".repeat(filled as usize),
            "-".repeat((PROGRESS_WIDTH - filled) as usize)
        );
        print!("\r{label}  [{bar}]  {}s ", total.saturating_sub(done));
        if done >= total {
            println!();
        }
        let _ = io::stdout().flush();
    }
}

/// Prints `prompt` and reads one line. `None` means stdin is closed.
fn read_answer(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut s = String::new();
    if io::stdin().read_line(&mut s)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(s.trim().to_string()))
}
