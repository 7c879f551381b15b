// src/system/prompt.rs

use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("User Interface Error: {0}")]
    Dialoguer(#[from] dialoguer::Error),
    #[error("'{0}' needs an answer, but prompting is disabled. Pass it as an option instead.")]
    NonInteractive(String),
    #[error("'{0}' offers no choices to select from.")]
    NoChoices(String),
}

/// Asks the user for values. Implemented over the terminal, and by scripted answers in tests.
pub trait Prompter {
    /// Free-text answer, with an optional pre-filled default.
    fn input(&mut self, label: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// One of `choices` (`(key, label)` pairs); returns the chosen key.
    fn select(
        &mut self,
        label: &str,
        choices: &[(String, String)],
        default: Option<&str>,
    ) -> Result<String, PromptError>;
}

/// Prompts on the terminal with dialoguer.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn input(&mut self, label: &str, default: Option<&str>) -> Result<String, PromptError> {
        let theme = ColorfulTheme::default();
        let mut input = Input::<String>::with_theme(&theme).with_prompt(label);
        if let Some(value) = default {
            input = input.default(value.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn select(
        &mut self,
        label: &str,
        choices: &[(String, String)],
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        if choices.is_empty() {
            return Err(PromptError::NoChoices(label.to_string()));
        }
        let labels: Vec<String> = choices.iter().map(|(_, l)| l.clone()).collect();
        let default_index = default
            .and_then(|d| choices.iter().position(|(k, _)| k == d))
            .unwrap_or(0);

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .items(&labels)
            .default(default_index)
            .interact()?;

        choices
            .get(selection)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| PromptError::NoChoices(label.to_string()))
    }
}

/// Refuses to prompt. Used when the configuration disables interaction.
#[derive(Debug, Default)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn input(&mut self, label: &str, default: Option<&str>) -> Result<String, PromptError> {
        default
            .map(str::to_string)
            .ok_or_else(|| PromptError::NonInteractive(label.to_string()))
    }

    fn select(
        &mut self,
        label: &str,
        _choices: &[(String, String)],
        default: Option<&str>,
    ) -> Result<String, PromptError> {
        default
            .map(str::to_string)
            .ok_or_else(|| PromptError::NonInteractive(label.to_string()))
    }
}

/// Replays a fixed list of answers, in order. Records every label it was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    fn next_answer(&mut self, label: &str) -> Result<String, PromptError> {
        self.asked.push(label.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| PromptError::NonInteractive(label.to_string()))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&mut self, label: &str, _default: Option<&str>) -> Result<String, PromptError> {
        self.next_answer(label)
    }

    fn select(
        &mut self,
        label: &str,
        _choices: &[(String, String)],
        _default: Option<&str>,
    ) -> Result<String, PromptError> {
        self.next_answer(label)
    }
}
