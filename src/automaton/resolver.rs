use std::{
    collections::VecDeque,
    fmt::Display,
    io::{BufRead, Write},
};

use clap::ValueEnum;

use crate::{
    automaton::{
        Transition,
        pda::{Configuration, format_stack},
    },
    error::RunError,
};

/// Picks one of several applicable transitions. Called only when there are
/// at least two candidates, listed in declaration order.
pub trait Resolver {
    fn choose(
        &mut self,
        config: &Configuration,
        candidates: &[&Transition],
    ) -> Result<usize, RunError>;
}

impl<R: Resolver + ?Sized> Resolver for &mut R {
    fn choose(
        &mut self,
        config: &Configuration,
        candidates: &[&Transition],
    ) -> Result<usize, RunError> {
        (**self).choose(config, candidates)
    }
}

/// Treats any choice as an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct Strict;

impl Resolver for Strict {
    fn choose(
        &mut self,
        config: &Configuration,
        candidates: &[&Transition],
    ) -> Result<usize, RunError> {
        Err(RunError::NonDeterminism {
            state: config.state,
            candidates: candidates.len(),
        })
    }
}

/// Always takes the earliest declared candidate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstMatch;

impl Resolver for FirstMatch {
    fn choose(&mut self, _: &Configuration, _: &[&Transition]) -> Result<usize, RunError> {
        Ok(0)
    }
}

/// Replays a fixed list of picks, e.g. the `choices` of an earlier verdict.
#[derive(Clone, Debug, Default)]
pub struct Scripted {
    choices: VecDeque<usize>,
}

impl Scripted {
    pub fn new(choices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
        }
    }
}

impl Resolver for Scripted {
    fn choose(&mut self, _: &Configuration, _: &[&Transition]) -> Result<usize, RunError> {
        self.choices.pop_front().ok_or(RunError::ChoiceAborted)
    }
}

/// Lists the candidates on `output` and blocks until a valid index is read from `input`.
pub struct Interactive<I, O> {
    input: I,
    output: O,
}

impl<I: BufRead, O: Write> Interactive<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

impl<I: BufRead, O: Write> Resolver for Interactive<I, O> {
    fn choose(
        &mut self,
        config: &Configuration,
        candidates: &[&Transition],
    ) -> Result<usize, RunError> {
        writeln!(self.output, "!WARNING! Non determinism detected {}", candidates.len())?;
        writeln!(self.output, "Stack: {}", format_stack(&config.stack))?;
        writeln!(self.output, "Choose a transition to continue:")?;
        for (i, t) in candidates.iter().enumerate() {
            writeln!(self.output, "{i}: {t}")?;
        }

        let mut line = String::new();
        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(RunError::ChoiceAborted);
            }
            match line.trim().parse::<usize>() {
                Ok(index) if index < candidates.len() => return Ok(index),
                _ => writeln!(
                    self.output,
                    "Enter a number between 0 and {}",
                    candidates.len() - 1
                )?,
            }
        }
    }
}

/// Which resolver a run uses, as named on the command line and in the shell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Fail the run when more than one transition applies
    Strict,
    /// Take the earliest declared transition
    #[value(name = "first")]
    FirstMatch,
    /// Ask which transition to take
    #[default]
    Interactive,
    /// Search every branch, accept if any halted branch accepts
    Exhaustive,
}

impl Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_possible_value() {
            Some(value) => write!(f, "{}", value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}
