use std::path::PathBuf;

use thiserror::Error;

use crate::automaton::State;

/// Failures that abort a single run. The machine itself is never affected.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("non determinism in state {state}: {candidates} transitions apply")]
    NonDeterminism { state: State, candidates: usize },

    #[error("stack underflow in state {state}: pop requested on an empty stack")]
    StackUnderflow { state: State },

    #[error("resolver chose transition {index} but only {candidates} apply")]
    InvalidChoice { index: usize, candidates: usize },

    #[error("no transition chosen, input closed")]
    ChoiceAborted,

    #[error("step limit of {limit} reached before the machine halted")]
    StepLimit { limit: usize },

    #[error("search gave up after exploring {limit} configurations")]
    SearchLimit { limit: usize },

    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reading a machine definition. Never produced by `build_machine`.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("error loading file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed machine definition: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
