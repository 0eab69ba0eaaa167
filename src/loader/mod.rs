use std::{collections::BTreeSet, path::Path};

use serde::Deserialize;

use crate::{
    automaton::{State, pda::Machine},
    error::LoadError,
    loader::log::LogSink,
};

pub mod lexer;
pub mod log;
pub mod parser;

#[macro_export]
macro_rules! maker {
    (pat: $($pat:pat),*) => {
      $($pat)|*
    };
    (str: $first:literal, $($remainder:literal),+) => {
        concat!($crate::maker!(str: $first), " | ", $crate::maker!(str: $($remainder),*))
    };
    (str: $first:literal) => {
        concat!("'",$first,"'")
    };
}

/// The empty symbol in a `Delta` string. Any other token is a literal.
#[macro_export]
macro_rules! epsilon {
    ($ident: ident) => {
      $crate::maker!($ident: "λ")
    };
}

pub const EPSILON: &str = "λ";
pub const INITIAL_STATE: State = State(0);
pub const INITIAL_STACK: char = 'Z';

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub struct Span(pub usize, pub usize);
impl Span {
    pub fn join(&self, end: Span) -> Span {
        Span(self.0, end.1)
    }
}

#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub struct Spanned<T>(pub T, pub Span);

/// A machine definition as written in a YAML file.
///
/// ```yaml
/// Delta: 0 ( λ ( 0, 0 ) ( λ 0
/// q0: 0
/// Z: Z
/// F: [0]
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SpecDocument {
    #[serde(rename = "Delta", default)]
    pub delta: Option<String>,
    #[serde(rename = "q0", default)]
    pub initial_state: Option<i64>,
    #[serde(rename = "Z", default)]
    pub initial_stack: Option<String>,
    #[serde(rename = "F", default)]
    pub final_states: Option<Vec<i64>>,
}

impl SpecDocument {
    pub fn from_yaml(src: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(src)?)
    }

    /// Fills in missing fields. Nothing here is fatal, every default is reported.
    pub fn resolve(self, logs: &mut impl LogSink) -> MachineSpec {
        let delta = self.delta.unwrap_or_default();
        if delta.trim().is_empty() {
            logs.emit_info_locless("no transitions defined");
        }

        let initial_stack = match self.initial_stack.as_deref().map(str::chars) {
            Some(mut chars) => match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                (Some(c), Some(_)) => {
                    logs.emit_warning_locless(format!(
                        "initial stack symbol must be a single character, using {c:?}"
                    ))
                    .emit_help_locless(format!(
                        "transitions popping {:?} can never match and will be skipped",
                        self.initial_stack.as_deref().unwrap_or_default()
                    ));
                    c
                }
                (None, _) => {
                    logs.emit_warning_locless(format!(
                        "no stack start character specified, defaulting to {INITIAL_STACK:?}"
                    ));
                    INITIAL_STACK
                }
            },
            None => {
                logs.emit_warning_locless(format!(
                    "no stack start character specified, defaulting to {INITIAL_STACK:?}"
                ));
                INITIAL_STACK
            }
        };

        let initial_state = match self.initial_state {
            Some(state) => State(state),
            None => {
                logs.emit_warning_locless(format!(
                    "no initial state specified, defaulting to {INITIAL_STATE}"
                ));
                INITIAL_STATE
            }
        };

        MachineSpec {
            delta,
            initial_state,
            initial_stack,
            final_states: self
                .final_states
                .unwrap_or_default()
                .into_iter()
                .map(State)
                .collect(),
        }
    }
}

/// Everything needed to build a [`Machine`], with defaults already applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineSpec {
    pub delta: String,
    pub initial_state: State,
    pub initial_stack: char,
    pub final_states: BTreeSet<State>,
}

impl MachineSpec {
    pub fn new(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            initial_state: INITIAL_STATE,
            initial_stack: INITIAL_STACK,
            final_states: BTreeSet::new(),
        }
    }

    pub fn with_initial_state(mut self, state: i64) -> Self {
        self.initial_state = State(state);
        self
    }

    pub fn with_initial_stack(mut self, symbol: char) -> Self {
        self.initial_stack = symbol;
        self
    }

    pub fn with_final_states(mut self, states: impl IntoIterator<Item = i64>) -> Self {
        self.final_states = states.into_iter().map(State).collect();
        self
    }

    pub fn from_yaml(src: &str, logs: &mut impl LogSink) -> Result<Self, LoadError> {
        Ok(SpecDocument::from_yaml(src)?.resolve(logs))
    }

    pub fn load(path: impl AsRef<Path>, logs: &mut impl LogSink) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_yaml(&src, logs)
    }
}

/// Builds the transition table out of `spec.delta`. Never fails, see
/// [`parser::Parser`] for how malformed input is absorbed.
pub fn build_machine(spec: MachineSpec, logs: &mut impl LogSink) -> Machine {
    if spec.final_states.is_empty() {
        logs.emit_warning_locless("no final states specified, this machine won't accept anything");
    }
    let transitions = parser::Parser::new(&spec.delta, logs).collect();
    Machine::new(transitions, spec)
}
