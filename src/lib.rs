pub mod automaton;
pub mod error;
pub mod loader;
pub mod shell;

pub use automaton::{
    State, Symbol, Transition,
    pda::{Configuration, Machine, RunOptions, Simulator, SimulatorResult, StepOutcome, Verdict},
    resolver::{FirstMatch, Interactive, Policy, Resolver, Scripted, Strict},
};
pub use error::{LoadError, RunError};
pub use loader::{MachineSpec, SpecDocument, build_machine};
