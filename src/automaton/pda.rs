use std::io;

use serde::Serialize;

use super::*;

use crate::{
    automaton::{
        explore::Explorer,
        resolver::{FirstMatch, Interactive, Policy, Resolver, Strict},
    },
    error::RunError,
    loader::MachineSpec,
};

/// A built automaton. Immutable, so one machine can serve any number of runs.
#[derive(Clone, Debug)]
pub struct Machine {
    transitions: Vec<Transition>,
    spec: MachineSpec,
}

/// The mutable part of a run. The top of the stack is the last element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Configuration {
    pub state: State,
    pub stack: Vec<char>,
}

/// `[Z ( (]`, bottom first.
pub fn format_stack(stack: &[char]) -> String {
    let symbols: Vec<String> = stack.iter().map(char::to_string).collect();
    format!("[{}]", symbols.join(" "))
}

impl Configuration {
    pub fn top(&self) -> Option<char> {
        self.stack.last().copied()
    }

    /// Pops (unless the pop symbol is epsilon), pushes left to right, then moves.
    /// Does not check that `transition` matches, callers go through the matcher first.
    pub fn apply(&mut self, transition: &Transition) -> Result<(), RunError> {
        if !transition.pop.is_epsilon() && self.stack.pop().is_none() {
            return Err(RunError::StackUnderflow { state: self.state });
        }
        self.stack.extend_from_slice(&transition.push);
        self.state = transition.to;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing applies. The configuration is left untouched.
    Halted,
    Applied {
        /// Declaration index of the applied transition.
        transition: usize,
        /// Index into the candidate list picked by the resolver, if there was a choice.
        choice: Option<usize>,
        consumed: bool,
    },
}

impl StepOutcome {
    pub fn continued(&self) -> bool {
        matches!(self, StepOutcome::Applied { .. })
    }

    pub fn consumed(&self) -> bool {
        matches!(self, StepOutcome::Applied { consumed: true, .. })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    /// Record every applied transition in [`Verdict::trace`].
    pub verbose: bool,
    /// Abort with [`RunError::StepLimit`] on any transition past this many. Without
    /// a limit, a machine looping on epsilon moves never returns.
    pub step_limit: Option<usize>,
    /// Configurations the exhaustive search may visit before giving up.
    pub search_limit: usize,
}

pub const DEFAULT_SEARCH_LIMIT: usize = 100_000;

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            step_limit: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl RunOptions {
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    pub transition: Transition,
    pub state: State,
    pub stack: Vec<char>,
    pub position: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub accepted: bool,
    pub state: State,
    pub stack: Vec<char>,
    /// Input characters consumed when the machine halted.
    pub consumed: usize,
    pub input_len: usize,
    pub steps: usize,
    /// Resolver picks at each nondeterministic step, replayable with
    /// [`Scripted`](super::resolver::Scripted).
    pub choices: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceStep>>,
}

impl Machine {
    pub(crate) fn new(transitions: Vec<Transition>, spec: MachineSpec) -> Self {
        Self { transitions, spec }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn spec(&self) -> &MachineSpec {
        &self.spec
    }

    pub fn is_final(&self, state: State) -> bool {
        self.spec.final_states.contains(&state)
    }

    pub fn start(&self) -> Configuration {
        Configuration {
            state: self.spec.initial_state,
            stack: vec![self.spec.initial_stack],
        }
    }

    /// Transitions applicable to `config` with `next` as the next input
    /// character (`None` at end of input), in declaration order.
    pub fn matching<'m>(
        &'m self,
        config: &Configuration,
        next: Option<char>,
    ) -> impl Iterator<Item = (usize, &'m Transition)> + use<'m> {
        let state = config.state;
        let top = config.top();
        self.transitions.iter().enumerate().filter(move |(_, t)| {
            t.from == state && t.input.accepts_input(next) && t.pop.accepts_top(top)
        })
    }

    pub fn step<R: Resolver + ?Sized>(
        &self,
        config: &mut Configuration,
        next: Option<char>,
        resolver: &mut R,
    ) -> Result<StepOutcome, RunError> {
        let (indices, candidates): (Vec<usize>, Vec<&Transition>) =
            self.matching(config, next).unzip();
        log::trace!("state {} next {next:?}: {} candidates", config.state, candidates.len());

        let (picked, choice) = match candidates.len() {
            0 => return Ok(StepOutcome::Halted),
            1 => (0, None),
            n => {
                log::warn!(
                    "non determinism detected in state {}, {n} transitions apply",
                    config.state
                );
                let choice = resolver.choose(config, &candidates)?;
                if choice >= n {
                    return Err(RunError::InvalidChoice {
                        index: choice,
                        candidates: n,
                    });
                }
                (choice, Some(choice))
            }
        };

        let transition = candidates[picked];
        config.apply(transition)?;
        log::debug!("{transition} => {:?}", config.stack);

        Ok(StepOutcome::Applied {
            transition: indices[picked],
            choice,
            consumed: !transition.input.is_epsilon(),
        })
    }

    pub fn run<R: Resolver + ?Sized>(
        &self,
        input: &str,
        resolver: &mut R,
        options: RunOptions,
    ) -> Result<Verdict, RunError> {
        let mut simulator = Simulator::begin(self, input, resolver, options);
        loop {
            match simulator.step()? {
                SimulatorResult::Pending => {}
                SimulatorResult::Accept | SimulatorResult::Reject => return Ok(simulator.finish()),
            }
        }
    }

    /// Runs under `policy`. The interactive policy asks on stdin/stdout.
    pub fn evaluate(
        &self,
        input: &str,
        policy: Policy,
        options: RunOptions,
    ) -> Result<Verdict, RunError> {
        match policy {
            Policy::Strict => self.run(input, &mut Strict, options),
            Policy::FirstMatch => self.run(input, &mut FirstMatch, options),
            Policy::Interactive => {
                let mut resolver = Interactive::new(io::stdin().lock(), io::stdout());
                self.run(input, &mut resolver, options)
            }
            Policy::Exhaustive => Explorer::new(self, input, options).search(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulatorResult {
    Pending,
    Reject,
    Accept,
}

/// Drives one run: one configuration, one cursor, one resolver.
pub struct Simulator<'m, R: ?Sized> {
    machine: &'m Machine,
    input: Vec<char>,
    position: usize,
    config: Configuration,
    options: RunOptions,
    steps: usize,
    choices: Vec<usize>,
    trace: Vec<TraceStep>,
    halted: bool,
    resolver: &'m mut R,
}

impl<'m, R: Resolver + ?Sized> Simulator<'m, R> {
    pub fn begin(
        machine: &'m Machine,
        input: &str,
        resolver: &'m mut R,
        options: RunOptions,
    ) -> Self {
        Self {
            machine,
            input: input.chars().collect(),
            position: 0,
            config: machine.start(),
            options,
            steps: 0,
            choices: Vec::new(),
            trace: Vec::new(),
            halted: false,
            resolver,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn step(&mut self) -> Result<SimulatorResult, RunError> {
        if !self.halted {
            let next = self.input.get(self.position).copied();
            match self.machine.step(&mut self.config, next, &mut *self.resolver)? {
                StepOutcome::Halted => self.halted = true,
                StepOutcome::Applied {
                    transition,
                    choice,
                    consumed,
                } => {
                    if consumed {
                        self.position += 1;
                    }
                    self.steps += 1;
                    self.choices.extend(choice);
                    if self.options.verbose {
                        self.trace.push(TraceStep {
                            transition: self.machine.transitions[transition].clone(),
                            state: self.config.state,
                            stack: self.config.stack.clone(),
                            position: self.position,
                        });
                    }
                    if let Some(limit) = self.options.step_limit
                        && self.steps > limit
                    {
                        return Err(RunError::StepLimit { limit });
                    }
                    return Ok(SimulatorResult::Pending);
                }
            }
        }

        if self.accepted() {
            Ok(SimulatorResult::Accept)
        } else {
            Ok(SimulatorResult::Reject)
        }
    }

    /// Final state and every input character consumed. The stack is ignored.
    fn accepted(&self) -> bool {
        self.machine.is_final(self.config.state) && self.position == self.input.len()
    }

    pub fn finish(self) -> Verdict {
        Verdict {
            accepted: self.halted && self.accepted(),
            state: self.config.state,
            stack: self.config.stack,
            consumed: self.position,
            input_len: self.input.len(),
            steps: self.steps,
            choices: self.choices,
            trace: self.options.verbose.then_some(self.trace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automaton::resolver::Scripted,
        loader::{build_machine, log::Logs},
    };

    fn machine(delta: &str, finals: &[i64]) -> Machine {
        let spec = MachineSpec::new(delta).with_final_states(finals.iter().copied());
        build_machine(spec, &mut Logs::new())
    }

    fn balanced() -> Machine {
        machine("0 ( λ ( 0, 0 ) ( λ 0", &[0])
    }

    #[test]
    fn matcher_keeps_declaration_order() {
        let m = machine("0 a λ λ 1, 0 λ λ λ 2, 0 a Z λ 3, 1 a λ λ 4, 0 b λ λ 5", &[]);
        let found: Vec<usize> = m.matching(&m.start(), Some('a')).map(|(i, _)| i).collect();
        assert_eq!(found, [0, 1, 2]);
        let found: Vec<usize> = m.matching(&m.start(), None).map(|(i, _)| i).collect();
        assert_eq!(found, [1]);
    }

    #[test]
    fn step_pops_then_pushes_left_to_right() {
        let m = machine("0 a Z XY 1", &[1]);
        let mut config = m.start();
        let outcome = m.step(&mut config, Some('a'), &mut Strict).unwrap();
        assert!(outcome.continued());
        assert!(outcome.consumed());
        assert_eq!(config.stack, ['X', 'Y']);
        assert_eq!(config.top(), Some('Y'));
        assert_eq!(config.state, State(1));
    }

    #[test]
    fn epsilon_step_does_not_consume() {
        let m = machine("0 λ λ A 1", &[1]);
        let mut config = m.start();
        let outcome = m.step(&mut config, Some('x'), &mut Strict).unwrap();
        assert!(outcome.continued());
        assert!(!outcome.consumed());
        assert_eq!(config.stack, ['Z', 'A']);
    }

    #[test]
    fn halt_leaves_configuration_alone() {
        let m = balanced();
        let mut config = m.start();
        let outcome = m.step(&mut config, Some(')'), &mut Strict).unwrap();
        assert_eq!(outcome, StepOutcome::Halted);
        assert!(!outcome.consumed());
        assert_eq!(config, m.start());
    }

    #[test]
    fn balanced_parentheses() {
        let m = balanced();
        assert!(m.run("(())", &mut Strict, RunOptions::default()).unwrap().accepted);
        assert!(m.run("()()", &mut Strict, RunOptions::default()).unwrap().accepted);

        let stuck = m.run("())", &mut Strict, RunOptions::default()).unwrap();
        assert!(!stuck.accepted);
        assert_eq!(stuck.consumed, 2);
        assert_eq!(stuck.input_len, 3);
    }

    #[test]
    fn stack_contents_do_not_matter() {
        let verdict = balanced().run("(()", &mut Strict, RunOptions::default()).unwrap();
        assert!(verdict.accepted);
        assert_eq!(verdict.stack, ['Z', '(']);
    }

    #[test]
    fn no_final_states_rejects_everything() {
        let m = machine("0 ( λ ( 0, 0 ) ( λ 0", &[]);
        assert!(!m.run("()", &mut Strict, RunOptions::default()).unwrap().accepted);
    }

    #[test]
    fn final_state_with_input_left_is_rejected() {
        let m = machine("0 a λ λ 1", &[1]);
        let verdict = m.run("ab", &mut Strict, RunOptions::default()).unwrap();
        assert_eq!(verdict.state, State(1));
        assert!(!verdict.accepted);
    }

    #[test]
    fn empty_machine_accepts_empty_input_in_final_start_state() {
        let m = machine("", &[0]);
        let verdict = m.run("", &mut Strict, RunOptions::default()).unwrap();
        assert!(verdict.accepted);
        assert_eq!(verdict.steps, 0);
    }

    #[test]
    fn strict_rejects_choice_first_match_takes_earliest() {
        let m = machine("0 a λ λ 1, 0 a λ λ 2", &[2]);
        let err = m.run("a", &mut Strict, RunOptions::default()).unwrap_err();
        assert!(matches!(err, RunError::NonDeterminism { candidates: 2, .. }));

        let verdict = m.run("a", &mut FirstMatch, RunOptions::default()).unwrap();
        assert_eq!(verdict.state, State(1));
        assert!(!verdict.accepted);
        assert_eq!(verdict.choices, [0]);

        let verdict = m.run("a", &mut Scripted::new([1]), RunOptions::default()).unwrap();
        assert!(verdict.accepted);
    }

    #[test]
    fn out_of_range_choice_is_an_error() {
        let m = machine("0 a λ λ 1, 0 a λ λ 2", &[2]);
        let err = m.run("a", &mut Scripted::new([5]), RunOptions::default()).unwrap_err();
        assert!(matches!(err, RunError::InvalidChoice { index: 5, candidates: 2 }));
    }

    #[test]
    fn apply_guards_underflow() {
        let m = machine("0 Z Z λ 1", &[]);
        let mut config = Configuration {
            state: State(0),
            stack: Vec::new(),
        };
        let err = config.apply(&m.transitions()[0]).unwrap_err();
        assert!(matches!(err, RunError::StackUnderflow { state: State(0) }));
    }

    #[test]
    fn emptied_stack_only_matches_epsilon_pops() {
        let m = machine("0 a Z λ 1, 1 b Z λ 2, 1 b λ λ 3", &[3]);
        let verdict = m.run("ab", &mut Strict, RunOptions::default()).unwrap();
        assert!(verdict.accepted);
        assert!(verdict.stack.is_empty());
    }

    #[test]
    fn step_limit_stops_epsilon_loops() {
        let m = machine("0 λ λ λ 0", &[0]);
        let options = RunOptions {
            step_limit: Some(50),
            ..RunOptions::default()
        };
        let err = m.run("", &mut Strict, options).unwrap_err();
        assert!(matches!(err, RunError::StepLimit { limit: 50 }));
    }

    #[test]
    fn verbose_records_trace() {
        let verdict = balanced().run("()", &mut Strict, RunOptions::verbose()).unwrap();
        let trace = verdict.trace.unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].stack, ['Z', '(']);
        assert_eq!(trace[0].position, 1);
        assert_eq!(trace[1].stack, ['Z']);
        assert_eq!(trace[1].position, 2);

        let quiet = balanced().run("()", &mut Strict, RunOptions::default()).unwrap();
        assert!(quiet.trace.is_none());
    }

    #[test]
    fn simulator_steps_one_transition_at_a_time() {
        let m = balanced();
        let mut resolver = Strict;
        let mut sim = Simulator::begin(&m, "()", &mut resolver, RunOptions::default());
        assert!(matches!(sim.step().unwrap(), SimulatorResult::Pending));
        assert_eq!(sim.position(), 1);
        assert_eq!(sim.configuration().stack, ['Z', '(']);
        assert!(matches!(sim.step().unwrap(), SimulatorResult::Pending));
        assert!(matches!(sim.step().unwrap(), SimulatorResult::Accept));
        assert!(matches!(sim.step().unwrap(), SimulatorResult::Accept));
        assert!(sim.finish().accepted);
    }
}
