use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use clap::ValueEnum;

use crate::{
    automaton::{
        explore::Explorer,
        pda::{Machine, RunOptions, Verdict, format_stack},
        resolver::{FirstMatch, Interactive, Policy, Strict},
    },
    error::RunError,
    loader::{MachineSpec, build_machine, log::Logs},
};

pub const DEFAULT_INPUTS_DIR: &str = "inputs";

/// What the shell knows between commands.
#[derive(Debug)]
pub struct Session {
    pub machine: Option<Machine>,
    pub inputs_dir: PathBuf,
    pub policy: Policy,
    pub options: RunOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            machine: None,
            inputs_dir: PathBuf::from(DEFAULT_INPUTS_DIR),
            policy: Policy::default(),
            options: RunOptions::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Command {
    Load,
    Run,
    RunVerbose,
    Inspect,
    Policy,
    Help,
    Exit,
}

const COMMANDS: &[(&str, Command)] = &[
    ("load", Command::Load),
    ("run", Command::Run),
    ("runv", Command::RunVerbose),
    ("inspect", Command::Inspect),
    ("policy", Command::Policy),
    ("help", Command::Help),
    ("exit", Command::Exit),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Line oriented front end: one `command [argument]` per line.
pub struct Shell<I, O> {
    input: I,
    output: O,
    pub session: Session,
}

impl<I: BufRead, O: Write> Shell<I, O> {
    pub fn new(input: I, output: O, session: Session) -> Self {
        Self {
            input,
            output,
            session,
        }
    }

    /// Reads commands until `exit` or end of input.
    pub fn run(&mut self) -> io::Result<()> {
        writeln!(self.output, "Pushdown automaton shell")?;
        writeln!(self.output)?;
        self.help()?;

        let mut line = String::new();
        loop {
            writeln!(self.output)?;
            write!(self.output, "PDA> ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            if self.execute(line.trim_end())? == Flow::Exit {
                return Ok(());
            }
        }
    }

    pub fn execute(&mut self, line: &str) -> io::Result<Flow> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (name, arg) = match tokens[..] {
            [] => {
                writeln!(self.output, "Huh?")?;
                return Ok(Flow::Continue);
            }
            [name] => (name, ""),
            [name, arg] => (name, arg),
            _ => {
                writeln!(
                    self.output,
                    "Too many tokens, commands only have `command` and `argument`"
                )?;
                return Ok(Flow::Continue);
            }
        };

        let Some(&(_, command)) = COMMANDS.iter().find(|(n, _)| *n == name) else {
            writeln!(self.output, "Unrecognized command `{name}` from input `{line}`")?;
            return Ok(Flow::Continue);
        };
        log::debug!("command {command:?} {arg:?}");

        match command {
            Command::Load => self.load(arg)?,
            Command::Run => self.run_input(arg, false)?,
            Command::RunVerbose => self.run_input(arg, true)?,
            Command::Inspect => self.inspect()?,
            Command::Policy => self.policy(arg)?,
            Command::Help => self.help()?,
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    /// On failure the previously loaded machine stays loaded.
    fn load(&mut self, arg: &str) -> io::Result<()> {
        if arg.is_empty() {
            let dir = self.session.inputs_dir.display();
            return writeln!(self.output, "Load what? Give a file from {dir}");
        }
        let path = self.session.inputs_dir.join(arg);
        let mut logs = Logs::new();
        let spec = match MachineSpec::load(&path, &mut logs) {
            Ok(spec) => spec,
            Err(err) => return writeln!(self.output, "{err}"),
        };
        let machine = build_machine(spec, &mut logs);
        for entry in logs.displayable_with(&machine.spec().delta) {
            write!(self.output, "{entry}")?;
        }
        self.session.machine = Some(machine);
        writeln!(self.output, "Successfully loaded file {} as PDA", path.display())
    }

    fn run_input(&mut self, arg: &str, verbose: bool) -> io::Result<()> {
        let Some(machine) = &self.session.machine else {
            return writeln!(self.output, "Run what? You haven't loaded anything yet.");
        };
        let options = RunOptions {
            verbose: verbose || self.session.options.verbose,
            ..self.session.options
        };

        let result = match self.session.policy {
            Policy::Strict => machine.run(arg, &mut Strict, options),
            Policy::FirstMatch => machine.run(arg, &mut FirstMatch, options),
            Policy::Interactive => {
                let mut resolver = Interactive::new(&mut self.input, &mut self.output);
                machine.run(arg, &mut resolver, options)
            }
            Policy::Exhaustive => Explorer::new(machine, arg, options).search(),
        };

        match result {
            Ok(verdict) => report(&mut self.output, arg, &verdict),
            Err(RunError::Io(err)) => Err(err),
            Err(err) => writeln!(self.output, "Run aborted: {err}"),
        }
    }

    fn inspect(&mut self) -> io::Result<()> {
        let Some(machine) = &self.session.machine else {
            return writeln!(self.output, "Inspect what? You haven't loaded anything yet.");
        };
        inspect(&mut self.output, machine)
    }

    fn policy(&mut self, arg: &str) -> io::Result<()> {
        if arg.is_empty() {
            return writeln!(self.output, "Policy: {}", self.session.policy);
        }
        match Policy::from_str(arg, true) {
            Ok(policy) => {
                self.session.policy = policy;
                writeln!(self.output, "Policy set to {policy}")
            }
            Err(_) => writeln!(
                self.output,
                "Unknown policy `{arg}`, expected strict | first | interactive | exhaustive"
            ),
        }
    }

    fn help(&mut self) -> io::Result<()> {
        let dir = self.session.inputs_dir.display();
        writeln!(self.output, "Commands:")?;
        writeln!(
            self.output,
            "Use the `load (file)` command to open PDA files from the {dir} folder"
        )?;
        writeln!(self.output, "Use the `run (input)` command to run the currently loaded PDA")?;
        writeln!(self.output, "        `runv (input)` for a verbose run")?;
        writeln!(self.output, "Use the `inspect` command to view the currently loaded PDA")?;
        writeln!(
            self.output,
            "Use the `policy (name)` command to choose how non determinism is resolved"
        )?;
        writeln!(self.output, "        strict | first | interactive | exhaustive")?;
        writeln!(self.output, "Use the `exit` command to stop the program")?;
        writeln!(self.output, "Use the `help` command to summon this prompt")
    }
}

pub fn report(out: &mut impl Write, input: &str, verdict: &Verdict) -> io::Result<()> {
    for step in verdict.trace.iter().flatten() {
        writeln!(out, "Transition: {}", step.transition)?;
        writeln!(out, "{}", format_stack(&step.stack))?;
    }
    if verdict.accepted {
        writeln!(out, "Input `{input}` is in the language defined by the PDA")
    } else {
        writeln!(out, "Input `{input}` is not in the language defined by the PDA")
    }
}

pub fn inspect(out: &mut impl Write, machine: &Machine) -> io::Result<()> {
    let spec = machine.spec();
    writeln!(out, "Start Stack: {}", format_stack(&machine.start().stack))?;
    writeln!(out, "Start State: {}", spec.initial_state)?;
    let finals: Vec<String> = spec.final_states.iter().map(ToString::to_string).collect();
    writeln!(out, "Final State(s): [{}]", finals.join(" "))?;
    writeln!(out)?;
    writeln!(out, "Transitions:")?;
    if machine.transitions().is_empty() {
        writeln!(out, "None")?;
    }
    for transition in machine.transitions() {
        writeln!(out, "{transition}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Shell<&[u8], Vec<u8>> {
        Shell::new(script.as_bytes(), Vec::new(), Session::default())
    }

    fn output(shell: Shell<&[u8], Vec<u8>>) -> String {
        String::from_utf8(shell.output).unwrap()
    }

    fn loaded(script: &str, policy: Policy) -> Shell<&[u8], Vec<u8>> {
        let mut shell = shell(script);
        let spec = MachineSpec::new("0 ( λ ( 0, 0 ) ( λ 0, 0 a λ λ 1, 0 a λ λ 0")
            .with_final_states([0]);
        shell.session.machine = Some(build_machine(spec, &mut Logs::new()));
        shell.session.policy = policy;
        shell
    }

    #[test]
    fn blank_and_unknown_lines() {
        let mut sh = shell("");
        assert_eq!(sh.execute("   ").unwrap(), Flow::Continue);
        assert_eq!(sh.execute("run a b").unwrap(), Flow::Continue);
        assert_eq!(sh.execute("frobnicate").unwrap(), Flow::Continue);
        assert_eq!(sh.execute("exit").unwrap(), Flow::Exit);
        let out = output(sh);
        assert!(out.contains("Huh?"));
        assert!(out.contains("Too many tokens"));
        assert!(out.contains("Unrecognized command `frobnicate`"));
    }

    #[test]
    fn run_before_load() {
        let mut sh = shell("");
        sh.execute("run ()").unwrap();
        sh.execute("inspect").unwrap();
        let out = output(sh);
        assert!(out.contains("Run what? You haven't loaded anything yet."));
        assert!(out.contains("Inspect what?"));
    }

    #[test]
    fn failed_load_keeps_previous_machine() {
        let mut sh = loaded("", Policy::Strict);
        sh.execute("load missing.yaml").unwrap();
        assert!(sh.session.machine.is_some());
        assert!(output(sh).contains("error loading file"));
    }

    #[test]
    fn run_and_runv() {
        let mut sh = loaded("", Policy::Strict);
        sh.execute("run (())").unwrap();
        sh.execute("runv ()").unwrap();
        sh.execute("run )").unwrap();
        let out = output(sh);
        assert!(out.contains("Input `(())` is in the language defined by the PDA"));
        assert!(out.contains("Transition: State: 0 | ( -> λ ; ( | State: 0\n[Z (]"));
        assert!(out.contains("Input `)` is not in the language defined by the PDA"));
    }

    #[test]
    fn strict_policy_reports_abort() {
        let mut sh = loaded("", Policy::Strict);
        sh.execute("run a").unwrap();
        assert!(output(sh).contains("Run aborted: non determinism in state 0"));
    }

    #[test]
    fn interactive_policy_reads_choice_from_shell_input() {
        let mut sh = loaded("1\n", Policy::Interactive);
        sh.execute("run a").unwrap();
        let out = output(sh);
        assert!(out.contains("Choose a transition to continue:"));
        assert!(out.contains("Input `a` is in the language defined by the PDA"));
    }

    #[test]
    fn policy_command() {
        let mut sh = shell("");
        sh.execute("policy exhaustive").unwrap();
        assert_eq!(sh.session.policy, Policy::Exhaustive);
        sh.execute("policy nope").unwrap();
        sh.execute("policy").unwrap();
        let out = output(sh);
        assert!(out.contains("Unknown policy `nope`"));
        assert!(out.contains("Policy: exhaustive"));
    }

    #[test]
    fn inspect_lists_transitions() {
        let mut sh = loaded("", Policy::Strict);
        sh.execute("inspect").unwrap();
        let out = output(sh);
        assert!(out.contains("Start Stack: [Z]"));
        assert!(out.contains("Start State: 0"));
        assert!(out.contains("Final State(s): [0]"));
        assert!(out.contains("State: 0 | ) -> ( ; λ | State: 0"));
    }

    #[test]
    fn loop_stops_at_exit() {
        let mut sh = loaded("run ()\nexit\nrun (\n", Policy::Strict);
        sh.run().unwrap();
        let out = output(sh);
        assert_eq!(out.matches("is in the language").count(), 1);
    }
}
