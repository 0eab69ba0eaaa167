use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process::exit,
};

use clap::{ArgAction, Parser};
use log::LevelFilter;

use pushdown::{
    Policy,
    automaton::pda::{DEFAULT_SEARCH_LIMIT, Machine, RunOptions},
    loader::{MachineSpec, build_machine, log::Logs},
    shell::{self, DEFAULT_INPUTS_DIR, Session, Shell},
};

/// Simulate pushdown automata described by quintuple transition tables.
#[derive(Parser, Debug)]
#[command(name = "pushdown", version)]
struct Cli {
    /// YAML machine definition with Delta, q0, Z and F
    file: Option<PathBuf>,

    /// Input to test against the machine, repeatable. Without any, the shell starts
    #[arg(short, long = "input")]
    inputs: Vec<String>,

    /// How to pick between several applicable transitions
    #[arg(short, long, value_enum, default_value_t = Policy::Interactive)]
    policy: Policy,

    /// Print every applied transition and the resulting stack
    #[arg(long)]
    trace: bool,

    /// Print verdicts as JSON
    #[arg(long)]
    json: bool,

    /// Abort a run after this many transitions
    #[arg(long)]
    step_limit: Option<usize>,

    /// Configurations the exhaustive policy may visit
    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    search_limit: usize,

    /// Directory the shell's `load` command reads from
    #[arg(long, default_value = DEFAULT_INPUTS_DIR)]
    inputs_dir: PathBuf,

    /// Prints verbose logs
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Off,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::builder().filter_level(log_level).parse_default_env().init();
    log::debug!("{cli:?}");

    let options = RunOptions {
        verbose: cli.trace,
        step_limit: cli.step_limit,
        search_limit: cli.search_limit,
    };

    let machine = match &cli.file {
        Some(path) => match load(path) {
            Some(machine) => Some(machine),
            None => exit(1),
        },
        None => None,
    };

    let result = match machine {
        Some(machine) if !cli.inputs.is_empty() => batch(&machine, &cli, options),
        machine => {
            let session = Session {
                machine,
                inputs_dir: cli.inputs_dir.clone(),
                policy: cli.policy,
                options,
            };
            Shell::new(io::stdin().lock(), io::stdout(), session).run()
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        exit(1);
    }
}

fn load(path: &Path) -> Option<Machine> {
    let mut logs = Logs::new();
    let spec = match MachineSpec::load(path, &mut logs) {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("{err}");
            return None;
        }
    };
    let machine = build_machine(spec, &mut logs);
    for entry in logs.displayable_with(&machine.spec().delta) {
        eprint!("{entry}");
    }
    Some(machine)
}

fn batch(machine: &Machine, cli: &Cli, options: RunOptions) -> io::Result<()> {
    let mut stdout = io::stdout();
    let mut failed = false;
    for input in &cli.inputs {
        match machine.evaluate(input, cli.policy, options) {
            Ok(verdict) if cli.json => {
                let json = serde_json::to_string(&verdict).map_err(io::Error::other)?;
                writeln!(stdout, "{json}")?;
            }
            Ok(verdict) => shell::report(&mut stdout, input, &verdict)?,
            Err(err) => {
                eprintln!("Run aborted on `{input}`: {err}");
                failed = true;
            }
        }
    }
    if failed {
        exit(2);
    }
    Ok(())
}
