use std::collections::HashSet;

use crate::{
    automaton::pda::{Configuration, Machine, RunOptions, TraceStep, Verdict},
    error::RunError,
};

#[derive(Clone, Debug)]
struct Node {
    config: Configuration,
    position: usize,
    parent: Option<usize>,
    /// Declaration index of the transition that led here.
    via: Option<usize>,
    /// Candidate index picked to get here, when the parent had a choice.
    choice: Option<usize>,
}

/// Breadth-first search over every branch of a run.
///
/// The input is accepted if some branch halts in a final state with the whole
/// input consumed, which is the usual nondeterministic reading. Configurations
/// are only expanded once, so epsilon cycles that keep the stack bounded
/// terminate; cycles that grow the stack run into the search limit.
pub struct Explorer<'m> {
    machine: &'m Machine,
    input: Vec<char>,
    options: RunOptions,
}

impl<'m> Explorer<'m> {
    pub fn new(machine: &'m Machine, input: &str, options: RunOptions) -> Self {
        Self {
            machine,
            input: input.chars().collect(),
            options,
        }
    }

    pub fn search(&self) -> Result<Verdict, RunError> {
        let limit = self.options.search_limit;
        let start = Node {
            config: self.machine.start(),
            position: 0,
            parent: None,
            via: None,
            choice: None,
        };

        let mut seen = HashSet::new();
        seen.insert((start.config.clone(), 0));
        let mut nodes = vec![start];
        let mut running = vec![0];
        // Halted branch that got furthest into the input, reported on rejection.
        let mut furthest = 0;

        while !running.is_empty() {
            log::trace!("exploring {} branches", running.len());
            let mut next_round = Vec::new();

            for id in running.drain(..) {
                let (config, position) = (&nodes[id].config, nodes[id].position);
                let next = self.input.get(position).copied();
                let candidates: Vec<_> = self.machine.matching(config, next).collect();

                if candidates.is_empty() {
                    if self.machine.is_final(config.state) && position == self.input.len() {
                        return Ok(self.verdict(&nodes, id, true));
                    }
                    if position > nodes[furthest].position {
                        furthest = id;
                    }
                    continue;
                }

                let branching = candidates.len() > 1;
                for (choice, (index, transition)) in candidates.into_iter().enumerate() {
                    let mut config = nodes[id].config.clone();
                    config.apply(transition)?;
                    let position = position + usize::from(!transition.input.is_epsilon());

                    if !seen.insert((config.clone(), position)) {
                        continue;
                    }
                    if nodes.len() >= limit {
                        return Err(RunError::SearchLimit { limit });
                    }
                    next_round.push(nodes.len());
                    nodes.push(Node {
                        config,
                        position,
                        parent: Some(id),
                        via: Some(index),
                        choice: branching.then_some(choice),
                    });
                }
            }
            running = next_round;
        }

        Ok(self.verdict(&nodes, furthest, false))
    }

    fn verdict(&self, nodes: &[Node], leaf: usize, accepted: bool) -> Verdict {
        let mut path = Vec::new();
        let mut cursor = Some(leaf);
        while let Some(id) = cursor {
            if nodes[id].via.is_some() {
                path.push(id);
            }
            cursor = nodes[id].parent;
        }
        path.reverse();

        let choices = path.iter().filter_map(|&id| nodes[id].choice).collect();
        let trace = self.options.verbose.then(|| {
            path.iter()
                .filter_map(|&id| {
                    let node = &nodes[id];
                    Some(TraceStep {
                        transition: self.machine.transitions().get(node.via?)?.clone(),
                        state: node.config.state,
                        stack: node.config.stack.clone(),
                        position: node.position,
                    })
                })
                .collect()
        });

        let node = &nodes[leaf];
        Verdict {
            accepted,
            state: node.config.state,
            stack: node.config.stack.clone(),
            consumed: node.position,
            input_len: self.input.len(),
            steps: path.len(),
            choices,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automaton::{
            State,
            resolver::{FirstMatch, Scripted},
        },
        loader::{MachineSpec, build_machine, log::Logs},
    };

    fn machine(delta: &str, finals: &[i64]) -> Machine {
        let spec = MachineSpec::new(delta).with_final_states(finals.iter().copied());
        build_machine(spec, &mut Logs::new())
    }

    // Even-length palindromes over {a, b}: guess the middle with an epsilon move.
    fn palindromes() -> Machine {
        machine(
            "0 a λ a 0, 0 b λ b 0, 0 λ λ λ 1, 1 a a λ 1, 1 b b λ 1, 1 λ Z Z 2",
            &[2],
        )
    }

    #[test]
    fn finds_branch_first_match_misses() {
        let m = palindromes();
        let first = m.run("abba", &mut FirstMatch, RunOptions::default()).unwrap();
        assert!(!first.accepted);

        let verdict = Explorer::new(&m, "abba", RunOptions::verbose()).search().unwrap();
        assert!(verdict.accepted);
        assert_eq!(verdict.state, State(2));
        assert_eq!(verdict.trace.as_ref().map(Vec::len), Some(verdict.steps));

        let replayed = m
            .run("abba", &mut Scripted::new(verdict.choices.clone()), RunOptions::default())
            .unwrap();
        assert!(replayed.accepted);
    }

    #[test]
    fn rejects_when_no_branch_accepts() {
        let verdict = Explorer::new(&palindromes(), "abab", RunOptions::default())
            .search()
            .unwrap();
        assert!(!verdict.accepted);
        assert!(verdict.trace.is_none());
    }

    #[test]
    fn bounded_epsilon_cycle_terminates() {
        let m = machine("0 λ λ λ 1, 1 λ λ λ 0", &[]);
        let verdict = Explorer::new(&m, "", RunOptions::default()).search().unwrap();
        assert!(!verdict.accepted);
    }

    #[test]
    fn growing_stack_hits_limit() {
        let m = machine("0 λ λ A 0", &[]);
        let options = RunOptions {
            search_limit: 64,
            ..RunOptions::default()
        };
        let err = Explorer::new(&m, "", options).search().unwrap_err();
        assert!(matches!(err, RunError::SearchLimit { limit: 64 }));
    }
}
