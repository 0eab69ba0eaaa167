use std::fmt::Display;

use serde::Serialize;

use crate::loader::EPSILON;

pub mod explore;
pub mod pda;
pub mod resolver;

/// Integer state label. Any value is a valid state, there is no declared set of states.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct State(pub i64);

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A symbol in the input or pop position of a transition.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Epsilon,
    Char(char),
}

impl Symbol {
    pub fn is_epsilon(&self) -> bool {
        matches!(self, Symbol::Epsilon)
    }

    /// Input position: epsilon applies regardless of what comes next,
    /// including end of input (`None`).
    pub fn accepts_input(&self, next: Option<char>) -> bool {
        match self {
            Symbol::Epsilon => true,
            Symbol::Char(c) => next == Some(*c),
        }
    }

    /// Pop position: epsilon applies to any stack, even an empty one.
    pub fn accepts_top(&self, top: Option<char>) -> bool {
        match self {
            Symbol::Epsilon => true,
            Symbol::Char(c) => top == Some(*c),
        }
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Epsilon => write!(f, "{EPSILON}"),
            Symbol::Char(c) => write!(f, "{c}"),
        }
    }
}

/// One quintuple of the table. The last symbol of `push` ends up on top of the stack.
#[derive(Debug, PartialEq, Eq, Clone, Hash, Serialize)]
pub struct Transition {
    pub from: State,
    pub input: Symbol,
    pub pop: Symbol,
    pub push: Vec<char>,
    pub to: State,
}

impl Transition {
    /// Compact quintuple form, the inverse of what the `Delta` parser reads.
    pub fn quintuple(&self) -> String {
        let push = if self.push.is_empty() {
            EPSILON.to_owned()
        } else {
            self.push.iter().collect()
        };
        format!("{} {} {} {} {}", self.from, self.input, self.pop, push, self.to)
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "State: {} | {} -> {} ; ", self.from, self.input, self.pop)?;
        if self.push.is_empty() {
            write!(f, "{EPSILON}")?;
        } else {
            for c in &self.push {
                write!(f, "{c}")?;
            }
        }
        write!(f, " | State: {}", self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_inspect_format() {
        let t = Transition {
            from: State(0),
            input: Symbol::Char('('),
            pop: Symbol::Epsilon,
            push: vec!['('],
            to: State(1),
        };
        assert_eq!(t.to_string(), "State: 0 | ( -> λ ; ( | State: 1");
        assert_eq!(t.quintuple(), "0 ( λ ( 1");
    }

    #[test]
    fn epsilon_matches_end_of_input_and_empty_stack() {
        assert!(Symbol::Epsilon.accepts_input(None));
        assert!(Symbol::Epsilon.accepts_top(None));
        assert!(!Symbol::Char('a').accepts_input(None));
        assert!(!Symbol::Char('a').accepts_top(None));
        assert!(Symbol::Char('a').accepts_top(Some('a')));
    }
}
