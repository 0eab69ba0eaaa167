use crate::automaton::{State, Symbol, Transition};
use crate::epsilon;
use crate::loader::log::LogSink;
use crate::loader::Spanned as S;

use super::lexer::Lexer;

/// Reads quintuples `start input pop push end` out of a `Delta` string.
///
/// Building never fails. Malformed pieces are absorbed and reported through
/// the log sink instead:
/// - a non-numeric state token becomes state `0`,
/// - a trailing group of fewer than five tokens is dropped,
/// - an input or pop token longer than one character can never match a
///   single input or stack character, so its quintuple is skipped.
pub struct Parser<'a, 'b, L: LogSink> {
    lexer: Lexer<'a>,
    logs: &'b mut L,
}

impl<'a, 'b, L: LogSink> Iterator for Parser<'a, 'b, L> {
    type Item = Transition;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let group = self.next_group()?;
            if let Some(transition) = self.parse_quintuple(group) {
                return Some(transition);
            }
        }
    }
}

impl<'a, 'b, L: LogSink> Parser<'a, 'b, L> {
    pub fn new(src: &'a str, logs: &'b mut L) -> Self {
        Parser {
            lexer: Lexer::new(src),
            logs,
        }
    }

    fn next_group(&mut self) -> Option<[S<&'a str>; 5]> {
        let first = self.lexer.next()?;
        let mut group = [first; 5];
        for i in 1..group.len() {
            match self.lexer.next() {
                Some(token) => group[i] = token,
                None => {
                    let span = first.1.join(group[i - 1].1);
                    self.logs
                        .emit_info(
                            format!("incomplete transition ({i} of 5 tokens), ignored"),
                            span,
                        )
                        .emit_help_locless("a transition is: start input pop push end");
                    return None;
                }
            }
        }
        Some(group)
    }

    fn parse_quintuple(
        &mut self,
        [from, input, pop, push, to]: [S<&'a str>; 5],
    ) -> Option<Transition> {
        let from = self.parse_state(from);
        let input = self.parse_symbol(input, "input")?;
        let pop = self.parse_symbol(pop, "pop")?;
        let push = match push.0 {
            epsilon!(pat) => Vec::new(),
            word => word.chars().collect(),
        };
        let to = self.parse_state(to);
        Some(Transition {
            from,
            input,
            pop,
            push,
            to,
        })
    }

    fn parse_state(&mut self, S(token, span): S<&'a str>) -> State {
        match token.parse() {
            Ok(state) => State(state),
            Err(_) => {
                self.logs
                    .emit_warning(format!("state {token:?} is not an integer, using 0"), span);
                State(0)
            }
        }
    }

    fn parse_symbol(&mut self, S(token, span): S<&'a str>, position: &str) -> Option<Symbol> {
        if let epsilon!(pat) = token {
            return Some(Symbol::Epsilon);
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Symbol::Char(c)),
            _ => {
                self.logs
                    .emit_warning(
                        format!(
                            "{position} symbol {token:?} is longer than one character \
                             and can never match, transition skipped"
                        ),
                        span,
                    )
                    .emit_help_locless(concat!("epsilon is written ", epsilon!(str)));
                None
            }
        }
    }
}

/// Renders transitions back into the compact `Delta` form read by [`Parser`].
pub fn encode<'t>(transitions: impl IntoIterator<Item = &'t Transition>) -> String {
    transitions
        .into_iter()
        .map(Transition::quintuple)
        .collect::<Vec<_>>()
        .join(", ")
}
