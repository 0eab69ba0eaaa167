use crate::loader::{Span, Spanned};

/// Splits a `Delta` string into tokens. Commas and whitespace are both
/// separators and runs of them collapse, so `0,a, Z` and `0 a Z` lex alike.
#[derive(Clone, Copy, Debug)]
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, position: 0 }
    }

    fn consume(&mut self) -> Option<char> {
        let next = self.peek()?;
        self.position += next.len_utf8();
        Some(next)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position..)?.chars().next()
    }
}

fn separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Spanned<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(c) = self.peek()
            && separator(c)
        {
            self.consume();
        }

        let start = self.position;
        self.consume()?;
        while let Some(c) = self.peek()
            && !separator(c)
        {
            self.consume();
        }

        Some(Spanned(
            &self.input[start..self.position],
            Span(start, self.position),
        ))
    }
}

#[test]
fn tokenizer() {
    let lex = |src| Lexer::new(src).map(|Spanned(t, _)| t).collect::<Vec<_>>();

    assert!(lex("").is_empty());
    assert!(lex(" ,, \n\t").is_empty());
    assert_eq!(lex("0 ( λ ( 0"), ["0", "(", "λ", "(", "0"]);
    assert_eq!(lex("0,a, Z,aZ ,1"), ["0", "a", "Z", "aZ", "1"]);
    assert_eq!(lex("  1\n\tλ  "), ["1", "λ"]);
}

#[test]
fn spans_point_into_source() {
    let src = "0, λ Z";
    let tokens = Lexer::new(src).collect::<Vec<_>>();
    for Spanned(token, Span(start, end)) in tokens {
        assert_eq!(&src[start..end], token);
    }
}
