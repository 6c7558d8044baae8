//! A thin skin over the compiler for the common case of matching several
//! named patterns against a byte stream and splitting it into tokens.
//! Not itself a core algebra operation.
//!
//! Patterns are combined into one alternation, each branch tagged with a
//! synthetic final action `token:<name>` whose priority is its
//! declaration index (earlier patterns win ties) — the compiler is then
//! asked for an unambiguous machine, so two patterns matching the exact
//! same language at the same priority is a compile error rather than
//! silently picking one.

use crate::action::{Action, ActionName};
use crate::ast::{Ast, AstBuilder, NodeId};
use crate::builder::{compile, CompileOptions};
use crate::error::CompileResult;
use crate::machine::Machine;

const TOKEN_ACTION_PREFIX: &str = "token:";

/// Combine named patterns into one [`Ast`], ready for [`Tokenizer::new`].
pub fn combine_patterns(builder: &mut AstBuilder, patterns: &[(&str, NodeId)]) -> NodeId {
    let mut branches = Vec::with_capacity(patterns.len());
    for (index, (name, node)) in patterns.iter().enumerate() {
        let priority = (patterns.len() - index) as i32;
        let action = Action::new(format!("{TOKEN_ACTION_PREFIX}{name}"), priority);
        branches.push(builder.on_final(*node, [action]));
    }
    let mut iter = branches.into_iter();
    let first = iter.next().expect("combine_patterns requires at least one pattern");
    iter.fold(first, |acc, next| builder.alt(acc, next))
}

pub struct Tokenizer {
    machine: Machine,
}

impl Tokenizer {
    pub fn compile(ast: &Ast) -> CompileResult<Tokenizer> {
        let machine = compile(ast, CompileOptions { unambiguous: true, ..CompileOptions::default() })?;
        Ok(Tokenizer { machine })
    }

    pub fn tokens<'a>(&'a self, data: &'a [u8]) -> TokenStream<'a> {
        TokenStream { tokenizer: self, data, pos: 0 }
    }

    /// Greedily match the longest prefix of `data` recognized starting at
    /// position 0, returning its length and the name of the highest
    /// priority `token:` action that fired at the longest accepting
    /// position reached.
    fn longest_match(&self, data: &[u8]) -> Option<(usize, String)> {
        let mut state = self.machine.start();
        let mut best: Option<(usize, String)> = None;

        for (i, &byte) in data.iter().enumerate() {
            let class = self.machine.class_of(byte);
            let row = self
                .machine
                .state(state)
                .transitions
                .iter()
                .find(|(lo, hi, _, _)| *lo <= class && class <= *hi);
            let Some((_, _, target, names)) = row else { break };

            state = *target;
            if let Some(name) = last_token_name(names) {
                best = Some((i + 1, name));
            } else if self.machine.state(state).accept {
                if let Some(name) = last_token_name(&self.machine.state(state).eof_actions) {
                    best = Some((i + 1, name));
                }
            }
        }

        best
    }
}

fn last_token_name(names: &[ActionName]) -> Option<String> {
    names
        .iter()
        .find(|n| n.as_str().starts_with(TOKEN_ACTION_PREFIX))
        .map(|n| n.as_str()[TOKEN_ACTION_PREFIX.len()..].to_string())
}

/// A single recognized span. `name` is `None` for bytes that matched no
/// pattern. Unmatched input is reported as its own span.
pub struct Token {
    pub start: usize,
    pub length: usize,
    pub name: Option<String>,
}

pub struct TokenStream<'a> {
    tokenizer: &'a Tokenizer,
    data: &'a [u8],
    pos: usize,
}

impl Iterator for TokenStream<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.pos >= self.data.len() {
            return None;
        }

        if let Some((length, name)) = self.tokenizer.longest_match(&self.data[self.pos..]) {
            let token = Token { start: self.pos, length, name: Some(name) };
            self.pos += length;
            return Some(token);
        }

        let start = self.pos;
        let mut length = 0;
        while self.pos < self.data.len()
            && self.tokenizer.longest_match(&self.data[self.pos..]).is_none()
        {
            self.pos += 1;
            length += 1;
        }
        Some(Token { start, length, name: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byteset::ByteSet;

    #[test]
    fn splits_words_and_digits() {
        let mut b = AstBuilder::new();
        let letters = b.symbol(ByteSet::from_ranges([(b'a', b'z')])).unwrap();
        let word = b.rep1(letters);
        let digits = b.symbol(ByteSet::from_ranges([(b'0', b'9')])).unwrap();
        let number = b.rep1(digits);
        let root = combine_patterns(&mut b, &[("word", word), ("number", number)]);
        let ast = b.finish(root);
        let tokenizer = Tokenizer::compile(&ast).unwrap();

        let tokens: Vec<Token> = tokenizer.tokens(b"ab 12").collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].name.as_deref(), Some("word"));
        assert_eq!(tokens[1].name, None);
        assert_eq!(tokens[2].name.as_deref(), Some("number"));
    }
}
