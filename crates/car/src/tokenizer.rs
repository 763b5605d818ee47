//! Free-text tokenizer for text commands.
//!
//! Tokens are separated by unescaped, unquoted spaces. A `"` toggles quoting
//! and is dropped from the token. Recognised escapes are `\\`, `\"` and `\n`;
//! any other escape is kept verbatim, backslash included.
//!
//! [`filter_kwargs`] is a second pass that pulls `-name value` pairs out of
//! the text before positional parsing.

use crate::error::CarError;
use indexmap::IndexMap;
use thiserror::Error;

/// Tokenizer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("Missing value for flag `-{0}`!")]
    MissingFlagValue(String),
}

impl From<TokenizeError> for CarError {
    fn from(err: TokenizeError) -> Self {
        CarError::argument(err.to_string())
    }
}

/// Cursor over a piece of text, yielding one token at a time.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    chars: Vec<char>,
    idx: usize,
}

impl Tokenizer {
    pub fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            idx: 0,
        }
    }

    fn skip_spaces(&mut self) {
        while self.idx < self.chars.len() && self.chars[self.idx] == ' ' {
            self.idx += 1;
        }
    }

    /// Push the character under the cursor, resolving an escape if present.
    fn push_char(&mut self, word: &mut String) {
        let c = self.chars[self.idx];
        if c == '\\' && self.idx + 1 < self.chars.len() {
            let escaped = self.chars[self.idx + 1];
            match escaped {
                '\\' | '"' => word.push(escaped),
                'n' => word.push('\n'),
                other => {
                    word.push('\\');
                    word.push(other);
                }
            }
            self.idx += 1;
        } else {
            word.push(c);
        }
    }

    /// Return the next token, or an empty string at end of input.
    pub fn next_token(&mut self) -> String {
        self.next_token_spanned().0
    }

    /// Like [`next_token`](Self::next_token), also returning the character
    /// range the token occupied in the input.
    fn next_token_spanned(&mut self) -> (String, usize, usize) {
        let mut quoted = false;
        let mut word = String::new();

        self.skip_spaces();
        let start = self.idx;

        while self.idx < self.chars.len() && (quoted || self.chars[self.idx] != ' ') {
            if self.chars[self.idx] == '"' {
                quoted = !quoted;
            } else {
                self.push_char(&mut word);
            }
            self.idx += 1;
        }

        (word, start, self.idx)
    }

    /// True when only spaces remain.
    pub fn is_eof(&mut self) -> bool {
        self.skip_spaces();
        self.idx >= self.chars.len()
    }

    /// The unparsed rest of the input, trimmed.
    pub fn remaining(&self) -> String {
        let rest: String = self.chars[self.idx.min(self.chars.len())..].iter().collect();
        rest.trim().to_string()
    }

    pub fn reset(&mut self) {
        self.idx = 0;
    }

    fn raw(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }
}

/// A raw token is a flag when it is `-` followed by an ASCII letter.
fn is_flag(raw: &str) -> bool {
    let mut chars = raw.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Extract `-name value` pairs that sit outside quoted spans.
///
/// Returns the remaining positional text and the flag map. Only the flag
/// spans (and the spaces after them) are cut; everything else keeps its
/// original spelling and spacing, and input without flags comes back as-is.
/// The value is read with normal token rules, so `-title "two words"` works.
/// A repeated flag keeps its last value.
pub fn filter_kwargs(text: &str) -> Result<(String, IndexMap<String, String>), TokenizeError> {
    let mut tok = Tokenizer::new(text);
    let mut kwargs = IndexMap::new();
    let mut cuts = Vec::new();

    while !tok.is_eof() {
        let (word, start, end) = tok.next_token_spanned();
        if !is_flag(&tok.raw(start, end)) {
            continue;
        }

        let name = word.trim_start_matches('-').to_string();
        if tok.is_eof() {
            return Err(TokenizeError::MissingFlagValue(name));
        }
        let value = tok.next_token();
        tok.skip_spaces();
        kwargs.insert(name, value);
        cuts.push((start, tok.idx));
    }

    if cuts.is_empty() {
        return Ok((text.to_string(), kwargs));
    }

    let mut rest = String::with_capacity(text.len());
    let mut from = 0;
    for (start, end) in cuts {
        rest.extend(&tok.chars[from..start]);
        from = end;
    }
    rest.extend(&tok.chars[from..]);
    Ok((rest.trim_end().to_string(), kwargs))
}
