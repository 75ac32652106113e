// src/config/script.rs

//! Interpreter for configure-scripts.
//!
//! A configure-script is the non-TOML config file format. It looks like
//! this:
//!
//! ```text
//! """Set up the pod environment."""
//!
//! launch_script = r"""#! /bin/bash
//! python /path/to/job.py
//! """
//!
//! configure_tpc(
//!     project='my-gcp-project',
//!     zone='europe-west4-b',
//!     name='my-tpu-pod',
//!     launch_script=launch_script,
//! )
//! ```
//!
//! Only three statement forms are understood:
//! - bare string literals (docstrings), which are ignored,
//! - `NAME = <expr>` assignments,
//! - calls to `configure_tpc(key=<expr>, ...)` (or `configure(...)`).
//!
//! An `<expr>` is a string literal (quotes, triple quotes, `r` prefix,
//! adjacent literals are concatenated), `True`, `False`, `None` or a name
//! assigned earlier. Anything else is rejected; nothing is ever executed.

use std::collections::HashMap;

use tracing::debug;

use crate::config::model::{SettingKey, SettingValue, SettingsLayer};
use crate::errors::{Result, TpcError};

/// Function names a script may call to set configuration.
pub const CONFIGURE_FUNCTIONS: [&str; 2] = ["configure_tpc", "configure"];

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Equals,
    LParen,
    RParen,
    Comma,
    Newline,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Bool(bool),
    None,
}

fn script_error(line: usize, msg: impl std::fmt::Display) -> TpcError {
    TpcError::ConfigError(format!("line {line}: {msg}"))
}

/// Interpret a configure-script and return the layer it configures.
///
/// Within one script the first value given for a key wins, so calling
/// `configure_tpc` twice never overwrites a field set by the earlier call.
pub fn interpret(source: &str) -> Result<SettingsLayer> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        vars: HashMap::new(),
        layer: SettingsLayer::new(),
    };
    parser.run()?;
    Ok(parser.layer)
}

fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    let mut line = 1;
    // Newlines inside parentheses do not end a statement.
    let mut depth = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                if depth == 0 {
                    out.push(Spanned { token: Token::Newline, line });
                }
                line += 1;
                i += 1;
            }
            ' ' | '\t' | '\r' => i += 1,
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                line += 1;
                i += 2;
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' => {
                depth += 1;
                out.push(Spanned { token: Token::LParen, line });
                i += 1;
            }
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| script_error(line, "unbalanced ')'"))?;
                out.push(Spanned { token: Token::RParen, line });
                i += 1;
            }
            ',' => {
                out.push(Spanned { token: Token::Comma, line });
                i += 1;
            }
            '=' => {
                out.push(Spanned { token: Token::Equals, line });
                i += 1;
            }
            '"' | '\'' => {
                let start_line = line;
                let value = lex_string(&chars, &mut i, &mut line, false)?;
                out.push(Spanned { token: Token::Str(value), line: start_line });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let prefixes_string = matches!(chars.get(i), Some('"') | Some('\''));
                if prefixes_string && (ident == "r" || ident == "R") {
                    let start_line = line;
                    let value = lex_string(&chars, &mut i, &mut line, true)?;
                    out.push(Spanned { token: Token::Str(value), line: start_line });
                } else {
                    out.push(Spanned { token: Token::Ident(ident), line });
                }
            }
            other => {
                return Err(script_error(line, format!("unexpected character {other:?}")));
            }
        }
    }

    if depth != 0 {
        return Err(script_error(line, "unclosed '('"));
    }
    Ok(out)
}

/// Lex a string literal starting at the opening quote at `chars[*i]`.
fn lex_string(chars: &[char], i: &mut usize, line: &mut usize, raw: bool) -> Result<String> {
    let quote = chars[*i];
    let triple = chars.get(*i + 1) == Some(&quote) && chars.get(*i + 2) == Some(&quote);
    let opened_on = *line;
    *i += if triple { 3 } else { 1 };

    let mut value = String::new();
    loop {
        let Some(&c) = chars.get(*i) else {
            return Err(script_error(opened_on, "unterminated string literal"));
        };

        if c == quote {
            if !triple {
                *i += 1;
                return Ok(value);
            }
            if chars.get(*i + 1) == Some(&quote) && chars.get(*i + 2) == Some(&quote) {
                *i += 3;
                return Ok(value);
            }
        }

        if c == '\n' {
            if !triple {
                return Err(script_error(opened_on, "unterminated string literal"));
            }
            *line += 1;
        }

        if c == '\\' {
            let Some(&next) = chars.get(*i + 1) else {
                return Err(script_error(opened_on, "unterminated string literal"));
            };
            if next == '\n' {
                *line += 1;
            }
            if raw {
                value.push('\\');
                value.push(next);
            } else {
                match next {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '\'' => value.push('\''),
                    '"' => value.push('"'),
                    '\n' => {}
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            }
            *i += 2;
            continue;
        }

        value.push(c);
        *i += 1;
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    vars: HashMap<String, Literal>,
    layer: SettingsLayer,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn current_line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        match self.next() {
            Some(t) if t.token == expected => Ok(()),
            Some(t) => Err(script_error(t.line, format!("expected {what}"))),
            None => Err(script_error(self.current_line(), format!("expected {what}"))),
        }
    }

    fn run(&mut self) -> Result<()> {
        while let Some(tok) = self.peek().cloned() {
            match tok.token {
                Token::Newline => {
                    self.pos += 1;
                }
                Token::Str(_) => {
                    // Docstring or stray literal; evaluated and dropped.
                    self.expr()?;
                    self.end_of_statement()?;
                }
                Token::Ident(name) => {
                    self.pos += 1;
                    match self.peek().map(|t| &t.token) {
                        Some(Token::Equals) => {
                            self.pos += 1;
                            let value = self.expr()?;
                            debug!(name = %name, "configure-script assignment");
                            self.vars.insert(name, value);
                        }
                        Some(Token::LParen) if CONFIGURE_FUNCTIONS.contains(&name.as_str()) => {
                            self.pos += 1;
                            self.configure_call(tok.line)?;
                        }
                        Some(Token::LParen) => {
                            return Err(script_error(
                                tok.line,
                                format!(
                                    "call to '{name}' is not allowed; only {} may be called",
                                    CONFIGURE_FUNCTIONS.join(" / ")
                                ),
                            ));
                        }
                        _ => {
                            return Err(script_error(
                                tok.line,
                                format!("unsupported statement starting with '{name}'"),
                            ));
                        }
                    }
                    self.end_of_statement()?;
                }
                _ => {
                    return Err(script_error(tok.line, "unsupported statement"));
                }
            }
        }
        Ok(())
    }

    fn end_of_statement(&mut self) -> Result<()> {
        match self.next() {
            None => Ok(()),
            Some(Spanned { token: Token::Newline, .. }) => Ok(()),
            Some(t) => Err(script_error(t.line, "expected end of statement")),
        }
    }

    fn expr(&mut self) -> Result<Literal> {
        let Some(tok) = self.next() else {
            return Err(script_error(self.current_line(), "expected a value"));
        };
        match tok.token {
            Token::Str(mut s) => {
                while let Some(Spanned { token: Token::Str(more), .. }) = self.peek() {
                    s.push_str(more);
                    self.pos += 1;
                }
                Ok(Literal::Str(s))
            }
            Token::Ident(name) => match name.as_str() {
                "True" => Ok(Literal::Bool(true)),
                "False" => Ok(Literal::Bool(false)),
                "None" => Ok(Literal::None),
                _ => self
                    .vars
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| script_error(tok.line, format!("name '{name}' is not defined"))),
            },
            _ => Err(script_error(tok.line, "expected a value")),
        }
    }

    fn configure_call(&mut self, line: usize) -> Result<()> {
        loop {
            let Some(tok) = self.next() else {
                return Err(script_error(line, "unclosed configure call"));
            };
            let key_name = match tok.token {
                Token::RParen => return Ok(()),
                Token::Ident(name) => name,
                _ => {
                    return Err(script_error(
                        tok.line,
                        "configure call only accepts keyword arguments",
                    ));
                }
            };
            self.expect(Token::Equals, "'=' after keyword argument")?;

            let key: SettingKey = key_name
                .parse()
                .map_err(|_| script_error(tok.line, format!("Invalid config key: {key_name}")))?;
            let value = self.expr()?;
            let value = match value {
                Literal::Str(s) => Some(SettingValue::Text(s)),
                Literal::Bool(b) => Some(SettingValue::Bool(b)),
                Literal::None => None,
            };
            if let Some(value) = value {
                let stored = self
                    .layer
                    .set_if_absent(key, value)
                    .map_err(|e| script_error(tok.line, e))?;
                if !stored {
                    debug!(key = %key, "configure-script key already set; keeping first value");
                }
            }

            match self.next() {
                Some(Spanned { token: Token::Comma, .. }) => continue,
                Some(Spanned { token: Token::RParen, .. }) => return Ok(()),
                Some(t) => return Err(script_error(t.line, "expected ',' or ')'")),
                None => return Err(script_error(line, "unclosed configure call")),
            }
        }
    }
}
