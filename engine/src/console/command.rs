// Console command construction
// All command text sent to the director is serialized here

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Flag(String),
    Arg { key: String, value: String, quote: bool },
}

/// A console command made of a verb, `key=value` arguments and bare flags.
///
/// Values are emitted bare when they are plain tokens and double-quoted
/// otherwise; inside quotes `\` and `"` are backslash-escaped. Control
/// characters never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleCommand {
    verb: String,
    tokens: Vec<Token>,
}

impl ConsoleCommand {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            tokens: Vec::new(),
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Append `key=value`, quoting the value only if it needs it
    pub fn arg(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.tokens.push(Token::Arg {
            key: key.to_string(),
            value: sanitize_text(value.as_ref()),
            quote: false,
        });
        self
    }

    /// Append `key="value"` with the value always quoted
    pub fn quoted_arg(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.tokens.push(Token::Arg {
            key: key.to_string(),
            value: sanitize_text(value.as_ref()),
            quote: true,
        });
        self
    }

    /// Append `key=value` when a value is present
    pub fn arg_opt(self, key: &str, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(value) => self.arg(key, value),
            None => self,
        }
    }

    /// Append a bare keyword such as `all` or `yes`
    pub fn flag(mut self, flag: &str) -> Self {
        self.tokens.push(Token::Flag(flag.to_string()));
        self
    }

    pub fn flag_if(self, condition: bool, flag: &str) -> Self {
        if condition {
            self.flag(flag)
        } else {
            self
        }
    }

    /// Command text as sent to the director
    pub fn render(&self) -> String {
        let mut out = self.verb.clone();
        for token in &self.tokens {
            out.push(' ');
            match token {
                Token::Flag(flag) => out.push_str(flag),
                Token::Arg { key, value, quote } => {
                    out.push_str(key);
                    out.push('=');
                    if *quote || needs_quoting(value) {
                        push_quoted(&mut out, value);
                    } else {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for ConsoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Drop C0 control characters and DEL
pub fn sanitize_text(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(*c, '\u{0}'..='\u{1f}' | '\u{7f}'))
        .collect()
}

fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || c == '"' || c == '\\' || c == '=')
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
