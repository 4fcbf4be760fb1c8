//! Control message payloads and their text form.

#![forbid(unsafe_code)]

use std::fmt;

/// Selector of a bang message.
pub const BANG: &str = "bang";
/// Selector marking a symbol message.
pub const SYMBOL: &str = "symbol";
/// Optional leading tag of a list message in its text form.
pub const LIST: &str = "list";

/// One element of a list message.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Float(f32),
    Symbol(String),
}

impl Atom {
    /// Classify a single token.
    pub fn from_token(token: &str) -> Self {
        match parse_number(token) {
            Some(value) => Atom::Float(value),
            None => Atom::Symbol(token.to_string()),
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Atom::Float(f) => Some(*f),
            Atom::Symbol(_) => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Float(_) => None,
            Atom::Symbol(s) => Some(s),
        }
    }
}

impl From<f32> for Atom {
    fn from(value: f32) -> Self {
        Atom::Float(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(value.to_string())
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(v) => write!(f, "{}", v),
            Atom::Symbol(s) => write_escaped(f, s),
        }
    }
}

/// Write a symbol with whitespace and backslashes escaped by a backslash.
fn write_escaped(f: &mut fmt::Formatter<'_>, symbol: &str) -> fmt::Result {
    for c in symbol.chars() {
        if c.is_whitespace() || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

/// Split on unescaped whitespace; a backslash keeps the next character.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                current.push(escaped);
            }
            in_token = true;
        } else if c.is_whitespace() {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
        } else {
            current.push(c);
            in_token = true;
        }
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// A discrete control event travelling through message ports.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Bang,
    Float(f32),
    /// Symbol message; the payload excludes the `symbol` selector.
    Symbol(String),
    /// List message. Parsed text keeps a leading `list` tag as its first
    /// atom; [`crate::convert::to_array`] drops it.
    List(Vec<Atom>),
}

impl Message {
    /// Parse the whitespace-separated text form of a message.
    ///
    /// `bang` alone is a bang, a lone number is a float, `symbol x` is a
    /// symbol, every other token sequence (a leading `list` tag included) is
    /// a list. A backslash escapes whitespace inside a symbol.
    pub fn parse(text: &str) -> Self {
        let tokens = tokenize(text);
        match tokens.as_slice() {
            [] => Message::List(Vec::new()),
            [only] if only == BANG => Message::Bang,
            [first, rest @ ..] if first == SYMBOL => {
                Message::Symbol(rest.first().cloned().unwrap_or_default())
            }
            _ => {
                let atoms: Vec<Atom> = tokens.iter().map(|t| Atom::from_token(t)).collect();
                match atoms.as_slice() {
                    [Atom::Float(v)] => Message::Float(*v),
                    _ => Message::List(atoms),
                }
            }
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn selector(&self) -> &'static str {
        match self {
            Message::Bang => BANG,
            Message::Float(_) => "float",
            Message::Symbol(_) => SYMBOL,
            Message::List(_) => LIST,
        }
    }
}

impl From<f32> for Message {
    fn from(value: f32) -> Self {
        Message::Float(value)
    }
}

impl From<Vec<Atom>> for Message {
    fn from(atoms: Vec<Atom>) -> Self {
        Message::List(atoms)
    }
}

/// Text form. It parses back to the same message, except that a list which
/// would read as another selector comes back with a leading `list` tag.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Bang => f.write_str(BANG),
            Message::Float(v) => write!(f, "{}", v),
            Message::Symbol(s) if s.is_empty() => f.write_str(SYMBOL),
            Message::Symbol(s) => {
                write!(f, "{} ", SYMBOL)?;
                write_escaped(f, s)
            }
            Message::List(atoms) => {
                let needs_tag = match atoms.as_slice() {
                    [] | [Atom::Float(_)] => true,
                    [Atom::Symbol(s)] if s == BANG => true,
                    [Atom::Symbol(s), ..] => s == SYMBOL,
                    _ => false,
                };
                if needs_tag {
                    f.write_str(LIST)?;
                    if !atoms.is_empty() {
                        f.write_str(" ")?;
                    }
                }
                for (i, atom) in atoms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", atom)?;
                }
                Ok(())
            }
        }
    }
}

/// Parse a token as a finite number; `nan` and `inf` stay symbols.
pub fn parse_number(token: &str) -> Option<f32> {
    token.parse::<f32>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_selectors() {
        assert_eq!(Message::parse("bang"), Message::Bang);
        assert_eq!(Message::parse(" 3.5 "), Message::Float(3.5));
        assert_eq!(Message::parse("symbol foo"), Message::Symbol("foo".into()));
        assert_eq!(Message::parse("symbol"), Message::Symbol(String::new()));
        assert_eq!(
            Message::parse("list 1 2 a"),
            Message::List(vec!["list".into(), Atom::Float(1.0), Atom::Float(2.0), "a".into()])
        );
        assert_eq!(Message::parse(""), Message::List(vec![]));
    }

    #[test]
    fn bang_with_arguments_is_a_list() {
        assert_eq!(
            Message::parse("bang 1"),
            Message::List(vec!["bang".into(), Atom::Float(1.0)])
        );
    }

    #[test]
    fn non_finite_tokens_stay_symbols() {
        assert_eq!(Atom::from_token("nan"), Atom::Symbol("nan".into()));
        assert_eq!(Atom::from_token("inf"), Atom::Symbol("inf".into()));
    }

    #[test]
    fn display_reads_back() {
        for text in ["bang", "3.5", "symbol foo", "list 1 2 3", "a b", "list bang", "list"] {
            let msg = Message::parse(text);
            assert_eq!(msg.to_string(), text);
            assert_eq!(Message::parse(&msg.to_string()), msg);
        }
    }

    #[test]
    fn lists_that_look_like_selectors_get_a_tag() {
        let one = Message::List(vec![Atom::Float(1.0)]);
        assert_eq!(one.to_string(), "list 1");
        let bang = Message::List(vec!["bang".into()]);
        assert_eq!(bang.to_string(), "list bang");
        assert_eq!(Message::List(vec![]).to_string(), "list");
        assert_eq!(Message::List(vec![Atom::Float(1.0), Atom::Float(2.0)]).to_string(), "1 2");
    }

    #[test]
    fn whitespace_in_symbols_is_escaped() {
        let msg = Message::Symbol("a b".into());
        assert_eq!(msg.to_string(), "symbol a\\ b");
        assert_eq!(Message::parse(&msg.to_string()), msg);

        let list = Message::List(vec!["set".into(), "two words".into(), "back\\slash".into()]);
        assert_eq!(list.to_string(), "set two\\ words back\\\\slash");
        assert_eq!(Message::parse(&list.to_string()), list);
    }
}
