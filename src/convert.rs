//! Coercions between message representations.
//!
//! `to_float` and `to_symbol` are partial: a payload whose leading token has
//! the wrong shape is reported to the [`Diagnostics`] sink and yields `None`,
//! so block processing can carry on with a default. `to_bang` and `to_array`
//! are total.

#![forbid(unsafe_code)]

use crate::diagnostics::Diagnostics;
use crate::message::{Atom, Message, BANG, LIST, SYMBOL};

/// Leading token of a message in its text form.
fn first_token(msg: &Message) -> Option<Atom> {
    match msg {
        Message::Bang => Some(Atom::Symbol(BANG.to_string())),
        Message::Float(v) => Some(Atom::Float(*v)),
        Message::Symbol(_) => Some(Atom::Symbol(SYMBOL.to_string())),
        Message::List(atoms) => atoms.first().cloned(),
    }
}

/// Coerce to a number. A leading `symbol` selector reads as 0.
pub fn to_float(msg: &Message, diag: &dyn Diagnostics) -> Option<f32> {
    match first_token(msg) {
        Some(Atom::Float(v)) => Some(v),
        Some(Atom::Symbol(s)) if s == SYMBOL => Some(0.0),
        _ => {
            diag.report(&format!("cannot convert `{}` to a float", msg));
            None
        }
    }
}

/// Coerce to a symbol message.
///
/// A numeric payload becomes the symbol `float`; a `symbol x` payload keeps
/// `x`.
pub fn to_symbol(msg: &Message, diag: &dyn Diagnostics) -> Option<Message> {
    if let Message::Symbol(s) = msg {
        return Some(Message::Symbol(s.clone()));
    }
    match first_token(msg) {
        Some(Atom::Float(_)) => Some(Message::Symbol("float".to_string())),
        Some(Atom::Symbol(s)) if s == SYMBOL => {
            let name = match msg {
                Message::List(atoms) => match atoms.get(1) {
                    Some(Atom::Symbol(name)) => name.clone(),
                    Some(Atom::Float(v)) => v.to_string(),
                    None => String::new(),
                },
                _ => String::new(),
            };
            Some(Message::Symbol(name))
        }
        _ => {
            diag.report(&format!("cannot convert `{}` to a symbol", msg));
            None
        }
    }
}

/// Any message becomes a bang.
pub fn to_bang(_msg: &Message) -> Message {
    Message::Bang
}

/// Flatten a message into its atoms, dropping a leading `list` tag.
pub fn to_array(msg: &Message) -> Vec<Atom> {
    match msg {
        Message::Float(v) => vec![Atom::Float(*v)],
        Message::List(atoms) => match atoms.split_first() {
            Some((Atom::Symbol(tag), rest)) if tag == LIST => rest.to_vec(),
            _ => atoms.clone(),
        },
        Message::Symbol(s) => vec![Atom::Symbol(SYMBOL.to_string()), Atom::Symbol(s.clone())],
        Message::Bang => vec![Atom::Symbol(BANG.to_string())],
    }
}
