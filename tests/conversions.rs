use pdgraph::convert::{to_array, to_bang, to_float, to_symbol};
use pdgraph::{Atom, CollectedDiagnostics, Message};

fn floats(values: &[f32]) -> Vec<Atom> {
    values.iter().map(|v| Atom::Float(*v)).collect()
}

#[test]
fn float_conversions() {
    let diag = CollectedDiagnostics::new();
    assert_eq!(to_float(&Message::parse("3.5 foo"), &diag), Some(3.5));
    assert_eq!(to_float(&Message::parse("symbol bar"), &diag), Some(0.0));
    assert_eq!(to_float(&Message::parse("-2 x"), &diag), Some(-2.0));
    assert!(diag.is_empty());

    assert_eq!(to_float(&Message::parse("notanumber"), &diag), None);
    assert_eq!(to_float(&Message::Bang, &diag), None);
    assert_eq!(to_float(&Message::parse("list -2 x"), &diag), None);
    let reports = diag.reports();
    assert_eq!(reports.len(), 3);
    assert!(reports[0].contains("notanumber"));
    assert!(reports[2].contains("list -2 x"));
}

#[test]
fn symbol_conversions() {
    let diag = CollectedDiagnostics::new();
    assert_eq!(
        to_symbol(&Message::parse("4 5"), &diag),
        Some(Message::Symbol("float".into()))
    );
    assert_eq!(
        to_symbol(&Message::parse("symbol foo"), &diag),
        Some(Message::Symbol("foo".into()))
    );
    assert!(diag.is_empty());
    assert_eq!(to_symbol(&Message::parse("foo bar"), &diag), None);
    assert_eq!(diag.reports().len(), 1);
}

#[test]
fn bang_is_total() {
    for text in ["bang", "1", "symbol x", "a b c", ""] {
        assert_eq!(to_bang(&Message::parse(text)), Message::Bang);
    }
}

#[test]
fn array_conversions() {
    assert_eq!(to_array(&Message::parse("list 1 2 3")), floats(&[1.0, 2.0, 3.0]));
    assert_eq!(to_array(&Message::Float(5.0)), floats(&[5.0]));
    assert_eq!(
        to_array(&Message::parse("a b")),
        vec![Atom::Symbol("a".into()), Atom::Symbol("b".into())]
    );
    assert_eq!(
        to_array(&Message::parse("symbol z")),
        vec![Atom::Symbol("symbol".into()), Atom::Symbol("z".into())]
    );
    assert!(to_array(&Message::parse("list")).is_empty());
    assert_eq!(to_array(&Message::parse("list a")), vec![Atom::Symbol("a".into())]);
}

#[test]
fn text_form_reads_back() {
    for text in ["bang", "3.5", "symbol foo", "list 1 2 a", "set 1 2", "symbol two\\ words"] {
        assert_eq!(Message::parse(text).to_string(), text);
    }
}
