//! End-to-end tests for the wire command protocol.
//!
//! Each test drives an interpreter with textual commands against an
//! in-memory atom space and checks the exact replies, the way a remote
//! client would see them.

use std::sync::Arc;

use hyperatom::command::{CommandError, Interpreter};
use hyperatom::space::AtomSpace;
use hyperatom::types::TypeRegistry;

fn setup() -> (Interpreter, Arc<AtomSpace>) {
    let space = AtomSpace::new("main", Arc::new(TypeRegistry::new())).unwrap();
    (Interpreter::new(), Arc::new(space))
}

fn run(interp: &mut Interpreter, space: &Arc<AtomSpace>, cmd: &str) -> String {
    interp.interpret(space, cmd).unwrap()
}

#[test]
fn set_value_then_read_it_back() {
    let (mut interp, space) = setup();
    let reply = run(
        &mut interp,
        &space,
        r#"(cog-set-value! (Concept "foo") (Predicate "key") (FloatValue 1 2 3))"#,
    );
    assert_eq!(reply, "()\n");

    let reply = run(
        &mut interp,
        &space,
        r#"(cog-value (Concept "foo") (Predicate "key"))"#,
    );
    assert_eq!(reply, "(FloatValue 1 2 3)");
}

#[test]
fn missing_value_is_empty_list() {
    let (mut interp, space) = setup();
    let reply = run(
        &mut interp,
        &space,
        r#"(cog-value (Concept "foo") (Predicate "nothing"))"#,
    );
    assert_eq!(reply, "()");
}

#[test]
fn clear_then_get_atoms_is_empty() {
    let (mut interp, space) = setup();
    run(&mut interp, &space, r#"(cog-set-tv! (Concept "a") (stv 0.5 0.5))"#);
    assert_ne!(run(&mut interp, &space, "(cog-get-atoms 'Concept #t)"), "()");

    assert_eq!(run(&mut interp, &space, "(cog-atomspace-clear)"), "#t\n");
    assert_eq!(run(&mut interp, &space, "(cog-get-atoms 'Concept #t)"), "()");
}

#[test]
fn command_without_open_paren_is_a_syntax_error() {
    let (mut interp, space) = setup();
    let err = interp
        .interpret(&space, r#"cog-node 'Concept "foo""#)
        .unwrap_err();
    assert!(matches!(err, CommandError::Syntax { .. }));
}

#[test]
fn node_lookup_returns_the_same_atom_every_time() {
    let (mut interp, space) = setup();
    assert_eq!(
        run(&mut interp, &space, r#"(cog-node 'Concept "foo")"#),
        "()\n"
    );

    run(&mut interp, &space, r#"(cog-set-tv! (Concept "foo") (stv 1 0.5))"#);
    let first = run(&mut interp, &space, r#"(cog-node 'Concept "foo")"#);
    let second = run(&mut interp, &space, r#"(cog-node 'ConceptNode "foo")"#);
    assert_eq!(first, r#"(Concept "foo")"#);
    assert_eq!(first, second);

    let stored = space.get_node(hyperatom::types::builtin::CONCEPT_NODE, "foo").unwrap().unwrap();
    let again = space.get_node(hyperatom::types::builtin::CONCEPT_NODE, "foo").unwrap().unwrap();
    assert!(Arc::ptr_eq(&stored, &again));
    assert!(stored.id().is_some());
}

#[test]
fn link_lookup_and_incoming_sets() {
    let (mut interp, space) = setup();
    run(
        &mut interp,
        &space,
        r#"(cog-set-value! (List (Concept "a") (Concept "b")) (Predicate "k") (StringValue "x"))"#,
    );

    assert_eq!(
        run(&mut interp, &space, r#"(cog-link 'List (Concept "a") (Concept "b"))"#),
        r#"(List (Concept "a") (Concept "b"))"#
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-link 'List (Concept "b") (Concept "a"))"#),
        "()\n"
    );

    assert_eq!(
        run(&mut interp, &space, r#"(cog-incoming-set (Concept "a"))"#),
        "((List (Concept \"a\") (Concept \"b\")))\n"
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-incoming-by-type (Concept "a") 'List)"#),
        "((List (Concept \"a\") (Concept \"b\")))\n"
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-incoming-by-type (Concept "a") 'Set)"#),
        "()\n"
    );
}

#[test]
fn unordered_link_lookup_ignores_argument_order() {
    let (mut interp, space) = setup();
    run(
        &mut interp,
        &space,
        r#"(cog-set-tv! (Set (Concept "x") (Concept "y") (Concept "z")) (stv 0.1 0.2))"#,
    );
    let forward = run(&mut interp, &space, r#"(cog-link 'Set (Concept "x") (Concept "y") (Concept "z"))"#);
    let backward = run(&mut interp, &space, r#"(cog-link 'Set (Concept "z") (Concept "y") (Concept "x"))"#);
    assert_ne!(forward, "()\n");
    assert_eq!(forward, backward);
}

#[test]
fn keys_alist_lists_every_value() {
    let (mut interp, space) = setup();
    run(
        &mut interp,
        &space,
        r#"(cog-set-values! (Concept "foo") (((Predicate "a") . (FloatValue 1)) ((Predicate "b") . (StringValue "s"))))"#,
    );
    let reply = run(&mut interp, &space, r#"(cog-keys->alist (Concept "foo"))"#);
    assert_eq!(
        reply,
        "(((Predicate \"a\") . (FloatValue 1))((Predicate \"b\") . (StringValue \"s\")))\n"
    );
}

#[test]
fn set_values_accepts_spelled_out_alist() {
    let (mut interp, space) = setup();
    run(
        &mut interp,
        &space,
        r#"(cog-set-values! (Concept "foo") (alist (cons (Predicate "bar") (stv 0.9 0.8))))"#,
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-value (Concept "foo") (Predicate "bar"))"#),
        "(SimpleTruthValue 0.9 0.8)"
    );
}

#[test]
fn extract_reports_refusal_and_absence() {
    let (mut interp, space) = setup();
    run(
        &mut interp,
        &space,
        r#"(cog-set-tv! (List (Concept "a") (Concept "b")) (stv 1 1))"#,
    );

    assert_eq!(run(&mut interp, &space, r#"(cog-extract! (Concept "a"))"#), "#f\n");
    assert_eq!(run(&mut interp, &space, r#"(cog-extract! (Concept "ghost"))"#), "#t\n");
    assert_eq!(
        run(&mut interp, &space, r#"(cog-extract-recursive! (Concept "a"))"#),
        "#t\n"
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-link 'List (Concept "a") (Concept "b"))"#),
        "()\n"
    );
    assert_eq!(
        run(&mut interp, &space, "(cog-get-atoms 'Concept)"),
        "((Concept \"b\"))"
    );
}

#[test]
fn get_atoms_subtype_flag() {
    let (mut interp, space) = setup();
    run(&mut interp, &space, r#"(cog-set-tv! (Concept "a") (stv 1 1))"#);
    run(&mut interp, &space, r#"(cog-set-tv! (Predicate "p") (stv 1 1))"#);

    assert_eq!(run(&mut interp, &space, "(cog-get-atoms 'Node #f)"), "()");
    assert_eq!(run(&mut interp, &space, "(cog-get-atoms 'Node)"), "()");
    assert_eq!(
        run(&mut interp, &space, "(cog-get-atoms 'Node #t)"),
        "((Concept \"a\")(Predicate \"p\"))"
    );
}

#[test]
fn read_only_space_refuses_truth_values() {
    let (mut interp, space) = setup();
    space.set_read_only(true);
    assert_eq!(
        run(&mut interp, &space, r#"(cog-set-tv! (Concept "a") (stv 0.5 0.5))"#),
        "#f\n"
    );
    assert!(space.is_empty());
}

#[test]
fn read_only_space_refuses_values_and_clear() {
    let (mut interp, space) = setup();
    run(&mut interp, &space, r#"(cog-set-tv! (Concept "kept") (stv 0.5 0.5))"#);
    space.set_read_only(true);

    assert_eq!(
        run(
            &mut interp,
            &space,
            r#"(cog-set-value! (Concept "foo") (Predicate "key") (FloatValue 1 2 3))"#
        ),
        "#f\n"
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-value (Concept "foo") (Predicate "key"))"#),
        "()"
    );
    assert_eq!(
        run(
            &mut interp,
            &space,
            r#"(cog-set-values! (Concept "kept") (((Predicate "a") . (FloatValue 1))))"#
        ),
        "#f\n"
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-keys->alist (Concept "kept"))"#),
        "()\n"
    );
    assert_eq!(run(&mut interp, &space, "(cog-atomspace-clear)"), "#f\n");
    assert_eq!(space.size(), 1);
}

#[test]
fn atom_frame_annotation_selects_the_space() {
    let (mut interp, space) = setup();
    run(&mut interp, &space, r#"(define top (AtomSpace "top"))"#);

    assert_eq!(
        run(
            &mut interp,
            &space,
            r#"(cog-set-value! (Concept "x" (AtomSpace "top")) (Predicate "k") (FloatValue 1))"#
        ),
        "()\n"
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-node 'Concept "x" (AtomSpace "top"))"#),
        r#"(Concept "x" (AtomSpace "top"))"#
    );
    assert!(space.get_node(hyperatom::types::builtin::CONCEPT_NODE, "x").unwrap().is_none());

    // An encoded reply can be sent straight back.
    let encoded = run(&mut interp, &space, r#"(cog-node 'Concept "x" (AtomSpace "top"))"#);
    let reply = run(
        &mut interp,
        &space,
        &format!(r#"(cog-value {encoded} (Predicate "k"))"#),
    );
    assert_eq!(reply, "(FloatValue 1)");
}

#[test]
fn define_enables_frame_addressing() {
    let (mut interp, space) = setup();
    assert_eq!(run(&mut interp, &space, "(cog-atomspace)"), "()\n");

    assert_eq!(
        run(&mut interp, &space, r#"(define top (AtomSpace "top" (AtomSpace "mid")))"#),
        "()\n"
    );
    assert!(interp.context().is_multi_space());

    run(
        &mut interp,
        &space,
        r#"(cog-set-tv! (Concept "in-top") (stv 0.5 0.5) (AtomSpace "top"))"#,
    );
    run(&mut interp, &space, r#"(cog-set-tv! (Concept "in-main") (stv 0.5 0.5))"#);

    let rendering = run(&mut interp, &space, "(cog-atomspace)");
    assert!(rendering.contains("in-top"));
    assert!(!rendering.contains("in-main"));

    assert_eq!(
        run(&mut interp, &space, r#"(cog-node 'Concept "in-top" (AtomSpace "top"))"#),
        r#"(Concept "in-top" (AtomSpace "top"))"#
    );
    assert_eq!(
        run(&mut interp, &space, r#"(cog-node 'Concept "in-main" (AtomSpace "top"))"#),
        r#"(Concept "in-main" (AtomSpace "main"))"#
    );

    let atoms = run(&mut interp, &space, "(cog-get-atoms 'Concept)");
    assert!(atoms.contains(r#"(Concept "in-top" (AtomSpace "top"))"#));
    assert!(atoms.contains(r#"(Concept "in-main" (AtomSpace "main"))"#));
}

#[test]
fn second_define_keeps_the_first_top_space() {
    let (mut interp, space) = setup();
    run(&mut interp, &space, r#"(define a (AtomSpace "first"))"#);
    run(&mut interp, &space, r#"(define b (AtomSpace "second"))"#);
    assert_eq!(interp.context().top_space().unwrap().name(), "first");
}

#[test]
fn unknown_types_and_bad_arguments_are_errors() {
    let (mut interp, space) = setup();
    assert!(matches!(
        interp.interpret(&space, r#"(cog-node 'Bogus "x")"#),
        Err(CommandError::UnknownType { .. })
    ));
    assert!(matches!(
        interp.interpret(&space, r#"(cog-value (Concept "x"))"#),
        Err(CommandError::Decode { .. })
    ));
    assert!(matches!(
        interp.interpret(&space, r#"(cog-link 'Concept (Concept "x"))"#),
        Err(CommandError::Atom(_))
    ));
}
