//! Full pipeline scenarios, driven through the public API the way a
//! caller would use it: build an `Ast`, `compile` it, drive the result
//! with `Machine::run` or a `Tokenizer`. Each scenario is traced by hand
//! against the automaton the compiler is expected to build, since
//! checking the emitted Rust source would require a compiler in the
//! loop; the emitted-source tests further down only assert its shape.

use automata::action::Action;
use automata::ast::AstBuilder;
use automata::builder::AlphabetCompression;
use automata::diagnostics::RuntimeError;
use automata::emit::{self, ActionBodies, Backend, EmitConfig};
use automata::tokenizer::{combine_patterns, Tokenizer};
use automata::{compile, ByteSet, CompileError, CompileOptions};

fn validator_ast() -> automata::Ast {
    let mut b = AstBuilder::new();
    let a = b.byte(b'a');
    let bc = {
        let b_ = b.byte(b'b');
        let c_ = b.byte(b'c');
        b.concat(b_, c_)
    };
    let bc_star = b.rep(bc);
    let a_bc_star = b.concat(a, bc_star);

    let d = b.byte(b'd');
    let e = b.byte(b'e');
    let f = b.byte(b'f');
    let de = b.concat(d, e);
    let def = b.concat(de, f);

    let x = b.byte(b'x');
    let x_plus = b.rep1(x);

    let left = b.alt(a_bc_star, def);
    let root = b.alt(left, x_plus);
    b.finish(root)
}

#[test]
fn validator_accepts_every_branch_of_the_alternation() {
    let ast = validator_ast();
    let machine = compile(&ast, CompileOptions::default()).unwrap();

    for input in [&b"def"[..], &b"abcbcbcbcbc"[..], &b"xxxxxx"[..]] {
        let result = machine.run(input, true, |_| false);
        assert_eq!(result.cs, 0, "expected {:?} to be accepted", input);
    }
}

#[test]
fn validator_reports_the_byte_position_of_the_first_dead_end() {
    let ast = validator_ast();
    let machine = compile(&ast, CompileOptions::default()).unwrap();

    // Empty input matches none of the three branches. No bytes were
    // consumed, so the dead end is the start state itself.
    let result = machine.run(b"", true, |_| false);
    assert_eq!(result.cs, -1);
    let err = RuntimeError::at(b"", result.consumed);
    assert_eq!((err.line, err.column), (1, 1));

    // "abcabc": one (bc) cycle completes "abc", then a second 'a' cannot
    // start another (bc) cycle. `cs` now names the live (non-start) state
    // the dead end happened in, not a fixed sentinel.
    let result = machine.run(b"abcabc", true, |_| false);
    assert!(result.cs < 0);
    assert_eq!(result.consumed, 3);
    let err = RuntimeError::at(b"abcabc", result.consumed);
    assert_eq!((err.line, err.column), (1, 4));

    // "defdef": "def" is a closed literal, nothing may follow it.
    let result = machine.run(b"defdef", true, |_| false);
    assert!(result.cs < 0);
    assert_eq!(result.consumed, 3);
}

/// Builds `(n_i, R_i)` tokenizer ASTs the way a caller combining named
/// patterns would, then checks the token stream matches what a greedy
/// longest-match scan over the same automaton produces by hand.
#[test]
fn tokenizer_prefers_longest_match_and_breaks_ties_by_declaration_order() {
    let mut b = AstBuilder::new();
    let a = b.symbol(ByteSet::byte(b'a')).unwrap();
    let b_ = b.symbol(ByteSet::byte(b'b')).unwrap();
    let b_plus = b.rep1(b_);
    let ab_plus = b.concat(a, b_plus);

    let a2 = b.symbol(ByteSet::byte(b'a')).unwrap();

    let root = combine_patterns(&mut b, &[("ab+", ab_plus), ("a", a2)]);
    let ast = b.finish(root);
    let tokenizer = Tokenizer::compile(&ast).unwrap();

    let tokens: Vec<_> = tokenizer.tokens(b"abbbabaaababa").collect();
    let spans: Vec<(usize, usize, Option<&str>)> =
        tokens.iter().map(|t| (t.start, t.length, t.name.as_deref())).collect();

    assert_eq!(
        spans,
        vec![
            (0, 4, Some("ab+")),
            (4, 2, Some("ab+")),
            (6, 1, Some("a")),
            (7, 1, Some("a")),
            (8, 2, Some("ab+")),
            (10, 2, Some("ab+")),
            (12, 1, Some("a")),
        ]
    );
}

#[test]
fn tokenizer_a_star_b_beats_bare_a_on_an_overlapping_prefix() {
    let mut b = AstBuilder::new();
    let a1 = b.symbol(ByteSet::byte(b'a')).unwrap();

    let a_star_letter = b.symbol(ByteSet::byte(b'a')).unwrap();
    let a_star = b.rep(a_star_letter);
    let b_letter = b.symbol(ByteSet::byte(b'b')).unwrap();
    let a_star_b = b.concat(a_star, b_letter);

    let c = b.symbol(ByteSet::byte(b'c')).unwrap();
    let d = b.symbol(ByteSet::byte(b'd')).unwrap();
    let cd = b.concat(c, d);

    let root = combine_patterns(&mut b, &[("a", a1), ("ab", a_star_b), ("cd", cd)]);
    let ast = b.finish(root);
    let tokenizer = Tokenizer::compile(&ast).unwrap();

    let tokens: Vec<_> = tokenizer.tokens(b"abaabba").collect();
    let spans: Vec<(usize, usize, Option<&str>)> =
        tokens.iter().map(|t| (t.start, t.length, t.name.as_deref())).collect();

    assert_eq!(
        spans,
        vec![(0, 2, Some("ab")), (2, 3, Some("ab")), (5, 1, Some("ab")), (6, 1, Some("a")),]
    );
}

#[test]
fn tokenizer_reports_unmatched_input_as_an_unnamed_span() {
    let mut b = AstBuilder::new();
    let c = b.symbol(ByteSet::byte(b'c')).unwrap();
    let d = b.symbol(ByteSet::byte(b'd')).unwrap();
    let cd = b.concat(c, d);

    let root = combine_patterns(&mut b, &[("cd", cd)]);
    let ast = b.finish(root);
    let tokenizer = Tokenizer::compile(&ast).unwrap();

    let tokens: Vec<_> = tokenizer.tokens(b"c").collect();
    assert_eq!(tokens.len(), 1);
    assert_eq!((tokens[0].start, tokens[0].length, &tokens[0].name), (0, 1, &None));
}

/// `re"(>[a-z]+\n)+"` over a multi-record stream where the last record is
/// missing its trailing letters.
#[test]
fn io_validator_reports_line_and_column_of_the_first_bad_byte() {
    let mut b = AstBuilder::new();
    let gt = b.byte(b'>');
    let letter = b.symbol(ByteSet::range(b'a', b'z')).unwrap();
    let letters = b.rep1(letter);
    let nl = b.byte(b'\n');
    let record = b.concat_all([gt, letters, nl]);
    let root = b.rep1(record);
    let ast = b.finish(root);
    let machine = compile(&ast, CompileOptions::default()).unwrap();

    let data = b">abc\n>def\n>ghi\n>j!";
    let result = machine.run(data, true, |_| false);
    assert!(result.cs < 0);

    let err = RuntimeError::at(data, result.consumed);
    assert_eq!((err.line, err.column), (4, 3));
}

#[test]
fn ambiguous_alternation_is_rejected_only_in_unambiguous_mode() {
    let mut b = AstBuilder::new();
    let left = {
        let a = b.byte(b'a');
        let b_ = b.byte(b'b');
        let ab = b.concat(a, b_);
        b.on_final(ab, [Action::new("left", 0)])
    };
    let right = {
        let a = b.byte(b'a');
        let b_ = b.byte(b'b');
        let ab = b.concat(a, b_);
        b.on_final(ab, [Action::new("right", 0)])
    };
    let root = b.alt(left, right);
    let ast = b.finish(root);

    let err = compile(&ast, CompileOptions { unambiguous: true, ..CompileOptions::default() })
        .unwrap_err();
    match err {
        CompileError::Ambiguous { witness, action_a, action_b } => {
            assert_eq!(witness.as_slice(), b"ab");
            let names = [action_a.as_str().to_string(), action_b.as_str().to_string()];
            assert!(names.contains(&"left".to_string()));
            assert!(names.contains(&"right".to_string()));
        }
        other => panic!("expected Ambiguous, got {other:?}"),
    }

    assert!(compile(&ast, CompileOptions { unambiguous: false, ..CompileOptions::default() })
        .is_ok());
}

#[test]
fn emitted_table_backend_contains_the_expected_state_count_and_action_splice() {
    let mut actions = ActionBodies::new();
    actions.insert("seen", "count += 1;");

    let ast = {
        let mut b = AstBuilder::new();
        let node = b.byte(b'a');
        let node = b.on_final(node, [Action::new("seen", 0)]);
        b.finish(node)
    };
    let tagged_machine = compile(&ast, CompileOptions::default()).unwrap();

    let config = EmitConfig {
        backend: Backend::Table,
        bounds_checked: true,
        fn_name: "scan".to_string(),
        preamble: Some("let mut count = 0usize;".to_string()),
        epilogue: Some("// end of generated matcher".to_string()),
        ..EmitConfig::default()
    };
    let source = emit::emit(&tagged_machine, &config, &actions).unwrap();

    assert!(source.contains(
        "pub fn scan(data: &[u8], is_eof: bool, precondition: impl Fn(&str) -> bool) -> (usize, i32)"
    ));
    assert!(source.contains("count += 1;"));
    assert!(source.contains("let mut count = 0usize;"));
    assert!(source.contains("// end of generated matcher"));
    // Index 0 is a reserved placeholder row; live states start at 1.
    assert!(source.contains(&format!("const ACCEPT: [bool; {}]", tagged_machine.state_count() + 1)));
}

#[test]
fn emitted_direct_backend_inlines_one_match_arm_per_state_and_bounds_checks() {
    let ast = validator_ast();
    let machine = compile(&ast, CompileOptions::default()).unwrap();

    let actions = ActionBodies::new();
    let config = EmitConfig {
        backend: Backend::Direct,
        bounds_checked: true,
        fn_name: "run_direct".to_string(),
        preamble: None,
        epilogue: None,
        ..EmitConfig::default()
    };
    let source = emit::emit(&machine, &config, &actions).unwrap();

    assert!(source.contains(
        "pub fn run_direct(data: &[u8], is_eof: bool, precondition: impl Fn(&str) -> bool) -> (usize, i32)"
    ));
    assert!(source.contains("if p >= p_end {"));
    // States are numbered from 1; there is no arm for 0.
    for i in 1..=machine.state_count() {
        assert!(source.contains(&format!("{} => {{", i)), "missing arm for state {i}");
    }
}

#[test]
fn a_guarded_byte_matches_on_precondition_regardless_of_the_byte_seen() {
    // alt(when(byte('a'), "force_a"), byte('b')): the guarded branch, once
    // its precondition holds, consumes one byte and proceeds without
    // looking at its value at all.
    let mut b = AstBuilder::new();
    b.register_precondition("force_a");
    let a = b.byte(b'a');
    let guarded_a = b.when(a, "force_a").unwrap();
    let plain_b = b.byte(b'b');
    let root = b.alt(guarded_a, plain_b);
    let ast = b.finish(root);
    let machine = compile(&ast, CompileOptions::default()).unwrap();

    // Predicate false: only the ordinary, unguarded 'b' edge can match.
    let result = machine.run(b"z", true, |_| false);
    assert!(result.cs < 0);
    let result = machine.run(b"b", true, |_| false);
    assert_eq!(result.cs, 0);

    // Predicate true: the guard fires on any byte, including one that
    // matches neither 'a' nor 'b'.
    let result = machine.run(b"z", true, |name| name == "force_a");
    assert_eq!(result.cs, 0);
    assert_eq!(result.consumed, 1);
}

#[test]
fn alphabet_compression_can_be_disabled() {
    use automata::dfa::Dfa;
    use automata::machine::Machine;
    use automata::nfa::Nfa;

    let ast = validator_ast();
    let nfa = Nfa::from_ast(&ast);
    let dfa = Dfa::from_nfa(&nfa, false).unwrap();

    let compressed = Machine::from_dfa(&dfa, AlphabetCompression::Enabled);
    let uncompressed = Machine::from_dfa(&dfa, AlphabetCompression::Disabled);

    assert_eq!(uncompressed.class_count(), 256);
    assert!(compressed.class_count() <= uncompressed.class_count());

    // Both must still agree on behavior.
    for input in [&b"def"[..], &b"abcbcbcbcbc"[..], &b"xxxxxx"[..], &b"nope"[..]] {
        let a = compressed.run(input, true, |_| false);
        let b = uncompressed.run(input, true, |_| false);
        assert_eq!(a.cs, b.cs);
        assert_eq!(a.consumed, b.consumed);
    }
}
