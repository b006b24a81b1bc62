use chronc::{
    compiler::{Analyzer, VarType},
    AstNode,
};
use test_case::test_case;

mod common;

#[test_case("redeclaration", "ERROR 3 variable already declared: a"; "redeclaration")]
#[test_case("mismatch_1", "ERROR 3 type mismatch: cannot assign string to int"; "string to int")]
#[test_case("mismatch_2", "ERROR 3 type mismatch: cannot assign int to string"; "int to string")]
#[test_case("adding_1", "ERROR 5 cannot add or subtract string (right operand)"; "add a string")]
#[test_case("adding_2", "ERROR 4 cannot add or subtract string (right operand)"; "subtract a string")]
#[test_case("adding_3", "ERROR 3 cannot add or subtract string (right operand)"; "nested string operand")]
#[test_case("undeclared_2", "ERROR 6 undeclared variable: i"; "sibling scope")]
#[test_case("undeclared_3", "ERROR 5 undeclared variable: i"; "child scope")]
fn semantic_error(name: &str, expected: &str) {
    let result = common::compile(name);

    assert_eq!(common::messages(&result), vec![expected]);
    assert!(result.symbols.is_some());
    assert!(result.code.is_none());
}

#[test_case("undeclared_1"; "bare assignment")]
#[test_case("before_declaration"; "assignment before declaration")]
fn undeclared_without_end_of_file(name: &str) {
    let result = common::compile(name);
    let messages = common::messages(&result);

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], "WARNING 1 program does not end with $");
    assert!(messages[1].starts_with("ERROR 1 undeclared variable: "));
}

#[test_case("{ int a\n a = (1 == true) } $", "ERROR 2 cannot compare different types: int and boolean"; "different types")]
#[test_case("{ boolean b\n b = (\"a\" == 1) } $", "ERROR 2 cannot compare string (left operand)"; "string on the left")]
#[test_case("{ boolean b\n b = (1 == \"a\") } $", "ERROR 2 cannot compare string (right operand)"; "string on the right")]
#[test_case("{ if ((1 == 1) == true) {} } $", "ERROR 1 nested == is unsupported"; "nested equality")]
#[test_case("{ int a\n a = true + 1 } $", "ERROR 2 expected identifier, found operator '+'"; "boolean on the left of plus")]
#[test_case("{ string s\n s = 1 + s } $", "ERROR 2 cannot add or subtract string (right operand)"; "string variable")]
#[test_case("{ int a\n int b\n b = 1\n a = b + 1 } $", "ERROR 4 expected identifier, found operator '+'"; "variable on the left of plus")]
fn type_error(source: &str, expected: &str) {
    let result = common::compile_source(source);

    assert_eq!(common::messages(&result), vec![expected]);
}

#[test]
fn sound_assignments() {
    let result = common::compile_source("{\n int a\n int b\n a = 1\n b = 2\n a = b\n} $");

    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert!(result.code.is_some());
}

#[test]
fn single_type_mismatch() {
    let result = common::compile_source("{\n int a\n a = \"x\"\n} $");

    assert_eq!(result.errors().count(), 1);
    assert_eq!(
        result.errors().next().unwrap().message,
        "type mismatch: cannot assign string to int"
    );
}

#[test]
fn single_undeclared_variable() {
    let result = common::compile_source("i = 1 $");

    assert_eq!(
        common::messages(&result),
        vec!["ERROR 1 undeclared variable: i"]
    );
}

#[test]
fn warnings() {
    let result = common::compile("warnings");

    assert_eq!(
        common::messages(&result),
        vec![
            "WARNING 12 program does not end with $",
            "WARNING 2 unused variable: s",
            "WARNING 4 variable not initialized: t",
            "WARNING 8 variable not initialized: j",
            "WARNING 9 unused variable: k",
        ]
    );
    assert!(result.code.is_some());
}

#[test]
fn unused_variable_in_bare_statement() {
    let result = common::compile("after_eof");

    assert_eq!(
        common::messages(&result),
        vec![
            "WARNING 1 ignoring code after $",
            "WARNING 1 unused variable: a",
        ]
    );
}

#[test]
fn shadowing_resolves_to_the_innermost_declaration() {
    let (ast, symbols, warnings) = common::analyze(&common::source("everything_1"));

    let listed = symbols
        .symbols()
        .map(|s| (s.name.as_str(), s.scope_label.as_str(), s.id()))
        .collect::<Vec<_>>();

    assert_eq!(
        listed,
        vec![
            ("a", ">0", "a@0".to_string()),
            ("b", ">0", "b@0".to_string()),
            ("c", ">0", "c@0".to_string()),
            ("a", ">0>1", "a@1".to_string()),
        ]
    );

    // print(a) inside the nested block
    let root = ast.root().unwrap();
    let inner = ast.child(root, 2).unwrap();
    let print = ast.child(inner, 2).unwrap();
    let AstNode::Symbol(symbol) = ast.value(ast.child(print, 0).unwrap()) else {
        panic!("identifier was not resolved");
    };

    assert_eq!(symbol.id.scope, 1);
    assert_eq!(symbols.symbol(symbol.id).span.line, 5);

    // Assigning to a variable counts as using it.
    assert!(warnings.is_empty());
}

#[test]
fn every_identifier_is_resolved() {
    let (ast, _, _) = common::analyze(&common::source("nested_everything"));

    for id in ast.preorder(ast.root().unwrap()) {
        assert!(!matches!(ast.value(id), AstNode::Token(t) if t.is(chronc::TokenKind::Id)));
    }
}

#[test]
fn symbol_flags_and_types() {
    let (_, symbols, _) = common::analyze("{ string s\n int i\n boolean b\n b = true\n print(i) } $");

    let flags = symbols
        .symbols()
        .map(|s| (s.name.as_str(), s.ty, s.used, s.assigned))
        .collect::<Vec<_>>();

    assert_eq!(
        flags,
        vec![
            ("s", VarType::String, false, false),
            ("i", VarType::Int, true, false),
            ("b", VarType::Boolean, true, true),
        ]
    );
}

#[test_case("{ int a } $", 0; "block")]
#[test_case("{ { int a } { { int b } } } $", 0; "nested blocks")]
#[test_case("{ while true { if false { int a } } } $", 0; "loops")]
#[test_case("{ int a\n int b\n print(b) } $", 0; "with warnings")]
#[test_case("int a $", 1; "bare statement keeps its scope")]
fn balanced_scoping(source: &str, depth: usize) {
    let mut ast = common::lower(source);
    let mut analyzer = Analyzer::new(&mut ast);

    analyzer.analyze().unwrap();

    assert_eq!(analyzer.symbols().depth(), depth);
}

#[test]
fn scope_labels() {
    let (_, symbols, _) = common::analyze("{ { int a } { { int b } } int c } $");

    let labels = symbols
        .symbols()
        .map(|s| format!("{}{}", s.name, s.scope_label))
        .collect::<Vec<_>>();

    assert_eq!(labels, vec!["c>0", "a>0>1", "b>0>2>3"]);
    assert_eq!(symbols.len(), 4);
}
