use chronc::{
    backend::{self, Op, IMAGE_SIZE},
    Severity,
};
use test_case::test_case;

mod common;

#[test_case("nice_cst", "A9 00 8D 0B 00 A9 02 8D 0B 00 00"; "declaration and assignment")]
#[test_case("after_eof", "A9 00 8D 06 00 00"; "bare declaration")]
#[test_case("string_1", "A9 00 8D 11 00 A9 FC 8D 11 00 A2 02 AC 11 00 FF 00"; "string variable")]
#[test_case("best_of_both_worlds", "A9 E7 8D FF 00 A2 02 AC FF 00 FF 00"; "string literal")]
#[test_case(
    "if_1",
    "A9 01 8D FF 00 AE FF 00 A9 01 8D FF 00 EC FF 00 D0 0B \
     A9 01 A2 01 8D FF 00 AC FF 00 FF \
     A9 02 A2 01 8D FF 00 AC FF 00 FF 00";
    "if"
)]
#[test_case(
    "non_while",
    "A9 00 8D FF 00 A2 01 EC FF 00 D0 17 \
     A9 FD 8D FF 00 A2 02 AC FF 00 FF \
     A9 00 8D FF 00 A2 01 EC FF 00 D0 DD \
     A9 F8 8D FF 00 A2 02 AC FF 00 FF 00";
    "while"
)]
#[test_case(
    "add_print",
    "A9 00 8D 1F 00 \
     A9 02 8D FF 00 A9 01 6D FF 00 8D 1F 00 \
     AD 1F 00 A2 01 8D FF 00 AC FF 00 FF 00";
    "add and print an int variable"
)]
#[test_case(
    "print_boolean",
    "A9 00 8D 1F 00 \
     A9 01 8D FF 00 A2 01 EC FF 00 8D 1F 00 \
     AD 1F 00 A2 01 8D FF 00 AC FF 00 FF 00";
    "print a boolean variable"
)]
#[test_case(
    "nested_loop",
    "A9 00 8D 3D 00 \
     AD 3D 00 8D FF 00 AE FF 00 A9 00 8D FF 00 EC FF 00 D0 24 \
     AD 3D 00 8D FF 00 AE FF 00 A9 00 8D FF 00 EC FF 00 D0 05 \
     A9 01 8D 3D 00 \
     A9 00 8D FF 00 A2 01 EC FF 00 D0 C9 00";
    "if inside while"
)]
fn generated_code(name: &str, expected: &str) {
    let result = common::compile(name);

    assert_eq!(common::code(&result), expected);
}

#[test_case("string_1", 252, "hi\0"; "single string")]
#[test_case("non_while", 248, "done\0a\0"; "strings are stacked downwards")]
#[test_case("best_of_both_worlds", 231, "the best of both worlds\0"; "long string")]
fn heap(name: &str, start: usize, expected: &str) {
    let result = common::compile(name);
    let image = result.code.unwrap();

    assert_eq!(&image.bytes()[start..IMAGE_SIZE - 1], expected.as_bytes());
}

#[test_case("nice_cst")]
#[test_case("everything_1")]
#[test_case("everything_2")]
#[test_case("nested_everything")]
#[test_case("nested_blocks")]
#[test_case("if_2")]
#[test_case("infinite_while")]
#[test_case("string_2")]
fn image_layout(name: &str) {
    let result = common::compile(name);
    assert!(!result.has_errors(), "{:?}", result.diagnostics);

    let image = result.code.unwrap();
    let instructions = image.disassemble();

    assert_eq!(image.len(), IMAGE_SIZE);
    assert_eq!(image.bytes()[IMAGE_SIZE - 1], 0);
    assert_eq!(instructions.last().map(|i| i.op), Some(Op::Brk));
}

#[test]
fn unterminated_program_still_compiles() {
    let result = common::compile_source("{ string s\n s = \"hi\"\n print(s) }");

    assert_eq!(
        common::messages(&result),
        vec!["WARNING 3 program does not end with $"]
    );
    assert_eq!(
        common::code(&result),
        "A9 00 8D 11 00 A9 FC 8D 11 00 A2 02 AC 11 00 FF 00"
    );
    assert_eq!(&result.code.unwrap().bytes()[252..], b"hi\0\0");
}

#[test]
fn generation_is_repeatable() {
    let (ast, symbols, _) = common::analyze(&common::source("everything_2"));

    let first = backend::generate(&ast, &symbols).unwrap();
    let second = backend::generate(&ast, &symbols).unwrap();

    assert_eq!(first, second);
}

#[test]
fn statics_hold_string_pointers() {
    let result = common::compile("string_1");
    let image = result.code.unwrap();

    // s = "hi" stores the heap address of the string into the static cell.
    let store = image
        .disassemble()
        .into_iter()
        .find(|i| i.op == Op::LdaConst && i.operands == [0xFC])
        .unwrap();

    assert_eq!(store.address, 5);
}

#[test]
fn subtraction_is_unsupported() {
    let result = common::compile_source("{ int a\n a = 1 - 2 } $");

    assert_eq!(
        common::messages(&result),
        vec!["ERROR 2 subtraction unsupported"]
    );
    assert!(result.ast.is_some());
    assert!(result.code.is_none());
}

#[test_case(10, true; "at the limit")]
#[test_case(11, false; "over the limit")]
fn jump_limit(count: usize, ok: bool) {
    let source = format!("{{ {} }} $", "if true {} ".repeat(count));
    let result = common::compile_source(&source);

    assert_eq!(result.code.is_some(), ok);

    if !ok {
        let error = result.errors().next().unwrap();

        assert_eq!(error.severity, Severity::Error);
        assert_eq!(error.message, "more than 10 jump entries unsupported");
    }
}

#[test]
fn program_too_large() {
    let source = format!("{{ print(\"{}\") }} $", "a".repeat(250));
    let result = common::compile_source(&source);

    assert_eq!(
        result.errors().map(|d| d.message.as_str()).collect::<Vec<_>>(),
        vec!["program too large for the 256 byte image"]
    );
}

#[test]
fn listing() {
    let result = common::compile("nice_cst");
    let listing = result
        .code
        .unwrap()
        .disassemble()
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>();

    assert_eq!(
        listing,
        vec![
            "00  A9 00     LDA #$00",
            "02  8D 0B 00  STA $000B",
            "05  A9 02     LDA #$02",
            "07  8D 0B 00  STA $000B",
            "0A  00        BRK",
        ]
    );
}

#[test]
fn long_programs_hit_the_capacity_check() {
    let source = format!("{{\n int a\n{}}} $", "a = 1\n".repeat(40_000));
    let result = common::compile_source(&source);

    assert_eq!(
        result.errors().map(|d| d.message.as_str()).collect::<Vec<_>>(),
        vec!["program too large for the 256 byte image"]
    );
    assert!(result.code.is_none());
}
