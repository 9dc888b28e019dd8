//! Parse-error behavior: descriptive first-error-wins messages with the
//! offset of the offending token, and error state clearing when a parse
//! ultimately succeeds.

use candor::{ParseError, parse};

fn parse_err(source: &str) -> ParseError {
    parse(source).expect_err("expected a parse error")
}

#[test]
fn if_requires_parenthesized_condition() {
    let err = parse_err("if a { }");
    assert_eq!(err.message, "Expected '(' before if's condition");
    assert_eq!(err.offset, 3);
}

#[test]
fn if_requires_a_condition() {
    let err = parse_err("if () { }");
    assert_eq!(err.message, "Expected if's condition");
}

#[test]
fn while_requires_parenthesized_condition() {
    let err = parse_err("while true { }");
    assert_eq!(err.message, "Expected '(' before while's condition");
}

#[test]
fn while_requires_a_block_body() {
    let err = parse_err("while (true) a = 1");
    assert_eq!(err.message, "Expected '{'");
}

#[test]
fn assignment_requires_a_right_hand_side() {
    let err = parse_err("a = ");
    assert_eq!(err.message, "Expected rhs after '='");
}

#[test]
fn unterminated_group_reports_the_paren() {
    let err = parse_err("return (1");
    assert_eq!(err.message, "Expected closing paren for primary expression");
}

#[test]
fn unterminated_argument_list() {
    let err = parse_err("f(x");
    assert_eq!(err.message, "Failed to parse function's arguments");
}

#[test]
fn call_with_invalid_declaration_shape() {
    let err = parse_err("f(x + 1) { return x }");
    assert_eq!(err.message, "Incorrect function declaration or call");
}

#[test]
fn object_literal_requires_a_value() {
    let err = parse_err("x = { a: }");
    assert_eq!(err.message, "Expected expression after colon");
}

#[test]
fn object_literal_requires_scalar_keys() {
    let err = parse_err("x = { [1]: 2 }");
    assert_eq!(err.message, "Expected string or number as object literal's key");
}

#[test]
fn array_literal_requires_separators() {
    let err = parse_err("x = [1 2]");
    assert_eq!(err.message, "Expected ']' or ','");
}

#[test]
fn statements_need_a_terminator() {
    let err = parse_err("a = 1 b = 2");
    assert_eq!(err.message, "Expected CR, EOF, or '}' after statement");
    assert_eq!(err.offset, 6);
}

#[test]
fn the_first_error_wins() {
    // The missing rhs is detected before the statement terminator check.
    let err = parse_err("a = \nb = }");
    assert_eq!(err.message, "Expected rhs after '='");
}

#[test]
fn speculative_errors_clear_on_success() {
    // `(a)` followed by a block first trips the grouped-expression check,
    // then reparses as an anonymous function declaration.
    assert!(parse("(a) { return a }").is_ok());
}

#[test]
fn empty_programs_are_allowed() {
    assert!(parse("").is_ok());
    assert!(parse("\n\n").is_ok());
}

#[test]
fn deep_nesting_is_rejected() {
    let mut source = String::from("return ");
    for _ in 0..300 {
        source.push('(');
    }
    source.push('1');
    for _ in 0..300 {
        source.push(')');
    }
    let err = parse_err(&source);
    assert_eq!(err.message, "Expression nesting too deep");
}

#[test]
fn error_display_format() {
    let err = parse_err("if a { }");
    assert_eq!(
        err.to_string(),
        "Expected '(' before if's condition at offset 3"
    );
}
