use scorepipe::dsl::eval::RecordScope;
use scorepipe::dsl::{evaluate, evaluate_aggregate, evaluate_with, Expression};
use scorepipe::placeholder::substitute;
use scorepipe::*;

fn scored(seq: u32, score: f64) -> Subject {
    let mut subject = Subject::new(seq);
    subject.score = score;
    subject
}

#[test]
fn test_precedence_and_logic() {
    assert_eq!(evaluate("1 + 2 * 3").unwrap(), Value::Number(7.0));
    assert_eq!(evaluate("(1 + 2) * 3").unwrap(), Value::Number(9.0));
    assert_eq!(evaluate("1 + 1 == 2 && !(3 < 2)").unwrap(), Value::Bool(true));
    assert_eq!(evaluate("0 || 10 % 4 == 2").unwrap(), Value::Bool(true));
}

#[test]
fn test_aggregates_over_subjects() {
    let subjects = vec![scored(1, 2.0), scored(2, 4.0), scored(3, 4.0), scored(4, 4.0),
                        scored(5, 5.0), scored(6, 5.0), scored(7, 7.0), scored(8, 9.0)];
    assert_eq!(evaluate_aggregate("AVG(score)", &subjects).unwrap(), Value::Number(5.0));
    assert_eq!(evaluate_aggregate("std(score)", &subjects).unwrap(), Value::Number(2.0));
    assert_eq!(evaluate_aggregate("MAX(item.score)", &subjects).unwrap(), Value::Number(9.0));
    assert_eq!(evaluate_aggregate("COUNT()", &subjects).unwrap(), Value::Number(8.0));
    assert_eq!(
        evaluate_aggregate("SUM(score)", std::iter::empty::<&Subject>()).unwrap(),
        Value::Number(0.0)
    );
}

#[test]
fn test_substitute_then_evaluate() {
    let mut subject = scored(1, 88.0);
    subject.set_property("bonus", Value::from(-3.0));
    let text = substitute("#{score} + #{bonus}", |name| subject.get_property(name));
    assert_eq!(text, "88 + -3");
    assert_eq!(evaluate(&text).unwrap(), Value::Number(85.0));
}

#[test]
fn test_record_scope_and_unresolved() {
    let subject = scored(1, 70.0);
    let scope = RecordScope::new(&subject);
    assert_eq!(evaluate_with("score >= 60", &scope).unwrap(), Value::Bool(true));
    assert_eq!(evaluate_with("missing == 0", &scope).unwrap(), Value::Bool(false));
    assert!(evaluate_with("missing + 1", &scope).unwrap().to_number().is_nan());
}

#[test]
fn test_syntax_errors_before_evaluation() {
    for source in ["2 +", "(1 + 2", "1 + 2)", "'open", "1 & 2", "3 # 4"] {
        let err = Expression::parse(source).unwrap_err();
        assert!(err.is_syntax_error(), "{source}: {err}");
    }
}
