//! Boolean condition evaluator.
//!
//! Evaluates a [`Condition`] tree against an [`ExecutionContext`]. Leaves
//! compare one context entry against a literal or a whole-value `$(key)`
//! reference; `and`/`or` nodes short-circuit over their children.
//!
//! Evaluation never fails for data reasons (missing fields, unparsable
//! numbers, bad regex patterns all yield `false`). The only error is an
//! unknown operator, which is a configuration defect and must reach the
//! caller.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use tracing::warn;

use crate::types::{Condition, ExecutionContext};

/// Errors from condition evaluation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("Unknown condition operator: {0}")]
    UnknownOperator(String),
}

/// Supported condition operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    StartsWith,
    EndsWith,
    MatchesRegex,
    IsEmpty,
    IsNotEmpty,
    And,
    Or,
}

impl ConditionOperator {
    fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::Contains => "contains",
            ConditionOperator::StartsWith => "starts_with",
            ConditionOperator::EndsWith => "ends_with",
            ConditionOperator::MatchesRegex => "matches_regex",
            ConditionOperator::IsEmpty => "is_empty",
            ConditionOperator::IsNotEmpty => "is_not_empty",
            ConditionOperator::And => "and",
            ConditionOperator::Or => "or",
        }
    }

    /// Whether the operator combines child conditions.
    pub fn is_logical(&self) -> bool {
        matches!(self, ConditionOperator::And | ConditionOperator::Or)
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionOperator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" => Ok(ConditionOperator::Equals),
            "not_equals" => Ok(ConditionOperator::NotEquals),
            "greater_than" => Ok(ConditionOperator::GreaterThan),
            "less_than" => Ok(ConditionOperator::LessThan),
            "contains" => Ok(ConditionOperator::Contains),
            "starts_with" => Ok(ConditionOperator::StartsWith),
            "ends_with" => Ok(ConditionOperator::EndsWith),
            "matches_regex" => Ok(ConditionOperator::MatchesRegex),
            "is_empty" => Ok(ConditionOperator::IsEmpty),
            "is_not_empty" => Ok(ConditionOperator::IsNotEmpty),
            "and" => Ok(ConditionOperator::And),
            "or" => Ok(ConditionOperator::Or),
            _ => Err(ConditionError::UnknownOperator(s.to_string())),
        }
    }
}

/// Evaluate an optional condition. An absent condition always passes.
pub fn evaluate(
    condition: Option<&Condition>,
    context: &ExecutionContext,
) -> Result<bool, ConditionError> {
    match condition {
        None => Ok(true),
        Some(condition) => evaluate_node(condition, context),
    }
}

/// Check every operator in a tree without evaluating it.
///
/// Lets handler construction reject a defective tree up front instead of
/// failing on the first dispatch that reaches the bad node.
pub fn validate(condition: &Condition) -> Result<(), ConditionError> {
    let op: ConditionOperator = condition.operator.parse()?;
    if op.is_logical() {
        for child in condition.conditions.iter().flatten() {
            validate(child)?;
        }
    }
    Ok(())
}

fn evaluate_node(condition: &Condition, context: &ExecutionContext) -> Result<bool, ConditionError> {
    let op: ConditionOperator = condition.operator.parse()?;
    match op {
        ConditionOperator::And => {
            // Empty child lists are false for both and/or.
            let Some(children) = non_empty_children(condition) else {
                return Ok(false);
            };
            for child in children {
                if !evaluate_node(child, context)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionOperator::Or => {
            let Some(children) = non_empty_children(condition) else {
                return Ok(false);
            };
            for child in children {
                if evaluate_node(child, context)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => Ok(evaluate_leaf(op, condition, context)),
    }
}

fn non_empty_children(condition: &Condition) -> Option<&[Condition]> {
    condition
        .conditions
        .as_deref()
        .filter(|children| !children.is_empty())
}

fn evaluate_leaf(op: ConditionOperator, condition: &Condition, context: &ExecutionContext) -> bool {
    let field = match condition.field.as_deref() {
        Some(field) if !field.is_empty() => field,
        _ => return false,
    };
    let Some(actual) = context.get(field) else {
        return false;
    };

    match op {
        ConditionOperator::IsEmpty => return actual.trim().is_empty(),
        ConditionOperator::IsNotEmpty => return !actual.trim().is_empty(),
        _ => {}
    }

    let expected = match condition.value.as_deref() {
        Some(value) if !value.is_empty() => resolve_value(value, context),
        _ => return false,
    };

    match op {
        ConditionOperator::Equals => actual == expected,
        ConditionOperator::NotEquals => actual != expected,
        ConditionOperator::GreaterThan => compare_numeric(actual, expected, |a, b| a > b),
        ConditionOperator::LessThan => compare_numeric(actual, expected, |a, b| a < b),
        ConditionOperator::Contains => actual.contains(expected),
        ConditionOperator::StartsWith => actual.starts_with(expected),
        ConditionOperator::EndsWith => actual.ends_with(expected),
        ConditionOperator::MatchesRegex => match Regex::new(expected) {
            Ok(re) => re.is_match(actual),
            Err(e) => {
                warn!(pattern = %expected, error = %e, "Invalid regex in condition");
                false
            }
        },
        // Handled above.
        ConditionOperator::IsEmpty
        | ConditionOperator::IsNotEmpty
        | ConditionOperator::And
        | ConditionOperator::Or => false,
    }
}

/// Resolve a whole-value `$(name)` reference against the context.
///
/// Anything other than exactly one placeholder spanning the whole value is
/// returned verbatim, as is a placeholder whose key is absent.
fn resolve_value<'a>(value: &'a str, context: &'a ExecutionContext) -> &'a str {
    let name = value
        .strip_prefix("$(")
        .and_then(|rest| rest.strip_suffix(')'))
        .filter(|name| !name.is_empty() && !name.contains('(') && !name.contains(')'));

    match name.and_then(|name| context.get(name)) {
        Some(resolved) => resolved.as_str(),
        None => value,
    }
}

fn compare_numeric(actual: &str, expected: &str, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pairs: &[(&str, &str)]) -> ExecutionContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn eval(condition: &Condition, context: &ExecutionContext) -> bool {
        evaluate(Some(condition), context).unwrap()
    }

    // ---- null / logical ----

    #[test]
    fn test_null_condition_is_true() {
        assert!(evaluate(None, &ExecutionContext::new()).unwrap());
        assert!(evaluate(None, &ctx(&[("a", "1")])).unwrap());
    }

    #[test]
    fn test_empty_and_or_are_false() {
        let context = ctx(&[("a", "1")]);
        assert!(!eval(&Condition::all(vec![]), &context));
        assert!(!eval(&Condition::any(vec![]), &context));

        let missing_children = Condition {
            operator: "and".to_string(),
            ..Condition::default()
        };
        assert!(!eval(&missing_children, &context));
    }

    #[test]
    fn test_and_is_conjunction() {
        let context = ctx(&[("a", "1"), ("b", "2")]);
        let a_true = Condition::leaf("equals", "a", "1");
        let a_false = Condition::leaf("equals", "a", "9");
        let b_true = Condition::leaf("equals", "b", "2");
        let b_false = Condition::leaf("equals", "b", "9");

        for (a, b) in [
            (&a_true, &b_true),
            (&a_true, &b_false),
            (&a_false, &b_true),
            (&a_false, &b_false),
        ] {
            let expected = eval(a, &context) && eval(b, &context);
            assert_eq!(eval(&Condition::all(vec![a.clone(), b.clone()]), &context), expected);
        }
    }

    #[test]
    fn test_and_short_circuits() {
        // The second child has an unknown operator: evaluating it would error.
        let context = ctx(&[("a", "1")]);
        let tree = Condition::all(vec![
            Condition::leaf("equals", "a", "2"),
            Condition::leaf("explode", "a", "1"),
        ]);
        assert_eq!(evaluate(Some(&tree), &context), Ok(false));
    }

    #[test]
    fn test_or_short_circuits() {
        let context = ctx(&[("a", "1")]);
        let tree = Condition::any(vec![
            Condition::leaf("equals", "a", "1"),
            Condition::leaf("explode", "a", "1"),
        ]);
        assert_eq!(evaluate(Some(&tree), &context), Ok(true));
    }

    #[test]
    fn test_nested_tree() {
        let context = ctx(&[("status", "open"), ("priority", "7")]);
        let tree = Condition::all(vec![
            Condition::leaf("equals", "status", "open"),
            Condition::any(vec![
                Condition::leaf("greater_than", "priority", "5"),
                Condition::leaf("equals", "owner", "me"),
            ]),
        ]);
        assert!(eval(&tree, &context));
    }

    // ---- unknown operator ----

    #[test]
    fn test_unknown_operator_is_error() {
        let context = ctx(&[("a", "1")]);
        let err = evaluate(Some(&Condition::leaf("roughly", "a", "1")), &context).unwrap_err();
        assert_eq!(err, ConditionError::UnknownOperator("roughly".to_string()));
        assert_eq!(err.to_string(), "Unknown condition operator: roughly");
    }

    #[test]
    fn test_unknown_operator_propagates_from_children() {
        let context = ctx(&[("a", "1")]);
        let tree = Condition::all(vec![
            Condition::leaf("equals", "a", "1"),
            Condition::leaf("roughly", "a", "1"),
        ]);
        assert!(evaluate(Some(&tree), &context).is_err());
    }

    #[test]
    fn test_validate_walks_tree() {
        let good = Condition::all(vec![Condition::leaf("contains", "a", "x")]);
        assert!(validate(&good).is_ok());

        let bad = Condition::any(vec![
            Condition::leaf("contains", "a", "x"),
            Condition::all(vec![Condition::leaf("nope", "a", "x")]),
        ]);
        assert_eq!(
            validate(&bad),
            Err(ConditionError::UnknownOperator("nope".to_string()))
        );
    }

    #[test]
    fn test_operator_parse_is_case_insensitive() {
        assert_eq!(
            "Greater_Than".parse::<ConditionOperator>().unwrap(),
            ConditionOperator::GreaterThan
        );
        assert_eq!(ConditionOperator::MatchesRegex.to_string(), "matches_regex");
    }

    // ---- leaves ----

    #[test]
    fn test_missing_or_empty_field_is_false() {
        let context = ctx(&[("a", "")]);
        assert!(!eval(&Condition::leaf("equals", "missing", "x"), &context));
        assert!(!eval(&Condition::leaf("is_empty", "missing", ""), &context));
        assert!(!eval(&Condition::leaf("equals", "", "x"), &context));
    }

    #[test]
    fn test_empty_value_is_false_for_comparisons() {
        let context = ctx(&[("a", "")]);
        assert!(!eval(&Condition::leaf("equals", "a", ""), &context));
        assert!(!eval(&Condition::leaf("contains", "a", ""), &context));
    }

    #[test]
    fn test_is_empty_and_is_not_empty() {
        let context = ctx(&[("blank", "  "), ("full", "x")]);
        assert!(eval(&Condition::leaf("is_empty", "blank", ""), &context));
        assert!(!eval(&Condition::leaf("is_empty", "full", ""), &context));
        assert!(eval(&Condition::leaf("is_not_empty", "full", ""), &context));
        assert!(!eval(&Condition::leaf("is_not_empty", "blank", ""), &context));
    }

    #[test]
    fn test_string_operators() {
        let context = ctx(&[("s", "ERR-404 Not Found")]);
        assert!(eval(&Condition::leaf("equals", "s", "ERR-404 Not Found"), &context));
        assert!(eval(&Condition::leaf("not_equals", "s", "ERR-500"), &context));
        assert!(eval(&Condition::leaf("contains", "s", "404"), &context));
        assert!(eval(&Condition::leaf("starts_with", "s", "ERR-"), &context));
        assert!(eval(&Condition::leaf("ends_with", "s", "Found"), &context));
        assert!(!eval(&Condition::leaf("ends_with", "s", "found"), &context));
    }

    #[test]
    fn test_numeric_operators() {
        let context = ctx(&[("n", "20"), ("m", "5"), ("x", "abc")]);
        assert!(eval(&Condition::leaf("greater_than", "n", "10"), &context));
        assert!(!eval(&Condition::leaf("greater_than", "m", "10"), &context));
        assert!(eval(&Condition::leaf("less_than", "m", "10.5"), &context));
        assert!(!eval(&Condition::leaf("greater_than", "x", "1"), &context));
        assert!(!eval(&Condition::leaf("less_than", "n", "ten"), &context));
    }

    #[test]
    fn test_matches_regex() {
        let context = ctx(&[("code", "ERR-404")]);
        assert!(eval(&Condition::leaf("matches_regex", "code", r"^ERR-\d{3}$"), &context));
        assert!(!eval(&Condition::leaf("matches_regex", "code", r"^WARN"), &context));
        // Invalid pattern degrades to false.
        assert!(!eval(&Condition::leaf("matches_regex", "code", "(unclosed"), &context));
    }

    // ---- placeholder resolution ----

    #[test]
    fn test_placeholder_value_resolves_from_context() {
        let context = ctx(&[("x", "5"), ("y", "5")]);
        assert!(eval(&Condition::leaf("equals", "x", "$(y)"), &context));
    }

    #[test]
    fn test_placeholder_missing_key_stays_literal() {
        let context = ctx(&[("x", "5")]);
        assert!(!eval(&Condition::leaf("equals", "x", "$(y)"), &context));

        let literal = ctx(&[("x", "$(y)")]);
        assert!(eval(&Condition::leaf("equals", "x", "$(y)"), &literal));
    }

    #[test]
    fn test_embedded_placeholders_are_not_resolved() {
        let context = ctx(&[("x", "id-5"), ("y", "5")]);
        assert!(!eval(&Condition::leaf("equals", "x", "id-$(y)"), &context));
        assert!(eval(&Condition::leaf("ends_with", "x", "$(y)"), &context));
    }

    #[test]
    fn test_placeholder_numeric_compare() {
        let context = ctx(&[("limit", "10"), ("n", "12")]);
        assert!(eval(&Condition::leaf("greater_than", "n", "$(limit)"), &context));
    }
}
