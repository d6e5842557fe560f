//! Condition evaluation against the execution context

use crate::models::workflow::{ConditionOperator, StepCondition};
use serde_json::{Map, Value};

/// Context key holding the step suggested by the last met condition
pub const NEXT_STEP_KEY: &str = "_nextStepId";

/// Evaluate one condition against the context
///
/// A field missing from the context fails every operator except `not_equals`.
pub fn evaluate_condition(condition: &StepCondition, context: &Map<String, Value>) -> bool {
    let actual = context.get(&condition.field);

    match condition.operator {
        ConditionOperator::Equals => actual.is_some_and(|v| loose_equals(v, &condition.value)),
        ConditionOperator::NotEquals => !actual.is_some_and(|v| loose_equals(v, &condition.value)),
        ConditionOperator::Contains => actual.is_some_and(|v| {
            if let Value::Array(items) = v {
                return items.iter().any(|item| loose_equals(item, &condition.value));
            }
            render(v).contains(&render(&condition.value))
        }),
        ConditionOperator::GreaterThan => {
            compare_numbers(actual, &condition.value, |a, b| a > b)
        }
        ConditionOperator::LessThan => compare_numbers(actual, &condition.value, |a, b| a < b),
        ConditionOperator::Exists => actual.is_some_and(|v| !v.is_null()),
    }
}

/// Evaluate conditions in order, returning the first met condition's target step
pub fn select_next_step(
    conditions: &[StepCondition],
    context: &Map<String, Value>,
) -> Option<String> {
    conditions
        .iter()
        .filter(|c| c.next_step_id.is_some())
        .find(|c| evaluate_condition(c, context))
        .and_then(|c| c.next_step_id.clone())
}

/// JSON equality with numeric comparison for numbers (`1` equals `1.0`)
fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Plain string rendering; strings are not quoted
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn compare_numbers(actual: Option<&Value>, expected: &Value, cmp: fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(as_number), as_number(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(field: &str, operator: ConditionOperator, value: Value) -> StepCondition {
        StepCondition {
            field: field.to_string(),
            operator,
            value,
            next_step_id: None,
        }
    }

    fn context() -> Map<String, Value> {
        json!({
            "category": "billing",
            "priority": 3,
            "score": "7.5",
            "tags": ["urgent", "vip"],
            "note": null
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_equals_and_not_equals() {
        let ctx = context();
        assert!(evaluate_condition(
            &condition("category", ConditionOperator::Equals, json!("billing")),
            &ctx
        ));
        assert!(evaluate_condition(
            &condition("priority", ConditionOperator::Equals, json!(3.0)),
            &ctx
        ));
        assert!(evaluate_condition(
            &condition("category", ConditionOperator::NotEquals, json!("technical")),
            &ctx
        ));
    }

    #[test]
    fn test_missing_field_only_satisfies_not_equals() {
        let ctx = context();
        for operator in [
            ConditionOperator::Equals,
            ConditionOperator::Contains,
            ConditionOperator::GreaterThan,
            ConditionOperator::LessThan,
            ConditionOperator::Exists,
        ] {
            assert!(!evaluate_condition(
                &condition("absent", operator, json!(1)),
                &ctx
            ));
        }
        assert!(evaluate_condition(
            &condition("absent", ConditionOperator::NotEquals, json!(1)),
            &ctx
        ));
    }

    #[test]
    fn test_contains() {
        let ctx = context();
        assert!(evaluate_condition(
            &condition("category", ConditionOperator::Contains, json!("bill")),
            &ctx
        ));
        assert!(evaluate_condition(
            &condition("tags", ConditionOperator::Contains, json!("vip")),
            &ctx
        ));
        assert!(!evaluate_condition(
            &condition("tags", ConditionOperator::Contains, json!("spam")),
            &ctx
        ));
    }

    #[test]
    fn test_numeric_comparisons_coerce_strings() {
        let ctx = context();
        assert!(evaluate_condition(
            &condition("score", ConditionOperator::GreaterThan, json!(7)),
            &ctx
        ));
        assert!(evaluate_condition(
            &condition("priority", ConditionOperator::LessThan, json!("10")),
            &ctx
        ));
        assert!(!evaluate_condition(
            &condition("category", ConditionOperator::GreaterThan, json!(1)),
            &ctx
        ));
    }

    #[test]
    fn test_exists_rejects_null() {
        let ctx = context();
        assert!(evaluate_condition(
            &condition("category", ConditionOperator::Exists, Value::Null),
            &ctx
        ));
        assert!(!evaluate_condition(
            &condition("note", ConditionOperator::Exists, Value::Null),
            &ctx
        ));
    }

    #[test]
    fn test_first_met_condition_wins() {
        let ctx = context();
        let conditions = vec![
            StepCondition {
                next_step_id: Some("technical".to_string()),
                ..condition("category", ConditionOperator::Equals, json!("technical"))
            },
            condition("priority", ConditionOperator::Exists, Value::Null),
            StepCondition {
                next_step_id: Some("billing".to_string()),
                ..condition("category", ConditionOperator::Equals, json!("billing"))
            },
            StepCondition {
                next_step_id: Some("fallback".to_string()),
                ..condition("priority", ConditionOperator::Exists, Value::Null)
            },
        ];

        assert_eq!(
            select_next_step(&conditions, &ctx).as_deref(),
            Some("billing")
        );
        assert_eq!(select_next_step(&conditions[..2], &ctx), None);
    }
}
