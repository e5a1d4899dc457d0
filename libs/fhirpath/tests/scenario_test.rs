//! End-to-end scenarios: literal input, expression, expected output.

use serde_json::json;

mod test_support;
use test_support::{eval_json, patient};

#[test]
fn test_pipeline_and_filter() {
    let input = json!({"name": [
        {"use": "official", "given": ["John", "James"], "family": "Doe"},
        {"use": "nickname", "given": ["Johnny"], "family": "Doe"}
    ]});
    assert_eq!(
        eval_json("name.where(use = 'official').given", input),
        json!(["John", "James"])
    );
}

#[test]
fn test_three_valued_and_with_empty() {
    assert_eq!(eval_json("true and {}", json!(null)), json!([]));
}

#[test]
fn test_union_dedup_by_equivalence() {
    assert_eq!(
        eval_json("{1, 2, 3} | {3, 4, 5}", json!(null)),
        json!([1, 2, 3, 4, 5])
    );
}

#[test]
fn test_iterator_with_index() {
    assert_eq!(
        eval_json("$this.where($index < 2)", json!(["a", "b", "c", "d"])),
        json!(["a", "b"])
    );
}

#[test]
fn test_concat_with_missing_property_is_empty() {
    assert_eq!(
        eval_json("name & ' ' & missing", json!({"name": "John"})),
        json!([])
    );
}

#[test]
fn test_index_out_of_range_yields_empty() {
    assert_eq!(eval_json("$this[3]", json!([10, 20, 30])), json!([]));
}

#[test]
fn test_resource_type_prefix_navigation() {
    assert_eq!(
        eval_json("Patient.name.given", patient()),
        json!(["John", "James", "Johnny"])
    );
    // A non-matching root type navigates to nothing, silently.
    assert_eq!(eval_json("Observation.value", patient()), json!([]));
}

#[test]
fn test_nested_filter_and_select() {
    assert_eq!(
        eval_json(
            "telecom.where(system = 'email').value",
            patient()
        ),
        json!(["john@example.org"])
    );
    assert_eq!(
        eval_json("name.select(given.first())", patient()),
        json!(["John", "Johnny"])
    );
}

#[test]
fn test_define_variable_flows_down_the_pipeline() {
    assert_eq!(
        eval_json(
            "defineVariable('familyName', name.first().family).select(%familyName)",
            patient()
        ),
        json!(["Doe"])
    );
}

#[test]
fn test_aggregate_sum() {
    assert_eq!(
        eval_json("$this.aggregate($this + $total, 0)", json!([1, 2, 3, 4])),
        json!([10])
    );
}

#[test]
fn test_iif_branches() {
    assert_eq!(
        eval_json("iif(active, 'yes', 'no')", patient()),
        json!(["yes"])
    );
    assert_eq!(eval_json("iif({}, 'yes', 'no')", json!(null)), json!(["no"]));
    assert_eq!(eval_json("iif(false, 'yes')", json!(null)), json!([]));
}

#[test]
fn test_date_comparison_against_string_property() {
    assert_eq!(
        eval_json("birthDate < @2000-01-01", patient()),
        json!([true])
    );
}

#[test]
fn test_type_test_and_cast() {
    assert_eq!(eval_json("1 is Integer", json!(null)), json!([true]));
    assert_eq!(eval_json("1 is String", json!(null)), json!([false]));
    assert_eq!(
        eval_json("{1, 'a', 2} as Integer", json!(null)),
        json!([1, 2])
    );
    assert_eq!(
        eval_json("$this.ofType(String)", json!([1, "a", 2.5, "b"])),
        json!(["a", "b"])
    );
}
