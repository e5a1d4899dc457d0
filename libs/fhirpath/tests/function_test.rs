//! Built-in function coverage, grouped the way the registry groups them.

use lumen_fhirpath::ErrorKind;
use serde_json::json;

mod test_support;
use test_support::{eval_err, eval_json, patient};

// ============================================================================
// Existence
// ============================================================================

#[test]
fn test_empty_and_exists() {
    assert_eq!(eval_json("{}.empty()", json!(null)), json!([true]));
    assert_eq!(eval_json("{1}.empty()", json!(null)), json!([false]));
    assert_eq!(eval_json("{}.exists()", json!(null)), json!([false]));
    assert_eq!(eval_json("{1}.exists()", json!(null)), json!([true]));
    assert_eq!(
        eval_json("$this.exists($this > 2)", json!([1, 2, 3])),
        json!([true])
    );
    assert_eq!(
        eval_json("$this.exists($this > 9)", json!([1, 2, 3])),
        json!([false])
    );
}

#[test]
fn test_all_with_trivial_empty_result() {
    assert_eq!(eval_json("{}.all($this > 0)", json!(null)), json!([true]));
    assert_eq!(
        eval_json("$this.all($this > 0)", json!([1, 2, 3])),
        json!([true])
    );
    assert_eq!(
        eval_json("$this.all($this > 1)", json!([1, 2, 3])),
        json!([false])
    );
}

#[test]
fn test_boolean_aggregates() {
    assert_eq!(
        eval_json("$this.allTrue()", json!([true, true])),
        json!([true])
    );
    assert_eq!(
        eval_json("$this.allTrue()", json!([true, false])),
        json!([false])
    );
    assert_eq!(
        eval_json("$this.anyTrue()", json!([false, true])),
        json!([true])
    );
    assert_eq!(
        eval_json("$this.allFalse()", json!([false, false])),
        json!([true])
    );
    assert_eq!(
        eval_json("$this.anyFalse()", json!([true, true])),
        json!([false])
    );
    // Trivial results on empty input.
    assert_eq!(eval_json("{}.allTrue()", json!(null)), json!([true]));
    assert_eq!(eval_json("{}.anyTrue()", json!(null)), json!([false]));

    let err = eval_err("$this.allTrue()", json!([true, 3]));
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn test_count_distinct() {
    assert_eq!(eval_json("{}.count()", json!(null)), json!([0]));
    assert_eq!(eval_json("{1, 2, 2, 3}.count()", json!(null)), json!([4]));
    assert_eq!(
        eval_json("{1, 2, 2, 3}.distinct()", json!(null)),
        json!([1, 2, 3])
    );
    assert_eq!(
        eval_json("{1, 2, 2}.isDistinct()", json!(null)),
        json!([false])
    );
    assert_eq!(eval_json("{1, 2}.isDistinct()", json!(null)), json!([true]));
}

#[test]
fn test_subset_and_superset() {
    assert_eq!(
        eval_json("{1, 2}.subsetOf({1, 2, 3})", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("{1, 9}.subsetOf({1, 2, 3})", json!(null)),
        json!([false])
    );
    assert_eq!(
        eval_json("{}.subsetOf({1})", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("{1, 2, 3}.supersetOf({2})", json!(null)),
        json!([true])
    );
}

// ============================================================================
// Filtering and subsetting
// ============================================================================

#[test]
fn test_where_and_select() {
    assert_eq!(
        eval_json("$this.where($this mod 2 = 0)", json!([1, 2, 3, 4])),
        json!([2, 4])
    );
    assert_eq!(
        eval_json("$this.select($this * 10)", json!([1, 2])),
        json!([10, 20])
    );
    assert_eq!(eval_json("{}.where(true)", json!(null)), json!([]));
    assert_eq!(eval_json("{}.select($this)", json!(null)), json!([]));
}

#[test]
fn test_repeat_walks_nested_structure() {
    let tree = json!({
        "item": [
            {"id": "a", "item": [{"id": "a1"}, {"id": "a2"}]},
            {"id": "b"}
        ]
    });
    assert_eq!(
        eval_json("repeat(item).id", tree),
        json!(["a", "b", "a1", "a2"])
    );
}

#[test]
fn test_subsetting_functions() {
    let input = json!([1, 2, 3, 4, 5]);
    assert_eq!(eval_json("$this.single()", json!([7])), json!([7]));
    assert_eq!(eval_json("{}.single()", json!(null)), json!([]));
    assert_eq!(
        eval_err("$this.single()", input.clone()).kind(),
        ErrorKind::Evaluation
    );
    assert_eq!(eval_json("$this.first()", input.clone()), json!([1]));
    assert_eq!(eval_json("$this.last()", input.clone()), json!([5]));
    assert_eq!(eval_json("$this.tail()", input.clone()), json!([2, 3, 4, 5]));
    assert_eq!(eval_json("$this.skip(2)", input.clone()), json!([3, 4, 5]));
    assert_eq!(eval_json("$this.skip(-1)", input.clone()), json!([1, 2, 3, 4, 5]));
    assert_eq!(eval_json("$this.take(2)", input.clone()), json!([1, 2]));
    assert_eq!(eval_json("$this.take(0)", input.clone()), json!([]));
    assert_eq!(
        eval_json("$this.intersect({2, 4, 9})", input.clone()),
        json!([2, 4])
    );
    assert_eq!(
        eval_json("$this.exclude({2, 4})", input),
        json!([1, 3, 5])
    );
}

#[test]
fn test_combining_functions() {
    assert_eq!(
        eval_json("{1, 2}.union({2, 3})", json!(null)),
        json!([1, 2, 3])
    );
    assert_eq!(
        eval_json("{1, 2}.combine({2, 3})", json!(null)),
        json!([1, 2, 2, 3])
    );
}

// ============================================================================
// Strings
// ============================================================================

#[test]
fn test_string_basics() {
    assert_eq!(eval_json("'hello'.length()", json!(null)), json!([5]));
    assert_eq!(eval_json("'hello'.upper()", json!(null)), json!(["HELLO"]));
    assert_eq!(eval_json("'HeLLo'.lower()", json!(null)), json!(["hello"]));
    assert_eq!(eval_json("'  x  '.trim()", json!(null)), json!(["x"]));
    assert_eq!(
        eval_json("'abc'.toChars()", json!(null)),
        json!(["a", "b", "c"])
    );
}

#[test]
fn test_substring_boundaries() {
    assert_eq!(
        eval_json("'hello'.substring(1, 3)", json!(null)),
        json!(["ell"])
    );
    assert_eq!(eval_json("'hello'.substring(3)", json!(null)), json!(["lo"]));
    // A start at or past the end yields empty.
    assert_eq!(eval_json("'hello'.substring(5)", json!(null)), json!([]));
    assert_eq!(eval_json("'hello'.substring(9, 2)", json!(null)), json!([]));
    assert_eq!(eval_json("{}.substring(0)", json!(null)), json!([]));
}

#[test]
fn test_index_of_and_affix_tests() {
    assert_eq!(eval_json("'hello'.indexOf('l')", json!(null)), json!([2]));
    assert_eq!(eval_json("'hello'.indexOf('z')", json!(null)), json!([-1]));
    assert_eq!(
        eval_json("'hello'.lastIndexOf('l')", json!(null)),
        json!([3])
    );
    assert_eq!(
        eval_json("'hello'.startsWith('he')", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'hello'.endsWith('lo')", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'hello'.contains('ell')", json!(null)),
        json!([true])
    );
}

#[test]
fn test_replace_and_matches() {
    assert_eq!(
        eval_json("'abcabc'.replace('b', 'x')", json!(null)),
        json!(["axcaxc"])
    );
    assert_eq!(
        eval_json("'1974-12-25'.matches('\\\\d{4}-\\\\d{2}-\\\\d{2}')", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'abc'.matches('x')", json!(null)),
        json!([false])
    );
    // Open question resolution: an empty focus propagates, never false.
    assert_eq!(eval_json("{}.matches('x')", json!(null)), json!([]));
    assert_eq!(
        eval_json("'a-b-c'.replaceMatches('-', '.')", json!(null)),
        json!(["a.b.c"])
    );
    assert_eq!(
        eval_err("'x'.matches('(unclosed')", json!(null)).kind(),
        ErrorKind::Evaluation
    );
}

#[test]
fn test_split_and_join() {
    assert_eq!(
        eval_json("'a,b,c'.split(',')", json!(null)),
        json!(["a", "b", "c"])
    );
    assert_eq!(
        eval_json("name.given.join(' ')", patient()),
        json!(["John James Johnny"])
    );
    assert_eq!(eval_json("{'a', 'b'}.join()", json!(null)), json!(["ab"]));
}

#[test]
fn test_encode_decode() {
    assert_eq!(
        eval_json("'hello'.encode('base64')", json!(null)),
        json!(["aGVsbG8="])
    );
    assert_eq!(
        eval_json("'aGVsbG8='.decode('base64')", json!(null)),
        json!(["hello"])
    );
    assert_eq!(
        eval_json("'hi'.encode('hex')", json!(null)),
        json!(["6869"])
    );
    assert_eq!(
        eval_json("'6869'.decode('hex')", json!(null)),
        json!(["hi"])
    );
    assert_eq!(
        eval_json("'a b'.encode('url')", json!(null)),
        json!(["a%20b"])
    );
    assert_eq!(
        eval_err("'x'.encode('rot13')", json!(null)).kind(),
        ErrorKind::ArgumentType
    );
}

#[test]
fn test_escape_unescape() {
    assert_eq!(
        eval_json("'<b>'.escape('html')", json!(null)),
        json!(["&lt;b&gt;"])
    );
    assert_eq!(
        eval_json("'&lt;b&gt;'.unescape('html')", json!(null)),
        json!(["<b>"])
    );
    assert_eq!(
        eval_json("'a\\nb'.escape('json')", json!(null)),
        json!(["a\\nb"])
    );
}

#[test]
fn test_string_function_type_errors() {
    let err = eval_err("1.substring(0)", json!(null));
    assert_eq!(err.kind(), ErrorKind::Type);
    let err = eval_err("$this.length()", json!(["a", "b"]));
    assert_eq!(err.kind(), ErrorKind::Evaluation);
}

// ============================================================================
// Math
// ============================================================================

#[test]
fn test_math_functions() {
    assert_eq!(eval_json("(-5).abs()", json!(null)), json!([5]));
    assert_eq!(eval_json("(-5.5).abs()", json!(null)), json!([5.5]));
    assert_eq!(eval_json("2.1.ceiling()", json!(null)), json!([3]));
    assert_eq!(eval_json("(-2.1).ceiling()", json!(null)), json!([-2]));
    assert_eq!(eval_json("2.9.floor()", json!(null)), json!([2]));
    assert_eq!(eval_json("(-2.1).floor()", json!(null)), json!([-3]));
    assert_eq!(eval_json("2.7.truncate()", json!(null)), json!([2]));
    assert_eq!(eval_json("3.14159.round(2)", json!(null)), json!([3.14]));
    // Whole-number decimals normalize, so they render as plain integers.
    assert_eq!(eval_json("16.sqrt()", json!(null)), json!([4]));
    assert_eq!(eval_json("(-1).sqrt()", json!(null)), json!([]));
    assert_eq!(eval_json("2.power(10)", json!(null)), json!([1024]));
    assert_eq!(eval_json("(-1).power(0.5)", json!(null)), json!([]));
    assert_eq!(eval_json("100.log(10)", json!(null)), json!([2]));
    assert_eq!(eval_json("(-1).ln()", json!(null)), json!([]));
    assert_eq!(eval_json("0.exp()", json!(null)), json!([1]));
    assert_eq!(eval_json("{}.abs()", json!(null)), json!([]));
    assert_eq!(
        eval_err("'x'.abs()", json!(null)).kind(),
        ErrorKind::Type
    );
}

// ============================================================================
// Conversion
// ============================================================================

#[test]
fn test_to_integer_and_decimal() {
    assert_eq!(eval_json("'42'.toInteger()", json!(null)), json!([42]));
    assert_eq!(eval_json("true.toInteger()", json!(null)), json!([1]));
    assert_eq!(eval_json("'x'.toInteger()", json!(null)), json!([]));
    assert_eq!(eval_json("3.5.toInteger()", json!(null)), json!([]));
    assert_eq!(eval_json("'3.5'.toDecimal()", json!(null)), json!([3.5]));
    assert_eq!(eval_json("2.toDecimal()", json!(null)), json!([2]));
}

#[test]
fn test_converts_to_variants() {
    assert_eq!(
        eval_json("'42'.convertsToInteger()", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'x'.convertsToInteger()", json!(null)),
        json!([false])
    );
    assert_eq!(eval_json("{}.convertsToInteger()", json!(null)), json!([]));
    assert_eq!(
        eval_json("'1974-12-25'.convertsToDate()", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'not a date'.convertsToDate()", json!(null)),
        json!([false])
    );
    assert_eq!(
        eval_json("'14:30'.convertsToTime()", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'5.4 \\'mg\\''.convertsToQuantity()", json!(null)),
        json!([true])
    );
}

#[test]
fn test_to_boolean() {
    assert_eq!(eval_json("'true'.toBoolean()", json!(null)), json!([true]));
    assert_eq!(eval_json("'F'.toBoolean()", json!(null)), json!([false]));
    assert_eq!(eval_json("1.toBoolean()", json!(null)), json!([true]));
    assert_eq!(eval_json("7.toBoolean()", json!(null)), json!([]));
}

#[test]
fn test_to_string_renders_precision() {
    assert_eq!(eval_json("42.toString()", json!(null)), json!(["42"]));
    assert_eq!(eval_json("true.toString()", json!(null)), json!(["true"]));
    assert_eq!(
        eval_json("@2024-03.toString()", json!(null)),
        json!(["2024-03"])
    );
    assert_eq!(
        eval_json("@T14:30.toString()", json!(null)),
        json!(["14:30"])
    );
    assert_eq!(
        eval_json("@2024-01-01T10:30:00Z.toString()", json!(null)),
        json!(["2024-01-01T10:30:00Z"])
    );
}

#[test]
fn test_temporal_conversions() {
    assert_eq!(
        eval_json("'1974-12-25'.toDate() = @1974-12-25", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("@2024-01-01T10:30:00Z.toDate() = @2024-01-01", json!(null)),
        json!([true])
    );
    assert_eq!(
        eval_json("'4 days'.toQuantity() = 4 days", json!(null)),
        json!([true])
    );
}

// ============================================================================
// Types and navigation
// ============================================================================

#[test]
fn test_type_function_forms() {
    assert_eq!(eval_json("1.is(Integer)", json!(null)), json!([true]));
    assert_eq!(eval_json("'a'.is(System.String)", json!(null)), json!([true]));
    assert_eq!(
        eval_json("{1, 'a'}.as(Integer)", json!(null)),
        json!([1])
    );
    assert_eq!(
        eval_json("1.type().name", json!(null)),
        json!(["Integer"])
    );
    assert_eq!(
        eval_json("1.type().namespace", json!(null)),
        json!(["System"])
    );
    // Resource checks succeed only with a model provider injected.
    assert_eq!(eval_json("$this is Patient", patient()), json!([false]));
}

#[test]
fn test_children_and_descendants() {
    let input = json!({"a": {"b": {"c": 1}}, "d": 2});
    assert_eq!(eval_json("children().count()", input.clone()), json!([2]));
    assert_eq!(eval_json("descendants().count()", input), json!([4]));
}

// ============================================================================
// Utility
// ============================================================================

#[test]
fn test_not_function() {
    assert_eq!(eval_json("true.not()", json!(null)), json!([false]));
    assert_eq!(eval_json("false.not()", json!(null)), json!([true]));
    assert_eq!(eval_json("{}.not()", json!(null)), json!([]));
}

#[test]
fn test_define_variable_rebinding_fails() {
    let err = eval_err(
        "defineVariable('v', 1).defineVariable('v', 2).select(%v)",
        json!({}),
    );
    assert_eq!(err.kind(), ErrorKind::Evaluation);
}

#[test]
fn test_unknown_env_variable_is_empty_but_index_outside_iteration_fails() {
    assert_eq!(eval_json("%nothing", json!(null)), json!([]));
    let err = eval_err("$index", json!(null));
    assert_eq!(err.kind(), ErrorKind::UnknownVariable);
    let err = eval_err("$total", json!(null));
    assert_eq!(err.kind(), ErrorKind::UnknownVariable);
}

#[test]
fn test_argument_count_errors() {
    let err = eval_err("1.substring()", json!(null));
    assert_eq!(err.kind(), ErrorKind::ArgumentCount);
    let err = eval_err("$this.where(1, 2)", json!([1]));
    assert_eq!(err.kind(), ErrorKind::ArgumentCount);
}
