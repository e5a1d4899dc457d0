#![allow(dead_code)]

use std::sync::OnceLock;

use lumen_fhirpath::{Collection, Engine, Error, EvalOptions};

static ENGINE: OnceLock<Engine> = OnceLock::new();

pub fn engine() -> &'static Engine {
    ENGINE.get_or_init(Engine::new)
}

pub fn eval(expr: &str, input: serde_json::Value) -> Collection {
    engine()
        .evaluate(expr, &input, &EvalOptions::new())
        .unwrap_or_else(|e| panic!("evaluation of '{expr}' failed: {e}"))
}

pub fn eval_json(expr: &str, input: serde_json::Value) -> serde_json::Value {
    eval(expr, input).to_json()
}

pub fn eval_err(expr: &str, input: serde_json::Value) -> Error {
    engine()
        .evaluate(expr, &input, &EvalOptions::new())
        .expect_err(&format!("evaluation of '{expr}' unexpectedly succeeded"))
}

/// Sample Patient resource shared by the navigation tests.
pub fn patient() -> serde_json::Value {
    serde_json::json!({
        "resourceType": "Patient",
        "active": true,
        "name": [
            {"use": "official", "given": ["John", "James"], "family": "Doe"},
            {"use": "nickname", "given": ["Johnny"], "family": "Doe"}
        ],
        "birthDate": "1974-12-25",
        "telecom": [
            {"system": "phone", "value": "555-1234"},
            {"system": "email", "value": "john@example.org"}
        ]
    })
}
