//! Request/response contracts and their validation
//!
//! Each contract is a static table of field rules. The same table drives two
//! things: checking an untyped JSON payload (inbound request bodies and model
//! output alike) and rendering the structured-output schema the model is asked
//! to follow. Values already held as typed records are checked with their
//! `validator` derives and reported in the same [`Violations`] shape.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::models::CommunicationStatus;

/// Expected JSON type and constraint of a single field
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    Number { min: Option<f64>, max: Option<f64> },
    Text { non_empty: bool },
    Enum(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    /// Dotted path from the payload root, e.g. `breakdown.thermal`
    pub path: &'static str,
    pub field_type: FieldType,
}

/// A named request/response contract
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldRule],
}

const PERCENT: FieldType = FieldType::Number { min: Some(0.0), max: Some(100.0) };
const ANY_NUMBER: FieldType = FieldType::Number { min: None, max: None };
const NON_EMPTY_TEXT: FieldType = FieldType::Text { non_empty: true };

pub const RISK_SCORE_INPUT: Schema = Schema {
    name: "RiskScoreInput",
    fields: &[
        FieldRule { path: "batteryLevel", field_type: PERCENT },
        FieldRule { path: "temperature", field_type: ANY_NUMBER },
        FieldRule { path: "communicationStatus", field_type: FieldType::Enum(&CommunicationStatus::ALL) },
    ],
};

pub const RISK_SCORE_OUTPUT: Schema = Schema {
    name: "RiskScoreOutput",
    fields: &[
        FieldRule { path: "riskScore", field_type: PERCENT },
        FieldRule { path: "explanation", field_type: NON_EMPTY_TEXT },
    ],
};

pub const ANOMALY_EXPLANATION_INPUT: Schema = Schema {
    name: "AnomalyExplanationInput",
    fields: &[
        FieldRule { path: "satelliteId", field_type: NON_EMPTY_TEXT },
    ],
};

pub const ANOMALY_EXPLANATION_OUTPUT: Schema = Schema {
    name: "AnomalyExplanationOutput",
    fields: &[
        FieldRule { path: "explanation", field_type: NON_EMPTY_TEXT },
        FieldRule { path: "breakdown.thermal", field_type: PERCENT },
        FieldRule { path: "breakdown.comm", field_type: PERCENT },
        FieldRule { path: "breakdown.power", field_type: PERCENT },
        FieldRule { path: "breakdown.orientation", field_type: PERCENT },
    ],
};

// ============================================================================
// VIOLATIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    WrongType { expected: &'static str },
    OutOfRange { min: Option<f64>, max: Option<f64> },
    InvalidEnum { allowed: Vec<String> },
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self { field: field.into(), kind }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{} is required", self.field),
            ViolationKind::WrongType { expected } => write!(f, "{} must be a {}", self.field, expected),
            ViolationKind::OutOfRange { min, max } => {
                let lo = min.map(|v| v.to_string()).unwrap_or_else(|| "-inf".to_string());
                let hi = max.map(|v| v.to_string()).unwrap_or_else(|| "inf".to_string());
                write!(f, "{} must be within [{}, {}]", self.field, lo, hi)
            }
            ViolationKind::InvalidEnum { allowed } => {
                write!(f, "{} must be one of: {}", self.field, allowed.join(", "))
            }
            ViolationKind::Empty => write!(f, "{} must not be empty", self.field),
        }
    }
}

/// Every field a payload failed on, in schema order
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Violations(pub Vec<Violation>);

impl Violations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|v| v.field.as_str()).collect()
    }

    pub fn single(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self(vec![Violation::new(field, kind)])
    }

    fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for Violations {}

// ============================================================================
// UNTYPED PAYLOAD VALIDATION
// ============================================================================

/// Check `payload` against `schema` and deserialize it into `T`
pub fn validate_payload<T: DeserializeOwned>(schema: &Schema, payload: &Value) -> Result<T, Violations> {
    check_payload(schema, payload)?;

    serde_json::from_value(payload.clone()).map_err(|e| {
        // Rules and the target type disagree; report against the root
        tracing::error!("{} payload passed rules but failed to deserialize: {}", schema.name, e);
        Violations::single("$", ViolationKind::WrongType { expected: schema.name })
    })
}

/// Check `payload` against `schema`, collecting every violation
pub fn check_payload(schema: &Schema, payload: &Value) -> Result<(), Violations> {
    let Some(root) = payload.as_object() else {
        return Err(Violations::single("$", ViolationKind::WrongType { expected: "object" }));
    };

    let mut violations = Vec::new();
    // Parent paths already reported so a missing object is named once
    let mut broken_parents: Vec<String> = Vec::new();

    for rule in schema.fields {
        match lookup(root, rule.path) {
            Lookup::Found(value) => {
                if let Some(kind) = check_field(rule.field_type, value) {
                    violations.push(Violation::new(rule.path, kind));
                }
            }
            Lookup::Missing => violations.push(Violation::new(rule.path, ViolationKind::Missing)),
            Lookup::BrokenParent { parent, missing } => {
                if !broken_parents.contains(&parent) {
                    let kind = if missing {
                        ViolationKind::Missing
                    } else {
                        ViolationKind::WrongType { expected: "object" }
                    };
                    violations.push(Violation::new(parent.clone(), kind));
                    broken_parents.push(parent);
                }
            }
        }
    }

    Violations(violations).into_result()
}

enum Lookup<'a> {
    Found(&'a Value),
    Missing,
    BrokenParent { parent: String, missing: bool },
}

fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Lookup<'a> {
    let segments: Vec<&str> = path.split('.').collect();
    let (leaf, parents) = match segments.split_last() {
        Some(split) => split,
        None => return Lookup::Missing,
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let parent = segments[..=depth].join(".");
        match current.get(*segment) {
            Some(Value::Object(next)) => current = next,
            Some(Value::Null) | None => return Lookup::BrokenParent { parent, missing: true },
            Some(_) => return Lookup::BrokenParent { parent, missing: false },
        }
    }

    match current.get(*leaf) {
        Some(Value::Null) | None => Lookup::Missing,
        Some(value) => Lookup::Found(value),
    }
}

fn check_field(field_type: FieldType, value: &Value) -> Option<ViolationKind> {
    match field_type {
        FieldType::Number { min, max } => {
            let Some(n) = value.as_f64() else {
                return Some(ViolationKind::WrongType { expected: "number" });
            };
            let below = min.is_some_and(|lo| n < lo);
            let above = max.is_some_and(|hi| n > hi);
            (below || above).then_some(ViolationKind::OutOfRange { min, max })
        }
        FieldType::Text { non_empty } => {
            let Some(s) = value.as_str() else {
                return Some(ViolationKind::WrongType { expected: "string" });
            };
            (non_empty && s.trim().is_empty()).then_some(ViolationKind::Empty)
        }
        FieldType::Enum(allowed) => {
            let Some(s) = value.as_str() else {
                return Some(ViolationKind::WrongType { expected: "string" });
            };
            (!allowed.contains(&s)).then(|| ViolationKind::InvalidEnum {
                allowed: allowed.iter().map(|a| a.to_string()).collect(),
            })
        }
    }
}

// ============================================================================
// TYPED VALIDATION
// ============================================================================

/// Check a typed record through its `validator` derive, reporting in the
/// field order of `schema`
pub fn validate_typed<T: Validate>(schema: &Schema, value: &T) -> Result<(), Violations> {
    match value.validate() {
        Ok(()) => Ok(()),
        Err(errors) => Err(from_validation_errors(schema, &errors)),
    }
}

/// Convert `validator` errors into violations named by wire (camelCase) path
pub fn from_validation_errors(schema: &Schema, errors: &ValidationErrors) -> Violations {
    let mut out = Vec::new();
    collect_errors("", errors, &mut out);
    // Fields the schema does not name go last
    out.sort_by_key(|v| schema.fields.iter().position(|rule| rule.path == v.field).unwrap_or(usize::MAX));
    Violations(out)
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<Violation>) {
    for (field, kind) in errors.errors() {
        let path = format!("{}{}", prefix, to_camel_case(field));
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let kind = match &*error.code {
                        "range" => ViolationKind::OutOfRange {
                            min: error.params.get("min").and_then(Value::as_f64),
                            max: error.params.get("max").and_then(Value::as_f64),
                        },
                        "length" => ViolationKind::Empty,
                        _ => ViolationKind::WrongType { expected: "valid value" },
                    };
                    out.push(Violation::new(path.clone(), kind));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_errors(&format!("{}.", path), inner, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(&format!("{}[{}].", path, index), inner, out);
                }
            }
        }
    }
}

fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// STRUCTURED OUTPUT DECLARATION
// ============================================================================

impl Schema {
    /// Render the structured-output schema sent along with a completion request
    pub fn response_schema(&self) -> Value {
        let mut root = Map::new();
        for rule in self.fields {
            let segments: Vec<&str> = rule.path.split('.').collect();
            insert_property(&mut root, &segments, property_schema(rule.field_type));
        }
        object_schema(root)
    }
}

fn insert_property(properties: &mut Map<String, Value>, segments: &[&str], leaf: Value) {
    match segments {
        [] => {}
        [name] => {
            properties.insert(name.to_string(), leaf);
        }
        [name, rest @ ..] => {
            let entry = properties
                .entry(name.to_string())
                .or_insert_with(|| object_schema(Map::new()));

            let mut nested = entry
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            insert_property(&mut nested, rest, leaf);
            *entry = object_schema(nested);
        }
    }
}

fn object_schema(properties: Map<String, Value>) -> Value {
    let required: Vec<Value> = properties.keys().map(|k| Value::String(k.clone())).collect();
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

fn property_schema(field_type: FieldType) -> Value {
    match field_type {
        FieldType::Number { min, max } => {
            let mut prop = json!({ "type": "NUMBER" });
            if let Some(lo) = min {
                prop["minimum"] = json!(lo);
            }
            if let Some(hi) = max {
                prop["maximum"] = json!(hi);
            }
            prop
        }
        FieldType::Text { .. } => json!({ "type": "STRING" }),
        FieldType::Enum(allowed) => json!({
            "type": "STRING",
            "format": "enum",
            "enum": allowed,
        }),
    }
}
