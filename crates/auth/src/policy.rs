//! Tenant-authored policy documents.
//!
//! Documents are validated structurally when they are accepted, never "best
//! effort". Pattern contents are not checked against any catalogue: a pattern
//! that names nothing simply never fires.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::permissions::matches_pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(Effect::Allow),
            "deny" => Some(Effect::Deny),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub effect: Effect,
    pub action: Vec<String>,
    pub resource: Vec<String>,
}

impl Statement {
    /// One action pattern matches AND one resource pattern matches.
    pub fn fires(&self, action: &str, resource: &str) -> bool {
        self.action.iter().any(|p| matches_pattern(p, action))
            && self.resource.iter().any(|p| matches_pattern(p, resource))
    }
}

/// `{version, statement[]}`. Immutable once accepted; replace, don't patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyDocumentError {
    /// Every structural problem found, one line each, e.g.
    /// `statement[1]: action must be a non-empty list`.
    #[error("malformed policy document: {}", issues.join("; "))]
    Malformed { issues: Vec<String> },
}

impl PolicyDocumentError {
    fn single(issue: impl Into<String>) -> Self {
        PolicyDocumentError::Malformed {
            issues: vec![issue.into()],
        }
    }

    pub fn issues(&self) -> &[String] {
        match self {
            PolicyDocumentError::Malformed { issues } => issues,
        }
    }
}

impl PolicyDocument {
    /// Parse and validate an author-supplied JSON document.
    pub fn parse(json: &str) -> Result<Self, PolicyDocumentError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PolicyDocumentError::single(format!("document: invalid JSON: {e}")))?;
        Self::try_from(value)
    }

    /// Re-check a document assembled in code.
    pub fn validate(&self) -> Result<(), PolicyDocumentError> {
        let mut issues = Vec::new();
        if self.version.trim().is_empty() {
            issues.push("document: version must not be empty".to_string());
        }
        if self.statement.is_empty() {
            issues.push("document: at least one statement is required".to_string());
        }
        for (i, statement) in self.statement.iter().enumerate() {
            check_patterns(i, "action", &statement.action, &mut issues);
            check_patterns(i, "resource", &statement.resource, &mut issues);
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(PolicyDocumentError::Malformed { issues })
        }
    }

    /// Statements of this document that fire for the concrete pair.
    pub fn firing<'a>(
        &'a self,
        action: &'a str,
        resource: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Statement)> + 'a {
        self.statement
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.fires(action, resource))
    }
}

impl TryFrom<Value> for PolicyDocument {
    type Error = PolicyDocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut obj) = value else {
            return Err(PolicyDocumentError::single("document: expected a JSON object"));
        };
        let mut issues = Vec::new();

        let version = match obj.remove("version") {
            Some(Value::String(v)) if !v.trim().is_empty() => v,
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(_)) => {
                issues.push("document: version must not be empty".to_string());
                String::new()
            }
            Some(_) => {
                issues.push("document: version must be a string".to_string());
                String::new()
            }
            None => {
                issues.push("document: version is required".to_string());
                String::new()
            }
        };

        let raw_statements = match obj.remove("statement") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            Some(Value::Array(_)) => {
                issues.push("document: at least one statement is required".to_string());
                Vec::new()
            }
            Some(_) => {
                issues.push("document: statement must be a list".to_string());
                Vec::new()
            }
            None => {
                issues.push("document: statement is required".to_string());
                Vec::new()
            }
        };

        let mut statement = Vec::with_capacity(raw_statements.len());
        for (i, raw) in raw_statements.into_iter().enumerate() {
            if let Some(parsed) = parse_statement(i, raw, &mut issues) {
                statement.push(parsed);
            }
        }

        if issues.is_empty() {
            Ok(PolicyDocument { version, statement })
        } else {
            Err(PolicyDocumentError::Malformed { issues })
        }
    }
}

fn parse_statement(index: usize, raw: Value, issues: &mut Vec<String>) -> Option<Statement> {
    let Value::Object(mut obj) = raw else {
        issues.push(format!("statement[{index}]: expected an object"));
        return None;
    };

    let effect = match obj.remove("effect") {
        Some(Value::String(e)) if e.trim().is_empty() => {
            issues.push(format!("statement[{index}]: effect must not be empty"));
            None
        }
        Some(Value::String(e)) => {
            let parsed = Effect::parse(&e);
            if parsed.is_none() {
                issues.push(format!(
                    "statement[{index}]: effect must be 'allow' or 'deny', got '{e}'"
                ));
            }
            parsed
        }
        Some(_) => {
            issues.push(format!("statement[{index}]: effect must be a string"));
            None
        }
        None => {
            issues.push(format!("statement[{index}]: effect is required"));
            None
        }
    };

    let action = string_list(index, "action", obj.remove("action"), issues);
    let resource = string_list(index, "resource", obj.remove("resource"), issues);

    Some(Statement {
        effect: effect?,
        action: action?,
        resource: resource?,
    })
}

fn string_list(
    index: usize,
    field: &str,
    raw: Option<Value>,
    issues: &mut Vec<String>,
) -> Option<Vec<String>> {
    let items = match raw {
        Some(Value::Array(items)) => items,
        Some(_) => {
            issues.push(format!("statement[{index}]: {field} must be a list of strings"));
            return None;
        }
        None => {
            issues.push(format!("statement[{index}]: {field} is required"));
            return None;
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s),
            _ => {
                issues.push(format!("statement[{index}]: {field} must be a list of strings"));
                return None;
            }
        }
    }

    let before = issues.len();
    check_patterns(index, field, &out, issues);
    (issues.len() == before).then_some(out)
}

fn check_patterns(index: usize, field: &str, patterns: &[String], issues: &mut Vec<String>) {
    if patterns.is_empty() {
        issues.push(format!("statement[{index}]: {field} must be a non-empty list"));
    } else if patterns.iter().any(|p| p.trim().is_empty()) {
        issues.push(format!("statement[{index}]: {field} contains an empty pattern"));
    }
}
