//! Event condition evaluation.
//!
//! The grammar is deliberately tiny:
//! - `true | false | 1 | 0` literals
//! - a bare identifier is a truthy check against the variable stores
//! - `not <expr>` negation
//! - `<lhs> <op> <rhs>` with `==, !=, >=, <=, >, <`; operands are looked
//!   up in the variable stores when present, otherwise parsed as
//!   literals. When both sides are numeric the comparison is numeric,
//!   else string equality ordering applies.

use std::collections::BTreeMap;

use crate::common::Value;

/// Read-only view of the variable stores plus builtins.
pub struct VarView<'a> {
    pub game_vars: &'a BTreeMap<String, Value>,
    pub level_vars: &'a BTreeMap<String, Value>,
    pub turn_count: i32,
}

impl VarView<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if name == "turn_count" {
            return Some(Value::Int(self.turn_count as i64));
        }
        self.game_vars
            .get(name)
            .or_else(|| self.level_vars.get(name))
            .cloned()
    }

    fn resolve(&self, token: &str) -> Value {
        self.lookup(token).unwrap_or_else(|| Value::parse(token))
    }
}

/// Evaluates a condition string. Empty conditions are true; anything
/// unparseable is false.
pub fn evaluate(condition: &str, vars: &VarView<'_>) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return true;
    }
    if let Some(rest) = condition.strip_prefix("not ") {
        return !evaluate(rest, vars);
    }

    let tokens: Vec<&str> = condition.split_whitespace().collect();
    match tokens.as_slice() {
        [single] => vars.resolve(single).truthy(),
        [lhs, op, rhs] => compare(&vars.resolve(lhs), op, &vars.resolve(rhs)),
        _ => {
            tracing::warn!(%condition, "unparseable event condition");
            false
        }
    }
}

fn compare(lhs: &Value, op: &str, rhs: &Value) -> bool {
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return match op {
            "==" => a == b,
            "!=" => a != b,
            ">=" => a >= b,
            "<=" => a <= b,
            ">" => a > b,
            "<" => a < b,
            _ => false,
        };
    }
    let a = lhs.to_string();
    let b = rhs.to_string();
    match op {
        "==" => a == b,
        "!=" => a != b,
        ">=" => a >= b,
        "<=" => a <= b,
        ">" => a > b,
        "<" => a < b,
        _ => false,
    }
}
