//! Inclusive numeric bounds.

use crate::schema::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A bound as declared on a field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

/// Which bound a value fell outside of.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundViolation {
    Below { value: Number, min: Number },
    Above { value: Number, max: Number },
}

impl fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundViolation::Below { value, min } => {
                write!(f, "{} is below the minimum {}", value, min)
            }
            BoundViolation::Above { value, max } => {
                write!(f, "{} is above the maximum {}", value, max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min: Option<Number>,
    pub max: Option<Number>,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check a decoded value. Non-numeric values (including null) always pass.
    pub fn check(&self, value: &Value) -> Result<(), BoundViolation> {
        let number = match value {
            Value::Int(v) => Number::Int(*v),
            Value::Float(v) => Number::Float(*v),
            _ => return Ok(()),
        };
        if let Some(min) = self.min {
            if !at_least(number, min) {
                return Err(BoundViolation::Below { value: number, min });
            }
        }
        if let Some(max) = self.max {
            if !at_least(max, number) {
                return Err(BoundViolation::Above { value: number, max });
            }
        }
        Ok(())
    }
}

/// `a >= b`, exact for integer pairs.
fn at_least(a: Number, b: Number) -> bool {
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => a >= b,
        (a, b) => a.as_f64() >= b.as_f64(),
    }
}
