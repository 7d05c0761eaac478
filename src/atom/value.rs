//! Values attached to atoms.
//!
//! The core only distinguishes default from non-default truth and attention
//! values; anything richer belongs to the subsystems that interpret them.

use serde::{Deserialize, Serialize};

use super::Handle;

/// Simple (strength, confidence) truth value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TruthValue {
    pub strength: f64,
    pub confidence: f64,
}

impl TruthValue {
    /// The value every atom starts with: full strength, zero confidence.
    pub const DEFAULT: TruthValue = TruthValue {
        strength: 1.0,
        confidence: 0.0,
    };

    pub fn new(strength: f64, confidence: f64) -> Self {
        Self {
            strength,
            confidence,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for TruthValue {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for TruthValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(stv {} {})", self.strength, self.confidence)
    }
}

/// Short-, long- and very-long-term importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttentionValue {
    pub sti: i16,
    pub lti: i16,
    pub vlti: i16,
}

impl AttentionValue {
    pub fn new(sti: i16, lti: i16, vlti: i16) -> Self {
        Self { sti, lti, vlti }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl std::fmt::Display for AttentionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(av {} {} {})", self.sti, self.lti, self.vlti)
    }
}

/// A value stored in an atom's value map.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(Vec<f64>),
    String(Vec<String>),
    /// Heterogeneous sequence of values.
    Link(Vec<Value>),
    Truth(TruthValue),
    Atom(Handle),
}

impl Value {
    /// Every atom referenced by this value, depth first.
    pub fn atoms(&self) -> Vec<Handle> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms(&self, out: &mut Vec<Handle>) {
        match self {
            Value::Atom(h) => out.push(h.clone()),
            Value::Link(items) => items.iter().for_each(|v| v.collect_atoms(out)),
            Value::Float(_) | Value::String(_) | Value::Truth(_) => {}
        }
    }

    /// Rebuild this value with every atom passed through `f`.
    ///
    /// Returns `Ok(None)` as soon as `f` declines an atom.
    pub fn try_map_atoms<E>(
        &self,
        f: &mut impl FnMut(&Handle) -> Result<Option<Handle>, E>,
    ) -> Result<Option<Value>, E> {
        Ok(match self {
            Value::Atom(h) => f(h)?.map(Value::Atom),
            Value::Link(items) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    match item.try_map_atoms(f)? {
                        Some(v) => mapped.push(v),
                        None => return Ok(None),
                    }
                }
                Some(Value::Link(mapped))
            }
            other => Some(other.clone()),
        })
    }
}

impl From<TruthValue> for Value {
    fn from(tv: TruthValue) -> Self {
        Value::Truth(tv)
    }
}
