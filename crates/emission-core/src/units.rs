//! Explicit unit registry used to bring activity amounts into a factor's unit.
//!
//! Every unit belongs to one dimension and carries an exact multiplier to that dimension's
//! base unit (liters, kilograms, megajoules). Two units convert only when both are registered
//! and share a dimension; spelling variants are listed as their own entries.

use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Volume,
    Mass,
    Energy,
}

/// (name, dimension, mantissa, scale) of the multiplier to the dimension base.
const UNITS: &[(&str, Dimension, i64, u32)] = &[
    ("liters", Dimension::Volume, 1, 0),
    ("litres", Dimension::Volume, 1, 0),
    ("L", Dimension::Volume, 1, 0),
    ("ml", Dimension::Volume, 1, 3),
    ("m3", Dimension::Volume, 1000, 0),
    ("gallons", Dimension::Volume, 3_785_411_784, 9),
    ("kg", Dimension::Mass, 1, 0),
    ("g", Dimension::Mass, 1, 3),
    ("tonnes", Dimension::Mass, 1000, 0),
    ("lb", Dimension::Mass, 45_359_237, 8),
    ("MJ", Dimension::Energy, 1, 0),
    ("GJ", Dimension::Energy, 1000, 0),
    ("kWh", Dimension::Energy, 36, 1),
    ("MWh", Dimension::Energy, 3600, 0),
    // Hong Kong towngas billing unit
    ("Unit", Dimension::Energy, 48, 0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDefinition {
    pub name: &'static str,
    pub dimension: Dimension,
    pub to_base: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("no registered conversion from '{from}' to '{to}'")]
    Unsupported { from: String, to: String },
    #[error("converting from '{from}' to '{to}' overflowed")]
    Overflow { from: String, to: String },
}

impl ConversionError {
    pub fn units(&self) -> (&str, &str) {
        match self {
            Self::Unsupported { from, to } | Self::Overflow { from, to } => (from, to),
        }
    }
}

pub fn lookup(name: &str) -> Option<UnitDefinition> {
    let name = name.trim();
    UNITS
        .iter()
        .find(|(candidate, ..)| *candidate == name)
        .map(|(name, dimension, mantissa, scale)| UnitDefinition {
            name: *name,
            dimension: *dimension,
            to_base: Decimal::new(*mantissa, *scale),
        })
}

/// All registered units, in registry order.
pub fn registered() -> impl Iterator<Item = UnitDefinition> {
    UNITS.iter().filter_map(|(name, ..)| lookup(name))
}

/// Convert `amount` expressed in `from` into `to`.
pub fn convert(amount: Decimal, from: &str, to: &str) -> Result<Decimal, ConversionError> {
    if from.trim() == to.trim() {
        return Ok(amount);
    }

    let unsupported = || ConversionError::Unsupported {
        from: from.to_string(),
        to: to.to_string(),
    };
    let source = lookup(from).ok_or_else(unsupported)?;
    let target = lookup(to).ok_or_else(unsupported)?;
    if source.dimension != target.dimension {
        return Err(unsupported());
    }

    amount
        .checked_mul(source.to_base)
        .and_then(|base| base.checked_div(target.to_base))
        .ok_or_else(|| ConversionError::Overflow {
            from: from.to_string(),
            to: to.to_string(),
        })
}
