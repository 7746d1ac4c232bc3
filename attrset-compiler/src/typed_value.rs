// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Converters from literal attribute text to Res_value encodings, following
// the rules AAPT applies when it compiles XML.
use phf::phf_map;

use crate::{attribute_formats::AttributeDefinition, resource_external_types::AttributeDataType};

// Layout of a "complex" value, used by dimensions and fractions
const COMPLEX_UNIT_SHIFT: u32 = 0;
const COMPLEX_UNIT_MASK: u32 = 0xF;
const COMPLEX_RADIX_SHIFT: u32 = 4;
const COMPLEX_RADIX_MASK: u32 = 0x3;
const COMPLEX_MANTISSA_SHIFT: u32 = 8;
const COMPLEX_MANTISSA_MASK: u32 = 0xFF_FFFF;

// Where the binary point sits within the mantissa, eg. 23p0 is 23 integer bits
const COMPLEX_RADIX_23P0: u32 = 0;
const COMPLEX_RADIX_16P7: u32 = 1;
const COMPLEX_RADIX_8P15: u32 = 2;
const COMPLEX_RADIX_0P23: u32 = 3;

const MANTISSA_MULTIPLIER: f32 = 1.0 / (1 << COMPLEX_MANTISSA_SHIFT) as f32;
const RADIX_MULTIPLIERS: [f32; 4] = [
    MANTISSA_MULTIPLIER,
    MANTISSA_MULTIPLIER / (1 << 7) as f32,
    MANTISSA_MULTIPLIER / (1 << 15) as f32,
    MANTISSA_MULTIPLIER / (1 << 23) as f32
];

const BOOLEAN_TRUE: u32 = 0xFFFF_FFFF;
const BOOLEAN_FALSE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ComplexUnit {
    data_type: AttributeDataType,
    unit: u32,
    // Applied to the number before encoding, eg. 50% is stored as 0.5
    scale: f32
}

static COMPLEX_UNITS: phf::Map<&'static str, ComplexUnit> = phf_map! {
    "px" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 0, scale: 1.0 },
    "dip" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 1, scale: 1.0 },
    "dp" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 1, scale: 1.0 },
    "sp" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 2, scale: 1.0 },
    "pt" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 3, scale: 1.0 },
    "in" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 4, scale: 1.0 },
    "mm" => ComplexUnit { data_type: AttributeDataType::Dimension, unit: 5, scale: 1.0 },
    "%" => ComplexUnit { data_type: AttributeDataType::Fraction, unit: 0, scale: 0.01 },
    "%p" => ComplexUnit { data_type: AttributeDataType::Fraction, unit: 1, scale: 0.01 }
};

/// One of the typed formats an attribute can declare, excluding `reference`
/// which is recognised by its literal syntax instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    String,
    Integer,
    Boolean,
    Color,
    Float,
    Dimension,
    Fraction,
    Enum,
    Flags
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedValue {
    /// The text is kept as a string, its payload is a string pool index.
    String,
    Data(AttributeDataType, u32)
}

impl ValueFormat {
    /// Attempts to convert `text`. `None` means this format doesn't accept it
    /// and the next candidate should be tried.
    pub fn convert(self, text: &str, definition: &AttributeDefinition) -> Option<TypedValue> {
        match self {
            ValueFormat::String => Some(TypedValue::String),
            ValueFormat::Integer => parse_integer(text),
            ValueFormat::Boolean => parse_boolean(text),
            ValueFormat::Color => parse_color(text),
            ValueFormat::Float => parse_float(text),
            ValueFormat::Dimension => parse_complex(text, AttributeDataType::Dimension),
            ValueFormat::Fraction => parse_complex(text, AttributeDataType::Fraction),
            ValueFormat::Enum => lookup_enum(text, definition),
            ValueFormat::Flags => lookup_flags(text, definition)
        }
    }
}

/// `123`, `-7`, or `0x1F`.
pub fn parse_integer(text: &str) -> Option<TypedValue> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > 8 {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        return Some(TypedValue::Data(AttributeDataType::HexInteger, value));
    }
    let value = text.parse::<i32>().ok()?;
    Some(TypedValue::Data(
        AttributeDataType::DecimalInteger,
        value as u32
    ))
}

pub fn parse_boolean(text: &str) -> Option<TypedValue> {
    let data = match text.trim() {
        "true" | "TRUE" | "True" => BOOLEAN_TRUE,
        "false" | "FALSE" | "False" => BOOLEAN_FALSE,
        _ => return None
    };
    Some(TypedValue::Data(AttributeDataType::BooleanInteger, data))
}

/// `#RGB`, `#ARGB`, `#RRGGBB` or `#AARRGGBB`. The payload is always the
/// expanded ARGB8888 value, with an opaque alpha if none was given.
pub fn parse_color(text: &str) -> Option<TypedValue> {
    let digits = text.trim().strip_prefix('#')?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    // Turns 0xRGB into 0xRRGGBB
    let expand_nibbles = |short: u32| {
        (0..4).fold(0, |acc, i| {
            let nibble = (short >> (i * 4)) & 0xF;
            acc | (nibble * 0x11) << (i * 8)
        })
    };
    let (data_type, argb) = match digits.len() {
        3 => (AttributeDataType::ColorRgb4, 0xFF00_0000 | expand_nibbles(value)),
        4 => (AttributeDataType::ColorArgb4, expand_nibbles(value)),
        6 => (AttributeDataType::ColorRgb8, 0xFF00_0000 | value),
        8 => (AttributeDataType::ColorArgb8, value),
        _ => return None
    };
    Some(TypedValue::Data(data_type, argb))
}

pub fn parse_float(text: &str) -> Option<TypedValue> {
    let value = text.trim().parse::<f32>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(TypedValue::Data(AttributeDataType::Float, value.to_bits()))
}

/// A number followed by a unit suffix, eg. `16dp` or `50%p`. Only units
/// belonging to `data_type` (dimension or fraction) are accepted.
pub fn parse_complex(text: &str, data_type: AttributeDataType) -> Option<TypedValue> {
    let text = text.trim();
    // The unit starts at the first letter that can't be part of an exponent
    let unit_start =
        text.find(|c: char| c == '%' || (c.is_ascii_alphabetic() && c != 'e' && c != 'E'))?;
    let (number, unit) = text.split_at(unit_start);
    let unit = COMPLEX_UNITS.get(unit)?;
    if unit.data_type != data_type {
        return None;
    }
    let value = number.trim().parse::<f32>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(TypedValue::Data(
        data_type,
        encode_complex(value * unit.scale, unit.unit)
    ))
}

/// Packs `value` into a complex payload, choosing the radix that keeps the
/// most precision.
pub fn encode_complex(value: f32, unit: u32) -> u32 {
    let negative = value < 0.0;
    let magnitude = if negative { -value } else { value };
    let bits = (magnitude * (1u32 << 23) as f32 + 0.5) as u64;

    let (radix, shift) = if bits & 0x7F_FFFF == 0 {
        // Whole number
        (COMPLEX_RADIX_23P0, 23)
    } else if bits & 0xFFFF_FFFF_FF80_0000 == 0 {
        // Magnitude only
        (COMPLEX_RADIX_0P23, 0)
    } else if bits & 0xFFFF_FFFF_8000_0000 == 0 {
        (COMPLEX_RADIX_8P15, 8)
    } else if bits & 0xFFFF_FF80_0000_0000 == 0 {
        (COMPLEX_RADIX_16P7, 16)
    } else {
        (COMPLEX_RADIX_23P0, 23)
    };

    let mut mantissa = ((bits >> shift) as u32) & COMPLEX_MANTISSA_MASK;
    if negative {
        mantissa = mantissa.wrapping_neg() & COMPLEX_MANTISSA_MASK;
    }
    (mantissa << COMPLEX_MANTISSA_SHIFT)
        | (radix << COMPLEX_RADIX_SHIFT)
        | ((unit & COMPLEX_UNIT_MASK) << COMPLEX_UNIT_SHIFT)
}

/// The inverse of [encode_complex], ignoring the unit.
pub fn complex_to_float(data: u32) -> f32 {
    let mantissa = (data & (COMPLEX_MANTISSA_MASK << COMPLEX_MANTISSA_SHIFT)) as i32;
    let radix = (data >> COMPLEX_RADIX_SHIFT) & COMPLEX_RADIX_MASK;
    mantissa as f32 * RADIX_MULTIPLIERS[radix as usize]
}

pub fn complex_unit(data: u32) -> u32 {
    (data >> COMPLEX_UNIT_SHIFT) & COMPLEX_UNIT_MASK
}

pub fn lookup_enum(text: &str, definition: &AttributeDefinition) -> Option<TypedValue> {
    let value = definition.symbol_value(text.trim())?;
    Some(TypedValue::Data(AttributeDataType::DecimalInteger, value))
}

/// `a|b|c`, every name must be one of the attribute's flags.
pub fn lookup_flags(text: &str, definition: &AttributeDefinition) -> Option<TypedValue> {
    let value = text
        .split('|')
        .map(|name| definition.symbol_value(name.trim()))
        .try_fold(0, |acc, value| value.map(|value| acc | value))?;
    Some(TypedValue::Data(AttributeDataType::HexInteger, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute_formats::AttributeFormats;
    use pretty_assertions::assert_eq;

    fn data(data_type: AttributeDataType, data: u32) -> Option<TypedValue> {
        Some(TypedValue::Data(data_type, data))
    }

    #[test]
    fn integers() {
        assert_eq!(parse_integer("42"), data(AttributeDataType::DecimalInteger, 42));
        assert_eq!(
            parse_integer(" -1 "),
            data(AttributeDataType::DecimalInteger, 0xFFFF_FFFF)
        );
        assert_eq!(parse_integer("0x1F"), data(AttributeDataType::HexInteger, 0x1F));
        assert_eq!(parse_integer("0x"), None);
        assert_eq!(parse_integer("3000000000"), None);
        assert_eq!(parse_integer("12px"), None);
    }

    #[test]
    fn booleans() {
        assert_eq!(
            parse_boolean("true"),
            data(AttributeDataType::BooleanInteger, 0xFFFF_FFFF)
        );
        assert_eq!(parse_boolean("False"), data(AttributeDataType::BooleanInteger, 0));
        assert_eq!(parse_boolean("yes"), None);
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#f80"), data(AttributeDataType::ColorRgb4, 0xFFFF_8800));
        assert_eq!(parse_color("#8f80"), data(AttributeDataType::ColorArgb4, 0x88FF_8800));
        assert_eq!(parse_color("#123456"), data(AttributeDataType::ColorRgb8, 0xFF12_3456));
        assert_eq!(parse_color("#80123456"), data(AttributeDataType::ColorArgb8, 0x8012_3456));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("123456"), None);
        assert_eq!(parse_color("#+12"), None);
    }

    #[test]
    fn floats() {
        assert_eq!(
            parse_float("1.5"),
            data(AttributeDataType::Float, 1.5f32.to_bits())
        );
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("1.5dp"), None);
    }

    #[test]
    fn whole_dimensions_use_radix_23p0() {
        assert_eq!(
            parse_complex("16dp", AttributeDataType::Dimension),
            data(AttributeDataType::Dimension, 0x1001)
        );
        assert_eq!(
            parse_complex("16dip", AttributeDataType::Dimension),
            data(AttributeDataType::Dimension, 0x1001)
        );
        assert_eq!(
            parse_complex("-16px", AttributeDataType::Dimension),
            data(AttributeDataType::Dimension, 0xFFFF_F000)
        );
    }

    #[test]
    fn fractional_dimensions() {
        assert_eq!(
            parse_complex("1.5sp", AttributeDataType::Dimension),
            data(AttributeDataType::Dimension, 0x00C0_0022)
        );
        assert_eq!(complex_to_float(0x00C0_0022), 1.5);
        assert_eq!(complex_unit(0x00C0_0022), 2);
        assert_eq!(complex_to_float(0xFFFF_F000), -16.0);
    }

    #[test]
    fn fractions_are_scaled() {
        assert_eq!(
            parse_complex("50%", AttributeDataType::Fraction),
            data(AttributeDataType::Fraction, 0x4000_0030)
        );
        let Some(TypedValue::Data(_, parent)) = parse_complex("25%p", AttributeDataType::Fraction)
        else {
            panic!("fraction not parsed");
        };
        assert_eq!(complex_unit(parent), 1);
        assert_eq!(complex_to_float(parent), 0.25);
    }

    #[test]
    fn units_must_match_the_format() {
        assert_eq!(parse_complex("50%", AttributeDataType::Dimension), None);
        assert_eq!(parse_complex("16dp", AttributeDataType::Fraction), None);
        assert_eq!(parse_complex("16", AttributeDataType::Dimension), None);
        assert_eq!(parse_complex("16em", AttributeDataType::Dimension), None);
        assert_eq!(parse_complex("dp", AttributeDataType::Dimension), None);
    }

    #[test]
    fn enums_and_flags() {
        let definition = AttributeDefinition::new(AttributeFormats::ENUM | AttributeFormats::FLAGS)
            .with_symbol("top", 0x30)
            .with_symbol("bottom", 0x50)
            .with_symbol("left", 0x03);
        assert_eq!(
            lookup_enum("bottom", &definition),
            data(AttributeDataType::DecimalInteger, 0x50)
        );
        assert_eq!(
            lookup_flags("top | left", &definition),
            data(AttributeDataType::HexInteger, 0x33)
        );
        assert_eq!(lookup_flags("top|middle", &definition), None);
        assert_eq!(lookup_enum("middle", &definition), None);
    }
}
