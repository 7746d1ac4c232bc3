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

use bitflags::bitflags;
use phf::phf_map;

use crate::typed_value::ValueFormat;

bitflags! {
    /// The `format` of an `<attr>` resource: which kinds of value it accepts.
    ///
    /// Bit values match `ResTable_map::TYPE_*` in Android's ResourceTypes.h.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AttributeFormats: u32 {
        const REFERENCE = 1 << 0;
        const STRING = 1 << 1;
        const INTEGER = 1 << 2;
        const BOOLEAN = 1 << 3;
        const COLOR = 1 << 4;
        const FLOAT = 1 << 5;
        const DIMENSION = 1 << 6;
        const FRACTION = 1 << 7;
        // Every format apart from enum and flags
        const ANY = 0x0000_FFFF;
        const ENUM = 1 << 16;
        const FLAGS = 1 << 17;
    }
}

// Names used in `format="..."` of attrs.xml
static FORMAT_NAMES: phf::Map<&'static str, AttributeFormats> = phf_map! {
    "reference" => AttributeFormats::REFERENCE,
    "string" => AttributeFormats::STRING,
    "integer" => AttributeFormats::INTEGER,
    "boolean" => AttributeFormats::BOOLEAN,
    "color" => AttributeFormats::COLOR,
    "float" => AttributeFormats::FLOAT,
    "dimension" => AttributeFormats::DIMENSION,
    "fraction" => AttributeFormats::FRACTION,
    "enum" => AttributeFormats::ENUM,
    "flags" => AttributeFormats::FLAGS
};

/// The order in which formats are tried against a literal value. The first
/// one that accepts the text decides its type.
pub const FORMAT_PRIORITY: [(AttributeFormats, ValueFormat); 9] = [
    (AttributeFormats::STRING, ValueFormat::String),
    (AttributeFormats::INTEGER, ValueFormat::Integer),
    (AttributeFormats::BOOLEAN, ValueFormat::Boolean),
    (AttributeFormats::COLOR, ValueFormat::Color),
    (AttributeFormats::FLOAT, ValueFormat::Float),
    (AttributeFormats::DIMENSION, ValueFormat::Dimension),
    (AttributeFormats::FRACTION, ValueFormat::Fraction),
    (AttributeFormats::ENUM, ValueFormat::Enum),
    (AttributeFormats::FLAGS, ValueFormat::Flags)
];

impl AttributeFormats {
    /// Parses an attrs.xml style format list such as `"reference|color"`.
    ///
    /// Returns `None` if any of the names is unknown.
    pub fn from_names(names: &str) -> Option<Self> {
        names
            .split('|')
            .map(|name| FORMAT_NAMES.get(name.trim()).copied())
            .try_fold(AttributeFormats::empty(), |formats, format| {
                format.map(|format| formats | format)
            })
    }

    /// The value formats enabled by this mask, in the order they should be tried.
    pub fn candidates(self) -> impl Iterator<Item = ValueFormat> {
        FORMAT_PRIORITY
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, format)| format)
    }
}

/// Everything the value resolver needs to know about an `<attr>` resource.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDefinition {
    pub formats: AttributeFormats,
    /// Names and values of the `<enum>` or `<flag>` children, in declaration order.
    pub symbols: Vec<(String, u32)>
}

impl AttributeDefinition {
    pub fn new(formats: AttributeFormats) -> Self {
        AttributeDefinition {
            formats,
            symbols: vec![]
        }
    }

    pub fn with_symbol(mut self, name: &str, value: u32) -> Self {
        self.symbols.push((name.to_string(), value));
        self
    }

    pub fn symbol_value(&self, name: &str) -> Option<u32> {
        self.symbols
            .iter()
            .find(|(symbol, _)| symbol == name)
            .map(|(_, value)| *value)
    }
}
