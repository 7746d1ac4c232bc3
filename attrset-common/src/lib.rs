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

use std::{fmt, rc::Rc};

use deku::prelude::*;

/// Common error type making it easier to share `Result`s between attrset crates.
///
/// In general designed to avoid needing utilities like `map_err`.
#[derive(Debug, Clone)]
pub enum AttrSetError {
    /// An attribute value began with `@` as though it was a reference, but it
    /// was neither a numeric id (`@2130837504`, `@0x7f010001`) nor of the form
    /// `@[package:]type/name`.
    ReferenceParsingFailed(String),
    /// A well-formed symbolic reference such as `@drawable/preview` could not
    /// be mapped to a resource id by the resource table.
    UnresolvedSymbolicReference(String),
    /// None of the formats declared on the attribute (`string`, `integer`,
    /// `enum`, ...) accepted the literal text.
    UnresolvedFormat {
        /// Fully qualified attribute name, eg. `android:orientation`.
        attribute: String,
        /// The text that was rejected.
        value: String
    },
    /// The resource table has no name or no attribute definition for this id.
    UnknownAttributeId(u32),
    /// The output buffer was given a fixed capacity in `BuildOptions` and the
    /// attribute set does not fit into it.
    ///
    /// This is not a caller error, the configured capacity needs enlarging.
    BufferCapacityExceeded { capacity: usize, required: usize },
    /// Binary chunks were closed in a different order than they were opened.
    ///
    /// **If you experience this, it is considered an internal bug.**
    ChunkNestingMismatch,
    /// `build()` was called a second time on the same attribute set.
    AttributeSetAlreadyBuilt,
    /// An element can hold at most `u16::MAX` attributes, since both the
    /// attribute count and the id/class/style positions are 16 bits wide.
    TooManyAttributes(usize),
    /// A string is too long to be described by the string pool's length
    /// prefix. For UTF-8 pools that is `0x7FFF` bytes.
    StringPoolStringTooLong(String),
    /// Something went wrong while serialising or deserialising one of the
    /// binary XML structs. See [DekuError].
    ByteSerialisationFailed(DekuError),
    /// The binary XML parser rejected a byte stream, for example because of a
    /// chunk type it does not understand or an index out of range.
    BinaryXmlParsingFailed(String),
    /// Rendering a parsed attribute set as textual XML failed.
    XmlWritingFailed(Rc<xml::writer::Error>)
}

/// Result type where the error is always [AttrSetError].
pub type Result<T> = std::result::Result<T, AttrSetError>;

impl fmt::Display for AttrSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrSetError::ReferenceParsingFailed(text) => {
                write!(f, "malformed resource reference: {text}")
            }
            AttrSetError::UnresolvedSymbolicReference(text) => {
                write!(f, "couldn't resolve {text}")
            }
            AttrSetError::UnresolvedFormat { attribute, value } => {
                write!(f, "no declared format of {attribute} accepts \"{value}\"")
            }
            AttrSetError::UnknownAttributeId(id) => write!(f, "unknown attribute 0x{id:08x}"),
            AttrSetError::BufferCapacityExceeded { capacity, required } => write!(
                f,
                "output needs {required} bytes but the buffer is capped at {capacity}"
            ),
            AttrSetError::ChunkNestingMismatch => write!(f, "chunks closed out of order"),
            AttrSetError::AttributeSetAlreadyBuilt => write!(f, "attribute set already built"),
            AttrSetError::TooManyAttributes(count) => {
                write!(f, "{count} attributes don't fit in one element")
            }
            AttrSetError::StringPoolStringTooLong(text) => {
                write!(f, "string too long for string pool ({} bytes)", text.len())
            }
            AttrSetError::ByteSerialisationFailed(e) => write!(f, "{e}"),
            AttrSetError::BinaryXmlParsingFailed(reason) => {
                write!(f, "invalid binary XML: {reason}")
            }
            AttrSetError::XmlWritingFailed(e) => write!(f, "{e}")
        }
    }
}

impl std::error::Error for AttrSetError {}

// Automatic conversion from other types of error to AttrSetError makes the rest of the code cleaner
impl From<DekuError> for AttrSetError {
    fn from(value: DekuError) -> Self {
        AttrSetError::ByteSerialisationFailed(value)
    }
}

impl From<xml::writer::Error> for AttrSetError {
    fn from(value: xml::writer::Error) -> Self {
        AttrSetError::XmlWritingFailed(value.into())
    }
}
