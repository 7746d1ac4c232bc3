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

//! # Attribute Set API
//!
//! This crate exposes the public API through which other projects can build
//! Android `AttributeSet`s without writing or compiling a layout file.
//!
//! ## Building an attribute set
//!
//! Attributes are given as resource ids and literal text, exactly as they
//! would be written in XML. Each value is typed according to the attribute's
//! declared formats, then the whole set is compiled to binary XML and handed
//! to a parser.
//!
//! ```
//! use attrset_api::*;
//!
//! let mut table = InMemoryResourceTable::new("com.example");
//! table.add_attribute(
//!     0x010100c4,
//!     "android",
//!     "orientation",
//!     AttributeDefinition::new(AttributeFormats::ENUM)
//!         .with_symbol("horizontal", 0)
//!         .with_symbol("vertical", 1)
//! );
//! table.add_resource(0x7f030000, "com.example", "style", "Fancy");
//!
//! let attributes = AttributeSetBuilder::new(&table)
//!     .add_attribute(0x010100c4, "vertical")
//!     .set_style_attribute("@style/Fancy")
//!     .build(&BinaryXmlParser)?;
//! assert_eq!(attributes.attribute_int_value(0, -1), 1);
//! assert_eq!(attributes.style_attribute(), 0x7f030000);
//! # Ok::<(), AttrSetError>(())
//! ```
//!
//! ## Getting the bytes
//!
//! If the attribute set is going to be parsed elsewhere, the compiled
//! document can be taken as-is.
//!
//! ```
//! # use attrset_api::*;
//! # let table = InMemoryResourceTable::new("com.example");
//! let bytes = AttributeSetBuilder::new(&table)
//!     .set_class_attribute("com.example.FancyView")
//!     .build_bytes()?;
//! # Ok::<(), AttrSetError>(())
//! ```

use attrset_compiler::attribute_set::AttributeSetAssembler;
use log::debug;

pub use attrset_common::{AttrSetError, Result};
pub use attrset_compiler::{
    attribute_formats::{AttributeDefinition, AttributeFormats},
    attribute_set::BuildOptions,
    binary_xml_parser::{AttributeSetParser, BinaryXmlParser, ParsedAttribute, ParsedAttributeSet},
    resource_external_types::AttributeDataType,
    resource_table::{InMemoryResourceTable, ResourceName, ResourceTable},
    string_pool::StringPoolEncoding
};

/// Collects attributes for a single element.
///
/// Every setter replaces any earlier value for the same attribute. Values
/// may be `None`, which produces a null attribute.
pub struct AttributeSetBuilder<'t, T: ResourceTable + ?Sized> {
    assembler: AttributeSetAssembler<'t, T>
}

impl<'t, T: ResourceTable + ?Sized> AttributeSetBuilder<'t, T> {
    /// A builder resolving names, references and attribute formats through `table`.
    pub fn new(table: &'t T) -> Self {
        AttributeSetBuilder::with_options(table, BuildOptions::default())
    }

    pub fn with_options(table: &'t T, options: BuildOptions) -> Self {
        AttributeSetBuilder {
            assembler: AttributeSetAssembler::with_options(table, options)
        }
    }

    /// Sets the attribute with resource id `id`, eg. `android:orientation`.
    pub fn add_attribute<'v>(mut self, id: u32, value: impl Into<Option<&'v str>>) -> Self {
        self.assembler.add_attribute(id, value);
        self
    }

    /// Sets the `style` attribute, usually a reference such as `@style/Fancy`.
    pub fn set_style_attribute<'v>(mut self, value: impl Into<Option<&'v str>>) -> Self {
        self.assembler.set_style_attribute(value);
        self
    }

    pub fn set_class_attribute<'v>(mut self, value: impl Into<Option<&'v str>>) -> Self {
        self.assembler.set_class_attribute(value);
        self
    }

    /// Sets the `id` attribute, usually `@+id/name` or `@id/name`.
    pub fn set_id_attribute<'v>(mut self, value: impl Into<Option<&'v str>>) -> Self {
        self.assembler.set_id_attribute(value);
        self
    }

    /// Compiles the attributes and returns the binary XML document.
    pub fn build_bytes(mut self) -> Result<Vec<u8>> {
        self.assembler.build()
    }

    /// Compiles the attributes and hands the document to `parser`, returning
    /// whatever queryable handle it produces.
    pub fn build<P: AttributeSetParser>(self, parser: &P) -> Result<P::Handle> {
        let bytes = self.build_bytes()?;
        debug!("Parsing {} byte attribute set", bytes.len());
        parser.parse(&bytes)
    }
}
