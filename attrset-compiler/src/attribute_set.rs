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

use std::collections::BTreeMap;

use attrset_common::*;
use log::debug;

use crate::{
    chunk_writer::{ChunkWriter, SpecialAttributeIndices},
    resource_external_types::*,
    resource_table::ResourceTable,
    string_pool::{StringPoolBuilder, StringPoolEncoding},
    value_resolver::ValueResolver
};

pub const ANDROID_NAMESPACE: &str = "http://schemas.android.com/apk/res/android";
pub const AUTO_NAMESPACE: &str = "http://schemas.android.com/apk/res-auto";
// The attributes hang off a single element which nobody ever looks at
pub const ELEMENT_NAME: &str = "dummy";

/// Identifies one attribute of the set.
///
/// The derived ordering is the emission order: real attributes by ascending
/// resource id, followed by `style`, `class` and `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeKey {
    Resource(u32),
    Style,
    Class,
    Id
}

/// Knobs for [AttributeSetAssembler::build].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub string_encoding: StringPoolEncoding,
    /// Fail with `BufferCapacityExceeded` instead of growing the output
    /// beyond this many bytes. `None` lets the buffer grow freely.
    pub capacity_limit: Option<usize>
}

/// Collects attribute assignments and compiles them into a binary XML
/// document holding one element that carries every attribute.
pub struct AttributeSetAssembler<'t, T: ResourceTable + ?Sized> {
    table: &'t T,
    options: BuildOptions,
    assignments: BTreeMap<AttributeKey, Option<String>>,
    built: bool
}

impl<'t, T: ResourceTable + ?Sized> AttributeSetAssembler<'t, T> {
    pub fn new(table: &'t T) -> Self {
        AttributeSetAssembler::with_options(table, BuildOptions::default())
    }

    pub fn with_options(table: &'t T, options: BuildOptions) -> Self {
        AttributeSetAssembler {
            table,
            options,
            assignments: BTreeMap::new(),
            built: false
        }
    }

    /// Sets the attribute with resource id `id`. `None` stands for a null value.
    pub fn add_attribute<'v>(&mut self, id: u32, value: impl Into<Option<&'v str>>) -> &mut Self {
        self.assign(AttributeKey::Resource(id), value.into())
    }

    pub fn set_style_attribute<'v>(&mut self, value: impl Into<Option<&'v str>>) -> &mut Self {
        self.assign(AttributeKey::Style, value.into())
    }

    pub fn set_class_attribute<'v>(&mut self, value: impl Into<Option<&'v str>>) -> &mut Self {
        self.assign(AttributeKey::Class, value.into())
    }

    pub fn set_id_attribute<'v>(&mut self, value: impl Into<Option<&'v str>>) -> &mut Self {
        self.assign(AttributeKey::Id, value.into())
    }

    // Last write wins
    fn assign(&mut self, key: AttributeKey, value: Option<&str>) -> &mut Self {
        self.assignments.insert(key, value.map(str::to_string));
        self
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Compiles the attributes into a complete XmlFile chunk.
    ///
    /// Can only be called once, later calls fail with `AttributeSetAlreadyBuilt`.
    pub fn build(&mut self) -> Result<Vec<u8>> {
        if self.built {
            return Err(AttrSetError::AttributeSetAlreadyBuilt);
        }
        self.built = true;
        debug!("Building attribute set with {} attributes", self.assignments.len());
        if u16::try_from(self.assignments.len()).is_err() {
            return Err(AttrSetError::TooManyAttributes(self.assignments.len()));
        }

        let resolver = ValueResolver::new(self.table);
        let mut pool = StringPoolBuilder::new(self.options.string_encoding);
        let element_name = pool.intern_shared(ELEMENT_NAME);

        let mut attributes: Vec<XmlAttribute> = vec![];
        let mut resource_ids: BTreeMap<u32, u32> = BTreeMap::new();
        let mut max_name_index = 0;
        let mut special_indices = SpecialAttributeIndices::default();
        for (position, (key, value)) in self.assignments.iter().enumerate() {
            let (namespace, name) = self.attribute_name(*key)?;
            let qualified_name = match (key, namespace) {
                (AttributeKey::Resource(_), Some(ANDROID_NAMESPACE)) => format!("android:{name}"),
                (AttributeKey::Resource(_), _) => format!("app:{name}"),
                _ => name.clone()
            };
            let resolved = resolver.resolve(*key, &qualified_name, value.as_deref(), &mut pool)?;

            // Each name gets its own slot so that it can line up with the resource map
            let name_index = pool.intern_unique(&name);
            let namespace_index = pool.intern_optional(namespace);
            let raw_value_index = pool.intern_optional(resolved.raw_value.as_deref());
            max_name_index = max_name_index.max(name_index);

            // This is 1-based
            let attribute_number = u16::try_from(position + 1)
                .map_err(|_| AttrSetError::TooManyAttributes(self.assignments.len()))?;
            match key {
                AttributeKey::Resource(id) => {
                    resource_ids.insert(name_index, *id);
                }
                AttributeKey::Style => special_indices.style = attribute_number,
                AttributeKey::Class => special_indices.class = attribute_number,
                AttributeKey::Id => special_indices.id = attribute_number
            }

            attributes.push(XmlAttribute {
                namespace: namespace_index,
                name: name_index,
                raw_value: raw_value_index,
                typed_value: ResValue::new(resolved.data_type, resolved.data)
            });
        }

        let mut writer = match self.options.capacity_limit {
            Some(capacity) => ChunkWriter::with_capacity_limit(capacity),
            None => ChunkWriter::new()
        };
        let file_chunk = writer.begin_chunk(ChunkType::XmlFile, RES_CHUNK_HEADER_SIZE)?;
        pool.write_chunk(&mut writer)?;
        writer.write_resource_map(&resource_ids, max_name_index)?;
        writer.write_element_start(UINT32_MINUS_ONE, element_name, &attributes, special_indices)?;
        writer.write_element_end(UINT32_MINUS_ONE, element_name)?;
        writer.end_chunk(file_chunk)?;

        debug!(
            "Built attribute set: {} strings, {} resource ids, {} bytes",
            pool.len(),
            resource_ids.len(),
            writer.len()
        );
        Ok(writer.into_bytes())
    }

    // Namespace URI and local name of the attribute
    fn attribute_name(&self, key: AttributeKey) -> Result<(Option<&'static str>, String)> {
        match key {
            AttributeKey::Resource(id) => {
                let name = self
                    .table
                    .resource_name(id)
                    .ok_or(AttrSetError::UnknownAttributeId(id))?;
                let namespace = if name.is_android() {
                    ANDROID_NAMESPACE
                } else {
                    AUTO_NAMESPACE
                };
                Ok((Some(namespace), name.name))
            }
            AttributeKey::Style => Ok((None, "style".into())),
            AttributeKey::Class => Ok((None, "class".into())),
            AttributeKey::Id => Ok((None, "id".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute_formats::{AttributeDefinition, AttributeFormats},
        binary_xml_parser::{AttributeSetParser, BinaryXmlParser},
        resource_table::InMemoryResourceTable
    };
    use pretty_assertions::assert_eq;

    const ORIENTATION: u32 = 0x0101_00C4;
    const TEXT: u32 = 0x7F01_0001;
    const ENABLED: u32 = 0x7F01_0002;

    fn table() -> InMemoryResourceTable {
        let mut table = InMemoryResourceTable::new("com.example");
        table.add_attribute(
            ORIENTATION,
            "android",
            "orientation",
            AttributeDefinition::new(AttributeFormats::ENUM)
                .with_symbol("horizontal", 0)
                .with_symbol("vertical", 1)
        );
        table.add_attribute(
            TEXT,
            "com.example",
            "text",
            AttributeDefinition::new(AttributeFormats::STRING)
        );
        table.add_attribute(
            ENABLED,
            "com.example",
            "enabled",
            AttributeDefinition::new(AttributeFormats::BOOLEAN)
        );
        table.add_resource(0x7F03_0000, "com.example", "style", "Fancy");
        table
    }

    #[test]
    fn attributes_are_emitted_in_key_order() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler
            .set_id_attribute("main")
            .add_attribute(TEXT, "hello")
            .set_style_attribute("@style/Fancy")
            .add_attribute(ORIENTATION, "vertical");
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();

        let names: Vec<&str> = parsed.attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["orientation", "text", "style", "id"]);
        assert_eq!(parsed.attributes()[0].namespace.as_deref(), Some(ANDROID_NAMESPACE));
        assert_eq!(parsed.attributes()[1].namespace.as_deref(), Some(AUTO_NAMESPACE));
        assert_eq!(parsed.attributes()[2].namespace, None);
        assert_eq!(parsed.style_attribute(), 0x7F03_0000);
        assert_eq!(parsed.id_attribute(), Some("main"));
        assert_eq!(parsed.class_attribute(), None);
    }

    #[test]
    fn later_assignments_overwrite_earlier_ones() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler
            .add_attribute(TEXT, "first")
            .add_attribute(TEXT, "second");
        assert_eq!(assembler.len(), 1);
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();
        assert_eq!(parsed.attribute_count(), 1);
        assert_eq!(parsed.attribute_value(0), Some("second"));
    }

    #[test]
    fn resource_map_covers_every_name_index() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler
            .add_attribute(ORIENTATION, "horizontal")
            .add_attribute(TEXT, "hi")
            .set_class_attribute("com.example.Widget");
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();

        let max_name_index = parsed
            .attributes()
            .iter()
            .map(|attribute| attribute.name_index)
            .max()
            .unwrap();
        assert_eq!(parsed.resource_map().len(), max_name_index as usize + 1);
        for (index, id) in parsed.resource_map().iter().enumerate() {
            let owner = parsed
                .attributes()
                .iter()
                .find(|attribute| attribute.name_index as usize == index);
            match owner.map(|attribute| attribute.name.as_str()) {
                Some("orientation") => assert_eq!(*id, ORIENTATION),
                Some("text") => assert_eq!(*id, TEXT),
                _ => assert_eq!(*id, 0)
            }
        }
        assert_eq!(parsed.attribute_name_resource(2), 0);
    }

    #[test]
    fn resource_map_is_omitted_without_real_attributes() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler.set_class_attribute("com.example.Widget");
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();
        assert!(parsed.resource_map().is_empty());
        assert_eq!(parsed.class_attribute(), Some("com.example.Widget"));
    }

    #[test]
    fn attribute_names_get_unique_indices() {
        let mut table = table();
        table.add_attribute(
            0x7F01_0010,
            "com.example",
            "dummy",
            AttributeDefinition::new(AttributeFormats::STRING)
        );
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler
            .add_attribute(0x7F01_0010, "dummy")
            .add_attribute(TEXT, "dummy");
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();

        // Sorted after "text", which has the lower resource id
        let name_index = parsed.attributes()[1].name_index;
        assert_eq!(parsed.attributes()[1].name, "dummy");
        let element_index = parsed
            .strings()
            .iter()
            .position(|s| s == ELEMENT_NAME)
            .unwrap() as u32;
        // The value is shared with the element name, the attribute name isn't
        assert_ne!(name_index, element_index);
        assert_eq!(parsed.attributes()[0].typed_value.data, element_index);
        assert_eq!(parsed.attributes()[1].typed_value.data, element_index);
    }

    #[test]
    fn build_can_only_run_once() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler.add_attribute(ENABLED, "true");
        assert!(assembler.build().is_ok());
        assert!(matches!(
            assembler.build(),
            Err(AttrSetError::AttributeSetAlreadyBuilt)
        ));
    }

    #[test]
    fn failures_abort_the_build() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler.add_attribute(ENABLED, "maybe");
        assert!(matches!(
            assembler.build(),
            Err(AttrSetError::UnresolvedFormat { attribute, value })
                if attribute == "app:enabled" && value == "maybe"
        ));

        let mut assembler = AttributeSetAssembler::new(&table);
        assembler.add_attribute(0x7F01_00FF, "x");
        assert!(matches!(
            assembler.build(),
            Err(AttrSetError::UnknownAttributeId(0x7F01_00FF))
        ));
    }

    #[test]
    fn capacity_limit_applies_to_the_whole_document() {
        let table = table();
        let options = BuildOptions {
            capacity_limit: Some(64),
            ..Default::default()
        };
        let mut assembler = AttributeSetAssembler::with_options(&table, options);
        assembler.add_attribute(TEXT, "a string that will not fit");
        assert!(matches!(
            assembler.build(),
            Err(AttrSetError::BufferCapacityExceeded { capacity: 64, .. })
        ));
    }

    #[test]
    fn attribute_count_must_fit_in_16_bits() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        for id in 0..=u32::from(u16::MAX) {
            assembler.add_attribute(0x7F10_0000 + id, "1");
        }
        assert_eq!(assembler.len(), 65_536);
        assert!(matches!(
            assembler.build(),
            Err(AttrSetError::TooManyAttributes(65_536))
        ));
    }

    #[test]
    fn huge_capacity_limits_are_only_a_ceiling() {
        let table = table();
        let options = BuildOptions {
            capacity_limit: Some(usize::MAX),
            ..Default::default()
        };
        let mut assembler = AttributeSetAssembler::with_options(&table, options);
        assembler.set_class_attribute("com.example.Widget");
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();
        assert_eq!(parsed.class_attribute(), Some("com.example.Widget"));
    }

    #[test]
    fn outer_chunk_wraps_everything() {
        let table = table();
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler.add_attribute(TEXT, "hello");
        let bytes = assembler.build().unwrap();
        assert_eq!(&bytes[0..4], &[0x03, 0x00, 0x08, 0x00]);
        assert_eq!(
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize,
            bytes.len()
        );
        // The string pool comes first
        assert_eq!(&bytes[8..10], &[0x01, 0x00]);
    }
}
