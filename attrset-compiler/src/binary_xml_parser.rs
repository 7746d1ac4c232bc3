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

// Reads back the single-element documents produced by AttributeSetAssembler
// and answers the questions Android's XmlResourceParser answers about the
// attributes of the current element.
use attrset_common::*;
use byteorder::{ByteOrder, LittleEndian};
use deku::DekuContainerRead;

use crate::{resource_external_types::*, typed_value::complex_to_float};

/// Turns the bytes of a compiled attribute set into something queryable.
pub trait AttributeSetParser {
    type Handle;

    fn parse(&self, bytes: &[u8]) -> Result<Self::Handle>;
}

/// Parser for binary XML holding a single element, see [ParsedAttributeSet].
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryXmlParser;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub name_index: u32,
    /// Resource id of the attribute name, 0 if it has none.
    pub name_resource_id: u32,
    pub raw_value: Option<String>,
    pub typed_value: ResValue
}

/// The attributes of a parsed element, with the string pool and resource map
/// they were decoded against.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAttributeSet {
    element_namespace: Option<String>,
    element_name: String,
    strings: Vec<String>,
    resource_map: Vec<u32>,
    attributes: Vec<ParsedAttribute>,
    // 1-based, 0 if absent
    id_index: u16,
    class_index: u16,
    style_index: u16
}

fn parsing_failed(reason: impl Into<String>) -> AttrSetError {
    AttrSetError::BinaryXmlParsingFailed(reason.into())
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16> {
    bytes
        .get(offset..offset + 2)
        .map(LittleEndian::read_u16)
        .ok_or_else(|| parsing_failed(format!("unexpected end of data at {offset}")))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(LittleEndian::read_u32)
        .ok_or_else(|| parsing_failed(format!("unexpected end of data at {offset}")))
}

fn read_struct<'a, T: DekuContainerRead<'a>>(bytes: &'a [u8], offset: usize) -> Result<T> {
    let data = bytes
        .get(offset..)
        .ok_or_else(|| parsing_failed(format!("unexpected end of data at {offset}")))?;
    let (_, value) = T::from_bytes((data, 0))?;
    Ok(value)
}

impl AttributeSetParser for BinaryXmlParser {
    type Handle = ParsedAttributeSet;

    fn parse(&self, bytes: &[u8]) -> Result<ParsedAttributeSet> {
        let header: ResChunkHeader = read_struct(bytes, 0)
            .map_err(|_| parsing_failed("missing XmlFile header"))?;
        if header.chunk_type != ChunkType::XmlFile {
            return Err(parsing_failed(format!(
                "expected an XmlFile chunk, found {:?}",
                header.chunk_type
            )));
        }
        let document_end = header.chunk_size as usize;
        if document_end > bytes.len() {
            return Err(parsing_failed("XmlFile chunk is truncated"));
        }

        let mut strings: Option<Vec<String>> = None;
        let mut resource_map = vec![];
        let mut element: Option<(XmlAttributeExtension, Vec<XmlAttribute>)> = None;
        let mut offset = header.header_size as usize;
        while offset < document_end {
            let chunk: ResChunkHeader = read_struct(bytes, offset)
                .map_err(|_| parsing_failed(format!("unsupported chunk at {offset}")))?;
            let chunk_end = offset + chunk.chunk_size as usize;
            if (chunk.chunk_size as usize) < RES_CHUNK_HEADER_SIZE as usize
                || chunk_end > document_end
            {
                return Err(parsing_failed(format!("bad chunk size at {offset}")));
            }
            let chunk_bytes = &bytes[offset..chunk_end];

            match chunk.chunk_type {
                ChunkType::StringPool => strings = Some(parse_string_pool(chunk_bytes)?),
                ChunkType::XmlResourceMap => {
                    resource_map = (chunk.header_size as usize..chunk_bytes.len())
                        .step_by(4)
                        .map(|entry| read_u32(chunk_bytes, entry))
                        .collect::<Result<Vec<u32>>>()?;
                }
                ChunkType::XmlStartElement if element.is_none() => {
                    element = Some(parse_start_element(chunk_bytes, chunk.header_size)?);
                }
                // Only namespace declarations may surround the element
                ChunkType::XmlEndElement
                | ChunkType::XmlStartNamespace
                | ChunkType::XmlEndNamespace => {}
                other => {
                    return Err(parsing_failed(format!("unexpected {other:?} chunk at {offset}")))
                }
            }
            offset = chunk_end;
        }

        let strings = strings.ok_or_else(|| parsing_failed("missing StringPool chunk"))?;
        let (extension, raw_attributes) =
            element.ok_or_else(|| parsing_failed("missing XmlStartElement chunk"))?;

        let lookup = |index: ResStringPoolRef| -> Result<Option<String>> {
            if index == UINT32_MINUS_ONE {
                return Ok(None);
            }
            strings
                .get(index as usize)
                .cloned()
                .map(Some)
                .ok_or_else(|| parsing_failed(format!("string index {index} out of range")))
        };

        let mut attributes = vec![];
        for attribute in raw_attributes {
            attributes.push(ParsedAttribute {
                namespace: lookup(attribute.namespace)?,
                name: lookup(attribute.name)?
                    .ok_or_else(|| parsing_failed("attribute without a name"))?,
                name_index: attribute.name,
                name_resource_id: resource_map
                    .get(attribute.name as usize)
                    .copied()
                    .unwrap_or(0),
                raw_value: lookup(attribute.raw_value)?,
                typed_value: attribute.typed_value
            });
        }

        let element_namespace = lookup(extension.namespace)?;
        let element_name = lookup(extension.name)?
            .ok_or_else(|| parsing_failed("element without a name"))?;
        Ok(ParsedAttributeSet {
            element_namespace,
            element_name,
            strings,
            resource_map,
            attributes,
            id_index: extension.id_index,
            class_index: extension.class_index,
            style_index: extension.style_index
        })
    }
}

fn parse_start_element(
    chunk_bytes: &[u8],
    header_size: u16
) -> Result<(XmlAttributeExtension, Vec<XmlAttribute>)> {
    let extension_start = header_size as usize;
    let extension: XmlAttributeExtension = read_struct(chunk_bytes, extension_start)?;
    let mut attributes = vec![];
    for i in 0..extension.attribute_count as usize {
        let attribute_offset = extension_start
            + extension.attribute_start as usize
            + i * extension.attribute_size as usize;
        attributes.push(read_struct(chunk_bytes, attribute_offset)?);
    }
    Ok((extension, attributes))
}

fn parse_string_pool(chunk_bytes: &[u8]) -> Result<Vec<String>> {
    let pool_header: StringPoolHeader = read_struct(chunk_bytes, RES_CHUNK_HEADER_SIZE as usize)?;
    let header_size = read_u16(chunk_bytes, 2)? as usize;
    let utf8 = pool_header.flags & STRING_POOL_UTF8_FLAG != 0;

    let mut strings = vec![];
    for i in 0..pool_header.string_count as usize {
        let string_offset = read_u32(chunk_bytes, header_size + i * 4)? as usize;
        let start = pool_header.strings_start as usize + string_offset;
        strings.push(if utf8 {
            decode_utf8_string(chunk_bytes, start)?
        } else {
            decode_utf16_string(chunk_bytes, start)?
        });
    }
    Ok(strings)
}

// Returns the length and how many bytes it took up
fn decode_utf8_length(bytes: &[u8], offset: usize) -> Result<(usize, usize)> {
    let first = *bytes
        .get(offset)
        .ok_or_else(|| parsing_failed("string length out of range"))? as usize;
    if first & 0x80 == 0 {
        return Ok((first, 1));
    }
    let second = *bytes
        .get(offset + 1)
        .ok_or_else(|| parsing_failed("string length out of range"))? as usize;
    Ok((((first & 0x7F) << 8) | second, 2))
}

fn decode_utf8_string(bytes: &[u8], offset: usize) -> Result<String> {
    // The character count comes first, we only need the byte count
    let (_, char_count_size) = decode_utf8_length(bytes, offset)?;
    let (byte_count, byte_count_size) = decode_utf8_length(bytes, offset + char_count_size)?;
    let start = offset + char_count_size + byte_count_size;
    let data = bytes
        .get(start..start + byte_count)
        .ok_or_else(|| parsing_failed("string data out of range"))?;
    String::from_utf8(data.to_vec()).map_err(|e| parsing_failed(e.to_string()))
}

fn decode_utf16_string(bytes: &[u8], offset: usize) -> Result<String> {
    let first = read_u16(bytes, offset)? as usize;
    let (length, start) = if first & 0x8000 == 0 {
        (first, offset + 2)
    } else {
        let second = read_u16(bytes, offset + 2)? as usize;
        (((first & 0x7FFF) << 16) | second, offset + 4)
    };
    let units = (0..length)
        .map(|i| read_u16(bytes, start + i * 2))
        .collect::<Result<Vec<u16>>>()?;
    String::from_utf16(&units).map_err(|e| parsing_failed(e.to_string()))
}

impl ParsedAttributeSet {
    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn element_namespace(&self) -> Option<&str> {
        self.element_namespace.as_deref()
    }

    pub fn attributes(&self) -> &[ParsedAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, index: usize) -> Option<&ParsedAttribute> {
        self.attributes.get(index)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Every string in the document's pool, in pool order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// The resource id map, indexed by string pool index. Empty if the
    /// document had none.
    pub fn resource_map(&self) -> &[u32] {
        &self.resource_map
    }

    /// Position of the attribute with this namespace and name.
    pub fn index_of(&self, namespace: Option<&str>, name: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.namespace.as_deref() == namespace && a.name == name)
    }

    /// Position of the attribute whose name maps to resource id `id`.
    pub fn index_of_resource(&self, id: u32) -> Option<usize> {
        self.attributes
            .iter()
            .position(|a| a.name_resource_id != 0 && a.name_resource_id == id)
    }

    pub fn attribute_name(&self, index: usize) -> Option<&str> {
        self.attribute(index).map(|a| a.name.as_str())
    }

    pub fn attribute_namespace(&self, index: usize) -> Option<&str> {
        self.attribute(index).and_then(|a| a.namespace.as_deref())
    }

    /// Resource id of the attribute's name, 0 when it has none.
    pub fn attribute_name_resource(&self, index: usize) -> u32 {
        self.attribute(index).map_or(0, |a| a.name_resource_id)
    }

    pub fn attribute_value(&self, index: usize) -> Option<&str> {
        self.attribute(index).and_then(|a| a.raw_value.as_deref())
    }

    pub fn attribute_data_type(&self, index: usize) -> Option<AttributeDataType> {
        self.attribute(index).map(|a| a.typed_value.data_type)
    }

    pub fn attribute_data(&self, index: usize) -> Option<u32> {
        self.attribute(index).map(|a| a.typed_value.data)
    }

    fn integer_data(&self, index: usize) -> Option<u32> {
        self.attribute(index)
            .filter(|a| a.typed_value.data_type.is_integer())
            .map(|a| a.typed_value.data)
    }

    pub fn attribute_boolean_value(&self, index: usize, default: bool) -> bool {
        self.integer_data(index).map_or(default, |data| data != 0)
    }

    pub fn attribute_int_value(&self, index: usize, default: i32) -> i32 {
        self.integer_data(index).map_or(default, |data| data as i32)
    }

    pub fn attribute_float_value(&self, index: usize, default: f32) -> f32 {
        match self.attribute(index).map(|a| &a.typed_value) {
            Some(value) if value.data_type == AttributeDataType::Float => {
                f32::from_bits(value.data)
            }
            _ => default
        }
    }

    /// Dimensions and fractions decoded to a plain number, without applying
    /// any display metrics.
    pub fn attribute_complex_value(&self, index: usize) -> Option<f32> {
        self.attribute(index)
            .filter(|a| {
                matches!(
                    a.typed_value.data_type,
                    AttributeDataType::Dimension | AttributeDataType::Fraction
                )
            })
            .map(|a| complex_to_float(a.typed_value.data))
    }

    /// The referenced resource id if the value is a reference.
    pub fn attribute_resource_value(&self, index: usize, default: u32) -> u32 {
        match self.attribute(index).map(|a| &a.typed_value) {
            Some(value) if value.data_type == AttributeDataType::Reference => value.data,
            _ => default
        }
    }

    // Converts the 1-based index from the element header
    fn special_attribute(&self, one_based: u16) -> Option<&ParsedAttribute> {
        one_based
            .checked_sub(1)
            .and_then(|index| self.attribute(index as usize))
    }

    /// Raw value of the `id` attribute.
    pub fn id_attribute(&self) -> Option<&str> {
        self.special_attribute(self.id_index)
            .and_then(|a| a.raw_value.as_deref())
    }

    /// Raw value of the `class` attribute.
    pub fn class_attribute(&self) -> Option<&str> {
        self.special_attribute(self.class_index)
            .and_then(|a| a.raw_value.as_deref())
    }

    /// Resource id referenced by the `style` attribute, 0 if there is none.
    pub fn style_attribute(&self) -> u32 {
        match self.special_attribute(self.style_index) {
            Some(a) if a.typed_value.data_type == AttributeDataType::Reference => {
                a.typed_value.data
            }
            _ => 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chunk_writer::{ChunkWriter, SpecialAttributeIndices},
        string_pool::{StringPoolBuilder, StringPoolEncoding}
    };
    use pretty_assertions::assert_eq;

    fn document(encoding: StringPoolEncoding, with_map: bool) -> Vec<u8> {
        let mut pool = StringPoolBuilder::new(encoding);
        let element = pool.intern_shared("view");
        let name = pool.intern_unique("layout_width");
        let namespace = pool.intern_shared("http://schemas.android.com/apk/res/android");
        let raw = pool.intern_shared("ünïcode");

        let mut writer = ChunkWriter::new();
        let file = writer.begin_chunk(ChunkType::XmlFile, 8).unwrap();
        pool.write_chunk(&mut writer).unwrap();
        if with_map {
            writer
                .write_resource_map(&[(name, 0x0101_00F4)].into_iter().collect(), name)
                .unwrap();
        }
        let attribute = XmlAttribute {
            namespace,
            name,
            raw_value: raw,
            typed_value: ResValue::new(AttributeDataType::Dimension, 0x1001)
        };
        writer
            .write_element_start(
                UINT32_MINUS_ONE,
                element,
                &[attribute],
                SpecialAttributeIndices::default()
            )
            .unwrap();
        writer.write_element_end(UINT32_MINUS_ONE, element).unwrap();
        writer.end_chunk(file).unwrap();
        writer.into_bytes()
    }

    #[test]
    fn reads_both_string_encodings() {
        for encoding in [StringPoolEncoding::Utf8, StringPoolEncoding::Utf16] {
            let parsed = BinaryXmlParser.parse(&document(encoding, true)).unwrap();
            assert_eq!(parsed.element_name(), "view");
            assert_eq!(parsed.element_namespace(), None);
            assert_eq!(parsed.attribute_count(), 1);
            assert_eq!(parsed.attribute_name(0), Some("layout_width"));
            assert_eq!(parsed.attribute_value(0), Some("ünïcode"));
            assert_eq!(parsed.attribute_name_resource(0), 0x0101_00F4);
            assert_eq!(parsed.attribute_complex_value(0), Some(16.0));
            assert_eq!(parsed.index_of_resource(0x0101_00F4), Some(0));
        }
    }

    #[test]
    fn missing_resource_map_means_no_ids() {
        let parsed = BinaryXmlParser
            .parse(&document(StringPoolEncoding::Utf8, false))
            .unwrap();
        assert_eq!(parsed.attribute_name_resource(0), 0);
        assert_eq!(parsed.index_of_resource(0x0101_00F4), None);
        assert_eq!(
            parsed.index_of(Some("http://schemas.android.com/apk/res/android"), "layout_width"),
            Some(0)
        );
    }

    #[test]
    fn typed_accessors_check_the_type() {
        let parsed = BinaryXmlParser
            .parse(&document(StringPoolEncoding::Utf8, true))
            .unwrap();
        assert!(parsed.attribute_boolean_value(0, true));
        assert_eq!(parsed.attribute_int_value(0, -1), -1);
        assert_eq!(parsed.attribute_float_value(0, 2.0), 2.0);
        assert_eq!(parsed.attribute_resource_value(0, 7), 7);
        assert!(!parsed.attribute_boolean_value(3, false));
    }

    #[test]
    fn rejects_other_documents() {
        assert!(BinaryXmlParser.parse(&[]).is_err());

        let pool_only = StringPoolBuilder::default().serialize().unwrap();
        assert!(matches!(
            BinaryXmlParser.parse(&pool_only),
            Err(AttrSetError::BinaryXmlParsingFailed(_))
        ));

        let mut truncated = document(StringPoolEncoding::Utf8, true);
        truncated.truncate(truncated.len() - 4);
        assert!(BinaryXmlParser.parse(&truncated).is_err());
    }

    #[test]
    fn rejects_unknown_chunk_types() {
        let mut bytes = document(StringPoolEncoding::Utf8, false);
        // The string pool starts right after the XmlFile header
        bytes[8] = 0x02;
        assert!(matches!(
            BinaryXmlParser.parse(&bytes),
            Err(AttrSetError::BinaryXmlParsingFailed(_))
        ));
    }
}
