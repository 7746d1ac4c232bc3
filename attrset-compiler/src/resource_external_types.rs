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

// Types that Android itself uses to describe compiled XML
use deku::prelude::*;

pub const RES_CHUNK_HEADER_SIZE: u16 = 8;
// ResChunkHeader followed by XmlNodeHeader
pub const XML_NODE_HEADER_SIZE: u16 = 16;
pub const STRING_POOL_HEADER_SIZE: u16 = 0x1C;
// Size of XmlAttributeExtension, which is also where the attributes start
pub const XML_ATTRIBUTE_EXTENSION_SIZE: u16 = 0x14;
pub const XML_ATTRIBUTE_SIZE: u16 = 0x14;
pub const RES_VALUE_SIZE: u16 = 8;

pub const UINT32_MINUS_ONE: u32 = 0xFFFFFFFF;
// Either a string index or UINT32_MINUS_ONE if empty
pub type ResStringPoolRef = u32;

pub const STRING_POOL_UTF8_FLAG: u32 = 1 << 8;

#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct ResChunkHeader {
    pub chunk_type: ChunkType,
    pub header_size: u16,
    // Includes both this header and the data that follows
    pub chunk_size: u32
}

#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct XmlNodeHeader {
    // Where this node appeared in the original document
    // There is no document here, so this is always 1
    pub line_number: u32,
    // The XML comment that originally appeared above this node
    pub comment: ResStringPoolRef
}

// Follows the XmlNodeHeader of a start element chunk
#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct XmlAttributeExtension {
    pub namespace: ResStringPoolRef,
    pub name: ResStringPoolRef,
    // Offset from the start of this struct to the first attribute
    pub attribute_start: u16,
    pub attribute_size: u16,
    pub attribute_count: u16,
    // Index (1-based) of the "id" attribute, 0 if none
    pub id_index: u16,
    // Index (1-based) of the "class" attribute, 0 if none
    pub class_index: u16,
    // Index (1-based) of the "style" attribute, 0 if none
    pub style_index: u16
}

#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct XmlEndElementExtension {
    pub namespace: ResStringPoolRef,
    pub name: ResStringPoolRef
}

#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct XmlAttribute {
    pub namespace: ResStringPoolRef,
    pub name: ResStringPoolRef,
    pub raw_value: ResStringPoolRef,
    pub typed_value: ResValue
}

#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct ResValue {
    pub size: u16,
    // Always 0
    pub res0: u8,
    pub data_type: AttributeDataType,
    pub data: u32
}

impl ResValue {
    pub fn new(data_type: AttributeDataType, data: u32) -> Self {
        ResValue {
            size: RES_VALUE_SIZE,
            res0: 0,
            data_type,
            data
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, DekuRead, DekuWrite)]
#[deku(id_type = "u8")]
pub enum AttributeDataType {
    // Either @null (data 0) or @empty (data 1)
    #[deku(id = 0x00)]
    Null,
    #[deku(id = 0x01)]
    Reference,
    // ?attr references, we never emit these but a parser may see them
    #[deku(id = 0x02)]
    Attribute,
    #[deku(id = 0x03)]
    String,
    #[deku(id = 0x04)]
    Float,
    #[deku(id = 0x05)]
    Dimension,
    #[deku(id = 0x06)]
    Fraction,
    #[deku(id = 0x10)]
    DecimalInteger,
    #[deku(id = 0x11)]
    HexInteger,
    #[deku(id = 0x12)]
    BooleanInteger,
    #[deku(id = 0x1C)]
    ColorArgb8,
    #[deku(id = 0x1D)]
    ColorRgb8,
    #[deku(id = 0x1E)]
    ColorArgb4,
    #[deku(id = 0x1F)]
    ColorRgb4
}

impl AttributeDataType {
    /// True for the decimal, hex, boolean and color types, which Android
    /// groups together as "integer" values.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            AttributeDataType::DecimalInteger
                | AttributeDataType::HexInteger
                | AttributeDataType::BooleanInteger
                | AttributeDataType::ColorArgb8
                | AttributeDataType::ColorRgb8
                | AttributeDataType::ColorArgb4
                | AttributeDataType::ColorRgb4
        )
    }
}

#[derive(Debug, PartialEq, Clone, DekuRead, DekuWrite)]
pub struct StringPoolHeader {
    pub string_count: u32,
    pub style_count: u32,
    pub flags: u32,
    pub strings_start: u32,
    pub styles_start: u32
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, DekuRead, DekuWrite)]
#[deku(id_type = "u16")]
pub enum ChunkType {
    #[deku(id = 0x0000)]
    Null,
    #[deku(id = 0x0001)]
    StringPool,
    #[deku(id = 0x0003)]
    XmlFile,

    // Types within an XmlFile
    #[deku(id = 0x0100)]
    XmlStartNamespace,
    #[deku(id = 0x0101)]
    XmlEndNamespace,
    #[deku(id = 0x0102)]
    XmlStartElement,
    #[deku(id = 0x0103)]
    XmlEndElement,
    #[deku(id = 0x180)]
    XmlResourceMap
}
