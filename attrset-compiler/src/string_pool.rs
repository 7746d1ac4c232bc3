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

use std::collections::HashMap;

use attrset_common::*;

use crate::{chunk_writer::ChunkWriter, resource_external_types::*};

/// How the characters of every string in a pool are stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StringPoolEncoding {
    /// Length-prefixed UTF-8, the format AAPT2 emits for XML files.
    #[default]
    Utf8,
    /// Length-prefixed UTF-16LE, the format's original encoding.
    Utf16
}

/// Accumulates the strings referenced by an attribute set and hands out
/// their indices.
///
/// Indices are assigned in interning order and never change. Strings interned
/// with [intern_shared](StringPoolBuilder::intern_shared) are deduplicated,
/// strings interned with [intern_unique](StringPoolBuilder::intern_unique)
/// always get a slot of their own.
#[derive(Debug, Default)]
pub struct StringPoolBuilder {
    encoding: StringPoolEncoding,
    strings: Vec<String>,
    shared_ids: HashMap<String, u32>
}

impl StringPoolBuilder {
    pub fn new(encoding: StringPoolEncoding) -> Self {
        StringPoolBuilder {
            encoding,
            strings: vec![],
            shared_ids: HashMap::new()
        }
    }

    // If the string already exists in the pool, return the existing ID
    // If not, add it to the pool and return the newly-created ID
    pub fn intern_shared(&mut self, text: &str) -> u32 {
        if let Some(id) = self.shared_ids.get(text) {
            return *id;
        }
        let new_id = self.push(text);
        self.shared_ids.insert(text.to_string(), new_id);
        new_id
    }

    /// Adds `text` to the pool without looking for an existing copy. Later
    /// shared interning of the same text will not return this index.
    pub fn intern_unique(&mut self, text: &str) -> u32 {
        self.push(text)
    }

    /// Interns `text` as shared, or returns [UINT32_MINUS_ONE] when there is
    /// no text at all.
    pub fn intern_optional(&mut self, text: Option<&str>) -> ResStringPoolRef {
        match text {
            Some(text) => self.intern_shared(text),
            None => UINT32_MINUS_ONE
        }
    }

    fn push(&mut self, text: &str) -> u32 {
        let new_id = self.strings.len() as u32;
        self.strings.push(text.to_string());
        new_id
    }

    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn encoding(&self) -> StringPoolEncoding {
        self.encoding
    }

    /// Serialises the pool as a standalone StringPool chunk.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut writer = ChunkWriter::new();
        self.write_chunk(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Appends the StringPool chunk for this pool to `writer`.
    pub fn write_chunk(&self, writer: &mut ChunkWriter) -> Result<()> {
        let mut string_indices: Vec<u32> = vec![];
        let mut string_data: Vec<u8> = vec![];
        for string in &self.strings {
            string_indices.push(string_data.len() as u32);
            match self.encoding {
                StringPoolEncoding::Utf8 => encode_utf8_string(string, &mut string_data)?,
                StringPoolEncoding::Utf16 => encode_utf16_string(string, &mut string_data)?
            }
        }

        // AAPT requires all chunks to fall on 32-bit boundaries, so pad the
        // string data out to an even 4 bytes.
        let padding = (4 - (string_data.len() % 4)) % 4;
        string_data.resize(string_data.len() + padding, 0);

        let string_indices_size_bytes = 4 * self.strings.len() as u32;
        let header = StringPoolHeader {
            string_count: self.strings.len() as u32,
            style_count: 0,
            flags: match self.encoding {
                StringPoolEncoding::Utf8 => STRING_POOL_UTF8_FLAG,
                StringPoolEncoding::Utf16 => 0
            },
            strings_start: STRING_POOL_HEADER_SIZE as u32 + string_indices_size_bytes,
            styles_start: 0
        };

        let chunk = writer.begin_chunk(ChunkType::StringPool, STRING_POOL_HEADER_SIZE)?;
        writer.write(&header)?;
        for index in string_indices {
            writer.write_u32(index)?;
        }
        writer.write_bytes(&string_data)?;
        writer.end_chunk(chunk)
    }
}

// UTF-8 strings carry both their length in characters (UTF-16 units in
// practice) and in bytes, each as one byte, or two with the high bit set.
fn encode_utf8_string(string: &str, out: &mut Vec<u8>) -> Result<()> {
    if string.len() > 0x7FFF {
        // AAPT2 would fall back to UTF-16 here, callers can choose that
        // encoding themselves instead.
        return Err(AttrSetError::StringPoolStringTooLong(string.to_string()));
    }
    encode_utf8_length(string.encode_utf16().count(), out);
    encode_utf8_length(string.len(), out);
    out.extend(string.bytes());
    out.push(0);
    Ok(())
}

fn encode_utf8_length(length: usize, out: &mut Vec<u8>) {
    if length < 0x80 {
        out.push(length as u8);
    } else {
        out.push(0x80 | ((length >> 8) & 0x7F) as u8);
        out.push((length & 0xFF) as u8);
    }
}

fn encode_utf16_string(string: &str, out: &mut Vec<u8>) -> Result<()> {
    let units: Vec<u16> = string.encode_utf16().collect();
    let length = units.len();
    if length > 0x7FFF_FFFF {
        return Err(AttrSetError::StringPoolStringTooLong(string.to_string()));
    }
    if length < 0x8000 {
        out.extend((length as u16).to_le_bytes());
    } else {
        out.extend((0x8000 | (length >> 16) as u16).to_le_bytes());
        out.extend(((length & 0xFFFF) as u16).to_le_bytes());
    }
    for unit in units {
        out.extend(unit.to_le_bytes());
    }
    out.extend(0u16.to_le_bytes());
    Ok(())
}
