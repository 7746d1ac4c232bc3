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

// Writes ResChunks into one growing buffer. A chunk's total size is only
// known once its body has been written, so every open chunk remembers where
// its header lives and the size is patched in when it is closed.
use std::collections::BTreeMap;

use attrset_common::*;
use deku::DekuContainerWrite;

use crate::resource_external_types::*;

// Where chunk_size sits within a ResChunkHeader
const CHUNK_SIZE_OFFSET: usize = 4;
// There is no source document, every node claims to be on line 1
const XML_LINE_NUMBER: u32 = 1;

/// Returned by [ChunkWriter::begin_chunk], must be handed back to
/// [ChunkWriter::end_chunk] in reverse opening order.
#[derive(Debug, PartialEq, Eq)]
#[must_use]
pub struct ChunkHandle {
    start: usize
}

/// 1-based positions of the pseudo attributes in a start element, 0 if absent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpecialAttributeIndices {
    pub id: u16,
    pub class: u16,
    pub style: u16
}

#[derive(Debug, Default)]
pub struct ChunkWriter {
    buffer: Vec<u8>,
    open_chunks: Vec<usize>,
    capacity: Option<usize>
}

impl ChunkWriter {
    pub fn new() -> Self {
        ChunkWriter::default()
    }

    /// A writer that refuses to grow beyond `capacity` bytes.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        ChunkWriter {
            buffer: vec![],
            open_chunks: vec![],
            capacity: Some(capacity)
        }
    }

    /// Reserves a ResChunkHeader. `header_size` covers the ResChunkHeader
    /// itself plus any chunk-specific header the caller writes next.
    pub fn begin_chunk(&mut self, chunk_type: ChunkType, header_size: u16) -> Result<ChunkHandle> {
        let start = self.buffer.len();
        self.write(&ResChunkHeader {
            chunk_type,
            header_size,
            chunk_size: 0
        })?;
        self.open_chunks.push(start);
        Ok(ChunkHandle { start })
    }

    /// Closes the innermost open chunk, which must be the one `handle` refers to.
    pub fn end_chunk(&mut self, handle: ChunkHandle) -> Result<()> {
        if self.open_chunks.last() != Some(&handle.start) {
            return Err(AttrSetError::ChunkNestingMismatch);
        }
        self.open_chunks.pop();

        let chunk_size = (self.buffer.len() - handle.start) as u32;
        let size_offset = handle.start + CHUNK_SIZE_OFFSET;
        self.buffer[size_offset..size_offset + 4].copy_from_slice(&chunk_size.to_le_bytes());
        Ok(())
    }

    pub fn write<T: DekuContainerWrite>(&mut self, data: &T) -> Result<()> {
        let bytes = data.to_bytes()?;
        self.write_bytes(&bytes)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let required = self.buffer.len() + bytes.len();
        if let Some(capacity) = self.capacity {
            if required > capacity {
                return Err(AttrSetError::BufferCapacityExceeded { capacity, required });
            }
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes an XmlResourceMap chunk mapping attribute name string indices
    /// to resource ids.
    ///
    /// The map is dense: it has one entry for every index from 0 up to and
    /// including `max_name_index`, with 0 for indices that have no id. If
    /// `resource_ids` is empty nothing is written at all.
    pub fn write_resource_map(
        &mut self,
        resource_ids: &BTreeMap<u32, u32>,
        max_name_index: u32
    ) -> Result<()> {
        if resource_ids.is_empty() {
            return Ok(());
        }
        let chunk = self.begin_chunk(ChunkType::XmlResourceMap, RES_CHUNK_HEADER_SIZE)?;
        for index in 0..=max_name_index {
            self.write_u32(resource_ids.get(&index).copied().unwrap_or(0))?;
        }
        self.end_chunk(chunk)
    }

    pub fn write_element_start(
        &mut self,
        namespace: ResStringPoolRef,
        name: ResStringPoolRef,
        attributes: &[XmlAttribute],
        special_indices: SpecialAttributeIndices
    ) -> Result<()> {
        let attribute_count = u16::try_from(attributes.len())
            .map_err(|_| AttrSetError::TooManyAttributes(attributes.len()))?;
        let chunk = self.begin_node_chunk(ChunkType::XmlStartElement)?;
        self.write(&XmlAttributeExtension {
            namespace,
            name,
            attribute_start: XML_ATTRIBUTE_EXTENSION_SIZE,
            attribute_size: XML_ATTRIBUTE_SIZE,
            attribute_count,
            id_index: special_indices.id,
            class_index: special_indices.class,
            style_index: special_indices.style
        })?;
        for attribute in attributes {
            self.write(attribute)?;
        }
        self.end_chunk(chunk)
    }

    pub fn write_element_end(
        &mut self,
        namespace: ResStringPoolRef,
        name: ResStringPoolRef
    ) -> Result<()> {
        let chunk = self.begin_node_chunk(ChunkType::XmlEndElement)?;
        self.write(&XmlEndElementExtension { namespace, name })?;
        self.end_chunk(chunk)
    }

    fn begin_node_chunk(&mut self, chunk_type: ChunkType) -> Result<ChunkHandle> {
        let chunk = self.begin_chunk(chunk_type, XML_NODE_HEADER_SIZE)?;
        self.write(&XmlNodeHeader {
            line_number: XML_LINE_NUMBER,
            comment: UINT32_MINUS_ONE
        })?;
        Ok(chunk)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Hands over the written bytes. Chunks still open at this point will
    /// have a size of 0.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
