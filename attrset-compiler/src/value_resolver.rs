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

use attrset_common::*;
use log::trace;

use crate::{
    attribute_set::AttributeKey,
    resource_external_types::AttributeDataType,
    resource_table::{
        is_null_literal, is_reference_literal, parse_reference, ResourceReference, ResourceTable
    },
    string_pool::StringPoolBuilder,
    typed_value::TypedValue
};

/// The encoded form of one attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub data_type: AttributeDataType,
    pub data: u32,
    /// The text a parser reports as the attribute's raw value, if any.
    pub raw_value: Option<String>
}

impl ResolvedValue {
    fn null() -> Self {
        ResolvedValue {
            data_type: AttributeDataType::Null,
            data: 0,
            raw_value: None
        }
    }
}

/// Turns literal attribute text into a typed value, consulting the resource
/// table for references and for the formats a real attribute accepts.
pub struct ValueResolver<'t, T: ResourceTable + ?Sized> {
    table: &'t T
}

impl<'t, T: ResourceTable + ?Sized> ValueResolver<'t, T> {
    pub fn new(table: &'t T) -> Self {
        ValueResolver { table }
    }

    /// Resolves `text` for the attribute `key`. String payloads are interned
    /// into `pool` as shared strings. `attribute_name` is only used to
    /// describe failures.
    pub fn resolve(
        &self,
        key: AttributeKey,
        attribute_name: &str,
        text: Option<&str>,
        pool: &mut StringPoolBuilder
    ) -> Result<ResolvedValue> {
        let resolved = match (key, text) {
            (_, None) => ResolvedValue::null(),
            (_, Some(text)) if is_null_literal(text) => ResolvedValue {
                raw_value: Some(text.to_string()),
                ..ResolvedValue::null()
            },
            (AttributeKey::Resource(_), Some(text)) if is_reference_literal(text) => {
                // References win regardless of the declared formats
                let id = self.lookup_reference(text)?;
                ResolvedValue {
                    data_type: AttributeDataType::Reference,
                    data: id,
                    raw_value: Some(format!("@{id}"))
                }
            }
            (AttributeKey::Resource(id), Some(text)) => {
                self.resolve_declared_formats(id, attribute_name, text, pool)?
            }
            // style, class and id have no definition to consult
            (_, Some(text)) if is_reference_literal(text) => ResolvedValue {
                data_type: AttributeDataType::Reference,
                data: self.lookup_reference(text)?,
                raw_value: Some(text.to_string())
            },
            (_, Some(text)) => ResolvedValue {
                data_type: AttributeDataType::String,
                data: pool.intern_shared(text),
                raw_value: Some(text.to_string())
            }
        };
        trace!(
            "Resolved {} = {:?} as {:?} 0x{:08x}",
            attribute_name,
            text,
            resolved.data_type,
            resolved.data
        );
        Ok(resolved)
    }

    fn lookup_reference(&self, text: &str) -> Result<u32> {
        let id = match parse_reference(text)? {
            ResourceReference::Id(id) => Some(id),
            ResourceReference::Name(name) => self.table.resource_id(&name)
        };
        match id {
            Some(id) if id != 0 => Ok(id),
            _ => Err(AttrSetError::UnresolvedSymbolicReference(
                text.to_string()
            ))
        }
    }

    fn resolve_declared_formats(
        &self,
        attribute_id: u32,
        attribute_name: &str,
        text: &str,
        pool: &mut StringPoolBuilder
    ) -> Result<ResolvedValue> {
        let definition = self
            .table
            .attribute_definition(attribute_id)
            .ok_or(AttrSetError::UnknownAttributeId(attribute_id))?;

        let converted = definition
            .formats
            .candidates()
            .find_map(|format| format.convert(text, &definition));
        let (data_type, data) = match converted {
            Some(TypedValue::String) => (AttributeDataType::String, pool.intern_shared(text)),
            Some(TypedValue::Data(data_type, data)) => (data_type, data),
            None => {
                return Err(AttrSetError::UnresolvedFormat {
                    attribute: attribute_name.to_string(),
                    value: text.to_string()
                })
            }
        };
        Ok(ResolvedValue {
            data_type,
            data,
            raw_value: Some(text.to_string())
        })
    }
}
