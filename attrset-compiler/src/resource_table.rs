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

use crate::attribute_formats::AttributeDefinition;

pub const ANDROID_PACKAGE: &str = "android";
pub const NULL_LITERAL: &str = "@null";

/// A symbolic resource name such as `android:attr/orientation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    /// `None` means the application's own package.
    pub package: Option<String>,
    /// eg. `drawable`
    pub res_type: String,
    /// eg. `preview`
    pub name: String
}

impl ResourceName {
    pub fn new(package: Option<&str>, res_type: &str, name: &str) -> Self {
        ResourceName {
            package: package.map(str::to_string),
            res_type: res_type.to_string(),
            name: name.to_string()
        }
    }

    pub fn is_android(&self) -> bool {
        self.package.as_deref() == Some(ANDROID_PACKAGE)
    }
}

/// What the text of a `@...` literal refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceReference {
    Id(u32),
    Name(ResourceName)
}

/// True for `@null`, which encodes as a null value rather than a reference.
pub fn is_null_literal(text: &str) -> bool {
    text == NULL_LITERAL
}

/// True for any `@` literal other than `@null`.
pub fn is_reference_literal(text: &str) -> bool {
    text.starts_with('@') && !is_null_literal(text)
}

/// Parses reference syntax. Accepted forms are:
///
///  - `@2130837504`: decimal resource id
///  - `@0x7f020000` or `@7f020000`: hexadecimal resource id, the latter only
///    with all 8 digits
///  - `@drawable/preview`, `@+id/button1`, `@android:attr/orientation`
pub fn parse_reference(text: &str) -> Result<ResourceReference> {
    let malformed = || AttrSetError::ReferenceParsingFailed(text.to_string());
    let body = text.strip_prefix('@').ok_or_else(malformed)?;

    if !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()) {
        return body
            .parse::<u32>()
            .map(ResourceReference::Id)
            .map_err(|_| malformed());
    }
    // Without a 0x prefix only a full 8 digit id counts as hex, so that a
    // misspelt name such as @face isn't taken for a number
    let hex = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(digits) => Some(digits).filter(|digits| !digits.is_empty() && digits.len() <= 8),
        None => Some(body).filter(|digits| digits.len() == 8)
    };
    if let Some(hex) = hex.filter(|digits| digits.chars().all(|c| c.is_ascii_hexdigit())) {
        return u32::from_str_radix(hex, 16)
            .map(ResourceReference::Id)
            .map_err(|_| malformed());
    }

    // @+id/name declares an id in XML layouts, here it is only looked up
    let body = body.strip_prefix('+').unwrap_or(body);
    let (package, type_and_name) = match body.split_once(':') {
        Some((package, rest)) => (Some(package), rest),
        None => (None, body)
    };
    let (res_type, name) = type_and_name.split_once('/').ok_or_else(malformed)?;
    if res_type.is_empty() || name.is_empty() || name.contains('/') {
        return Err(malformed());
    }
    if package.is_some_and(str::is_empty) {
        return Err(malformed());
    }
    Ok(ResourceReference::Name(ResourceName::new(
        package, res_type, name
    )))
}

/// The source of resource names, ids and attribute definitions that value
/// resolution consults. Implementations are read-only from the point of view
/// of an attribute set build.
pub trait ResourceTable {
    /// Reverse lookup, eg. `0x010100c4` to `android:attr/orientation`.
    fn resource_name(&self, id: u32) -> Option<ResourceName>;

    /// Forward lookup. Returns `None` when the name is unknown.
    fn resource_id(&self, name: &ResourceName) -> Option<u32>;

    /// Declared formats and enum/flag symbols of an `<attr>` resource.
    fn attribute_definition(&self, id: u32) -> Option<AttributeDefinition>;
}

/// A [ResourceTable] held entirely in memory, useful for tests and for
/// callers that already know every resource they will reference.
#[derive(Debug, Clone)]
pub struct InMemoryResourceTable {
    default_package: String,
    names: HashMap<u32, ResourceName>,
    ids: HashMap<ResourceName, u32>,
    attributes: HashMap<u32, AttributeDefinition>
}

impl InMemoryResourceTable {
    /// Unqualified names such as `@drawable/preview` are looked up in
    /// `default_package`.
    pub fn new(default_package: &str) -> Self {
        InMemoryResourceTable {
            default_package: default_package.to_string(),
            names: HashMap::new(),
            ids: HashMap::new(),
            attributes: HashMap::new()
        }
    }

    pub fn add_resource(&mut self, id: u32, package: &str, res_type: &str, name: &str) {
        let name = ResourceName::new(Some(package), res_type, name);
        self.ids.insert(name.clone(), id);
        self.names.insert(id, name);
    }

    /// Adds an `attr` resource along with its definition.
    pub fn add_attribute(
        &mut self,
        id: u32,
        package: &str,
        name: &str,
        definition: AttributeDefinition
    ) {
        self.add_resource(id, package, "attr", name);
        self.attributes.insert(id, definition);
    }

    fn qualify(&self, name: &ResourceName) -> ResourceName {
        ResourceName {
            package: Some(
                name.package
                    .clone()
                    .unwrap_or_else(|| self.default_package.clone())
            ),
            ..name.clone()
        }
    }
}

impl ResourceTable for InMemoryResourceTable {
    fn resource_name(&self, id: u32) -> Option<ResourceName> {
        self.names.get(&id).cloned()
    }

    fn resource_id(&self, name: &ResourceName) -> Option<u32> {
        self.ids.get(&self.qualify(name)).copied()
    }

    fn attribute_definition(&self, id: u32) -> Option<AttributeDefinition> {
        self.attributes.get(&id).cloned()
    }
}
