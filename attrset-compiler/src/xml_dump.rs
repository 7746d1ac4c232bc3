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

// Renders a parsed attribute set back into textual XML, similar to what
// `aapt2 dump xmltree` shows. Only meant for logs and test failures.
use attrset_common::*;
use xml::writer::{EmitterConfig, XmlEvent};

use crate::{
    attribute_set::{ANDROID_NAMESPACE, AUTO_NAMESPACE},
    binary_xml_parser::{ParsedAttribute, ParsedAttributeSet},
    resource_external_types::AttributeDataType
};

fn namespace_prefix(uri: &str, others: &mut Vec<String>) -> String {
    match uri {
        ANDROID_NAMESPACE => "android".into(),
        AUTO_NAMESPACE => "app".into(),
        _ => {
            let position = match others.iter().position(|other| other == uri) {
                Some(position) => position,
                None => {
                    others.push(uri.to_string());
                    others.len() - 1
                }
            };
            format!("ns{position}")
        }
    }
}

// Attributes without a raw value are shown by their typed value
fn display_value(attribute: &ParsedAttribute) -> String {
    if let Some(raw) = &attribute.raw_value {
        return raw.clone();
    }
    let value = &attribute.typed_value;
    match value.data_type {
        AttributeDataType::Null => "@null".into(),
        AttributeDataType::Reference => format!("@0x{:08x}", value.data),
        AttributeDataType::Float => f32::from_bits(value.data).to_string(),
        AttributeDataType::DecimalInteger => (value.data as i32).to_string(),
        AttributeDataType::BooleanInteger => (value.data != 0).to_string(),
        _ => format!("0x{:08x}", value.data)
    }
}

impl ParsedAttributeSet {
    /// The element and its attributes as an indented XML document fragment.
    pub fn to_xml(&self) -> Result<String> {
        let mut other_namespaces = vec![];
        let mut namespaces: Vec<(String, String)> = vec![];
        let mut attributes: Vec<(String, String)> = vec![];
        for attribute in self.attributes() {
            let name = match &attribute.namespace {
                Some(uri) => {
                    let prefix = namespace_prefix(uri, &mut other_namespaces);
                    if !namespaces.iter().any(|(known, _)| *known == prefix) {
                        namespaces.push((prefix.clone(), uri.clone()));
                    }
                    format!("{prefix}:{}", attribute.name)
                }
                None => attribute.name.clone()
            };
            attributes.push((name, display_value(attribute)));
        }

        let mut out: Vec<u8> = vec![];
        {
            let mut writer = EmitterConfig::new()
                .perform_indent(true)
                .write_document_declaration(false)
                .create_writer(&mut out);
            let mut element = XmlEvent::start_element(self.element_name());
            for (prefix, uri) in &namespaces {
                element = element.ns(prefix.as_str(), uri.as_str());
            }
            for (name, value) in &attributes {
                element = element.attr(name.as_str(), value.as_str());
            }
            writer.write(element)?;
            writer.write(XmlEvent::end_element())?;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        attribute_formats::{AttributeDefinition, AttributeFormats},
        attribute_set::AttributeSetAssembler,
        binary_xml_parser::{AttributeSetParser, BinaryXmlParser},
        resource_table::InMemoryResourceTable
    };

    #[test]
    fn renders_prefixed_attributes() {
        let mut table = InMemoryResourceTable::new("com.example");
        table.add_attribute(
            0x0101_014F,
            "android",
            "text",
            AttributeDefinition::new(AttributeFormats::STRING)
        );
        table.add_attribute(
            0x7F01_0000,
            "com.example",
            "checked",
            AttributeDefinition::new(AttributeFormats::BOOLEAN)
        );
        let mut assembler = AttributeSetAssembler::new(&table);
        assembler
            .add_attribute(0x0101_014F, "Hello & bye")
            .add_attribute(0x7F01_0000, "true")
            .set_style_attribute(None::<&str>);
        let parsed = BinaryXmlParser.parse(&assembler.build().unwrap()).unwrap();

        let xml = parsed.to_xml().unwrap();
        assert!(xml.starts_with("<dummy"), "{xml}");
        assert!(xml.contains(&format!("xmlns:android=\"{ANDROID_NAMESPACE}\"")), "{xml}");
        assert!(xml.contains("android:text=\"Hello &amp; bye\""), "{xml}");
        assert!(xml.contains("app:checked=\"true\""), "{xml}");
        assert!(xml.contains("style=\"@null\""), "{xml}");
    }

    #[test]
    fn unknown_namespaces_get_numbered_prefixes() {
        let mut others = vec![];
        assert_eq!(namespace_prefix("urn:a", &mut others), "ns0");
        assert_eq!(namespace_prefix("urn:b", &mut others), "ns1");
        assert_eq!(namespace_prefix("urn:a", &mut others), "ns0");
        assert_eq!(namespace_prefix(ANDROID_NAMESPACE, &mut others), "android");
    }
}
