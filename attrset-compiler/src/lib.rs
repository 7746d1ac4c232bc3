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

//! Compiles a list of attribute assignments into Android's binary XML
//! format: a single element whose attributes carry fully typed `Res_value`s,
//! the way AAPT would have compiled them from a layout file.

pub mod attribute_formats;
pub mod attribute_set;
pub mod binary_xml_parser;
pub mod chunk_writer;
pub mod resource_external_types;
pub mod resource_table;
pub mod string_pool;
pub mod typed_value;
pub mod value_resolver;
pub mod xml_dump;
