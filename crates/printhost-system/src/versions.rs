// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Firmware/software version export as an IPP attribute group.
//
// Four attributes are produced under a "printer-" or "system-" prefix:
//
//   xxx-firmware-name            name          1setOf
//   xxx-firmware-patches         text          1setOf ("" when unknown)
//   xxx-firmware-string-version  text          1setOf
//   xxx-firmware-version         octetString   1setOf (4 x u16, big-endian)
//
// Each attribute carries one value per component: the application's own
// components first, then Printhost, then compiled-in native dependencies.

use std::collections::HashSet;

use printhost_core::types::{AttributeScope, FirmwareVersion};

/// Maximum number of application-registered components.
pub const MAX_VERSIONS: usize = 10;

// IPP value and delimiter tags (RFC 8010 SS3.5).
const VALUE_TAG_OCTET_STRING: u8 = 0x30;
const VALUE_TAG_TEXT: u8 = 0x41;
const VALUE_TAG_NAME: u8 = 0x42;
const TAG_PRINTER_ATTRIBUTES: u8 = 0x04;
const TAG_SYSTEM_ATTRIBUTES: u8 = 0x0A;

/// One attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Name(String),
    Text(String),
    OctetString(Vec<u8>),
}

impl AttributeValue {
    fn tag(&self) -> u8 {
        match self {
            Self::Name(_) => VALUE_TAG_NAME,
            Self::Text(_) => VALUE_TAG_TEXT,
            Self::OctetString(_) => VALUE_TAG_OCTET_STRING,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Name(s) | Self::Text(s) => s.as_bytes(),
            Self::OctetString(b) => b,
        }
    }
}

/// A named, possibly multi-valued attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<AttributeValue>,
}

/// An ordered attribute group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeGroup {
    pub scope: AttributeScope,
    pub attributes: Vec<Attribute>,
}

impl AttributeGroup {
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Encode as an IPP attribute group: delimiter tag followed by each
    /// attribute, with additional values written under an empty name.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = AttributeWriter::new(match self.scope {
            AttributeScope::Printer => TAG_PRINTER_ATTRIBUTES,
            AttributeScope::System => TAG_SYSTEM_ATTRIBUTES,
        });

        for attr in &self.attributes {
            for (i, value) in attr.values.iter().enumerate() {
                let name = if i == 0 { attr.name.as_str() } else { "" };
                writer.write_attr(value.tag(), name, value.bytes());
            }
        }
        writer.finish()
    }
}

/// Binary attribute writer (RFC 8010 SS3.1.4 layout).
struct AttributeWriter {
    buf: Vec<u8>,
}

impl AttributeWriter {
    fn new(delimiter: u8) -> Self {
        let mut buf = Vec::with_capacity(256);
        buf.push(delimiter);
        Self { buf }
    }

    fn write_attr(&mut self, value_tag: u8, name: &str, value: &[u8]) -> &mut Self {
        self.buf.push(value_tag);
        let name_bytes = name.as_bytes();
        self.buf
            .extend_from_slice(&(name_bytes.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(name_bytes);
        self.buf
            .extend_from_slice(&(value.len() as u16).to_be_bytes());
        self.buf.extend_from_slice(value);
        self
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Components Printhost always reports after the application's own.
///
/// Only the framework itself: dependency versions are not known at run time.
pub fn builtin_components() -> Vec<FirmwareVersion> {
    vec![FirmwareVersion::new("Printhost", "", env!("CARGO_PKG_VERSION"))]
}

/// Build the version group for `registered` plus the built-in components.
///
/// `requested` limits output to the named attributes; `None` means all four.
pub fn build_version_group(
    scope: AttributeScope,
    registered: &[FirmwareVersion],
    requested: Option<&HashSet<String>>,
) -> AttributeGroup {
    let components: Vec<FirmwareVersion> = registered
        .iter()
        .cloned()
        .chain(builtin_components())
        .collect();
    let prefix = scope.prefix();
    let wanted = |name: &str| requested.is_none_or(|set| set.contains(name));

    let mut attributes = Vec::with_capacity(4);

    let name = format!("{prefix}-firmware-name");
    if wanted(&name) {
        attributes.push(Attribute {
            name,
            values: components
                .iter()
                .map(|c| AttributeValue::Name(c.name.clone()))
                .collect(),
        });
    }

    let name = format!("{prefix}-firmware-patches");
    if wanted(&name) {
        attributes.push(Attribute {
            name,
            values: components
                .iter()
                .map(|c| AttributeValue::Text(c.patches.clone()))
                .collect(),
        });
    }

    let name = format!("{prefix}-firmware-string-version");
    if wanted(&name) {
        attributes.push(Attribute {
            name,
            values: components
                .iter()
                .map(|c| AttributeValue::Text(c.sversion.clone()))
                .collect(),
        });
    }

    let name = format!("{prefix}-firmware-version");
    if wanted(&name) {
        attributes.push(Attribute {
            name,
            values: components
                .iter()
                .map(|c| AttributeValue::OctetString(version_octets(c.version)))
                .collect(),
        });
    }

    AttributeGroup { scope, attributes }
}

fn version_octets(version: [u16; 4]) -> Vec<u8> {
    version.iter().flat_map(|v| v.to_be_bytes()).collect()
}
