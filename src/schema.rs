//! Provider schema catalog, as produced by `terraform providers schema -json`.
//!
//! The catalog is an input to the conversion; nothing here fetches schemas.

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::sync::Mutex;

/// Mapping from fully-qualified provider name to its schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSchemaCatalog {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    pub provider_schemas: IndexMap<String, ProviderSchema>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSchema {
    #[serde(default)]
    pub provider: Option<SchemaWrapper>,
    #[serde(default)]
    pub resource_schemas: IndexMap<String, SchemaWrapper>,
    #[serde(default)]
    pub data_source_schemas: IndexMap<String, SchemaWrapper>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaWrapper {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub block: SchemaBlock,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaBlock {
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeSchema>,
    #[serde(default)]
    pub block_types: IndexMap<String, NestedBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttributeSchema {
    #[serde(rename = "type")]
    pub r#type: AttributeType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NestedBlock {
    #[serde(default)]
    pub nesting_mode: NestingMode,
    #[serde(default)]
    pub block: SchemaBlock,
    #[serde(default)]
    pub min_items: Option<u64>,
    #[serde(default)]
    pub max_items: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestingMode {
    Single,
    Group,
    #[default]
    List,
    Set,
    Map,
}

/// The HCL type language, decoded from the cty JSON encoding: a primitive is
/// a bare string ("string", "number", "bool", "dynamic"), a collection is
/// `["list", T]`, an object is `["object", {name: T, ...}]`, a tuple is
/// `["tuple", [T, ...]]`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number,
    Bool,
    Dynamic,
    List(Box<AttributeType>),
    Set(Box<AttributeType>),
    Map(Box<AttributeType>),
    Object(IndexMap<String, AttributeType>),
    Tuple(Vec<AttributeType>),
}

impl AttributeType {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::String | Self::Number | Self::Bool)
    }

    /// Element type of a collection, if this is one.
    pub fn element(&self) -> Option<&AttributeType> {
        match self {
            Self::List(t) | Self::Set(t) | Self::Map(t) => Some(t),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        decode_cty(&raw).map_err(de::Error::custom)
    }
}

fn decode_cty(raw: &serde_json::Value) -> Result<AttributeType, String> {
    match raw {
        serde_json::Value::String(s) => match s.as_str() {
            "string" => Ok(AttributeType::String),
            "number" => Ok(AttributeType::Number),
            "bool" => Ok(AttributeType::Bool),
            "dynamic" => Ok(AttributeType::Dynamic),
            other => Err(format!("unknown primitive type '{other}'")),
        },
        serde_json::Value::Array(parts) if parts.len() == 2 => {
            let kind = parts[0].as_str().unwrap_or_default();
            match kind {
                "list" => Ok(AttributeType::List(Box::new(decode_cty(&parts[1])?))),
                "set" => Ok(AttributeType::Set(Box::new(decode_cty(&parts[1])?))),
                "map" => Ok(AttributeType::Map(Box::new(decode_cty(&parts[1])?))),
                "object" => {
                    let fields = parts[1]
                        .as_object()
                        .ok_or_else(|| "object type must carry a field map".to_string())?;
                    let mut out = IndexMap::new();
                    for (k, v) in fields {
                        out.insert(k.clone(), decode_cty(v)?);
                    }
                    Ok(AttributeType::Object(out))
                }
                "tuple" => {
                    let elems = parts[1]
                        .as_array()
                        .ok_or_else(|| "tuple type must carry an element list".to_string())?;
                    let mut out = Vec::with_capacity(elems.len());
                    for e in elems {
                        out.push(decode_cty(e)?);
                    }
                    Ok(AttributeType::Tuple(out))
                }
                other => Err(format!("unknown composite type '{other}'")),
            }
        }
        other => Err(format!("unexpected type encoding: {other}")),
    }
}

impl ProviderSchemaCatalog {
    /// Resolve a local provider name ("aws") to the FQPN key in the catalog,
    /// matching on the last path segment.
    pub fn fqpn_for(&self, provider: &str) -> Option<&str> {
        self.provider_schemas
            .keys()
            .find(|fqpn| fqpn.rsplit('/').next() == Some(provider))
            .map(String::as_str)
    }

    pub fn provider(&self, provider: &str) -> Option<&ProviderSchema> {
        let fqpn = self.fqpn_for(provider)?;
        self.provider_schemas.get(fqpn)
    }

    pub fn resource_block(&self, provider: &str, resource_type: &str) -> Option<&SchemaBlock> {
        self.provider(provider)?
            .resource_schemas
            .get(resource_type)
            .map(|w| &w.block)
    }

    pub fn data_source_block(&self, provider: &str, data_type: &str) -> Option<&SchemaBlock> {
        self.provider(provider)?
            .data_source_schemas
            .get(data_type)
            .map(|w| &w.block)
    }

    pub fn provider_block(&self, provider: &str) -> Option<&SchemaBlock> {
        self.provider(provider)?.provider.as_ref().map(|w| &w.block)
    }
}

/// Per-provider binding metadata, populated lazily on first lookup.
///
/// A cache may be shared across conversions; lookups go through a mutex and
/// the computed entries are never mutated afterwards.
#[derive(Default)]
pub struct BindingsCache {
    entries: Mutex<IndexMap<String, ProviderBindings>>,
}

#[derive(Debug, Clone)]
pub struct ProviderBindings {
    /// Directory under `.gen/providers/` the generated bindings live in.
    pub local_name: String,
    /// Fully-qualified provider name, when the catalog knows it.
    pub fqpn: Option<String>,
    /// Whether the catalog carries a schema for this provider at all.
    pub has_schema: bool,
}

impl fmt::Debug for BindingsCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingsCache").finish_non_exhaustive()
    }
}

impl BindingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, provider: &str, catalog: &ProviderSchemaCatalog) -> ProviderBindings {
        let mut entries = self.entries.lock().expect("bindings cache poisoned");
        entries
            .entry(provider.to_string())
            .or_insert_with(|| {
                let fqpn = catalog.fqpn_for(provider).map(str::to_string);
                ProviderBindings {
                    local_name: provider.to_string(),
                    has_schema: fqpn.is_some(),
                    fqpn,
                }
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_primitive_and_composite_types() {
        let json = serde_json::json!({
            "provider_schemas": {
                "registry.terraform.io/hashicorp/aws": {
                    "resource_schemas": {
                        "aws_vpc": {
                            "version": 1,
                            "block": {
                                "attributes": {
                                    "id": { "type": "string", "computed": true },
                                    "cidr_block": { "type": "string", "optional": true },
                                    "tags": { "type": ["map", "string"], "optional": true },
                                    "subnets": {
                                        "type": ["list", ["object", {"id": "string"}]],
                                        "computed": true
                                    }
                                }
                            }
                        }
                    }
                }
            }
        });
        let catalog: ProviderSchemaCatalog = serde_json::from_value(json).unwrap();
        let block = catalog.resource_block("aws", "aws_vpc").unwrap();
        assert_eq!(block.attributes["id"].r#type, AttributeType::String);
        assert!(block.attributes["id"].computed);
        assert_eq!(
            block.attributes["tags"].r#type,
            AttributeType::Map(Box::new(AttributeType::String))
        );
        match &block.attributes["subnets"].r#type {
            AttributeType::List(inner) => match inner.as_ref() {
                AttributeType::Object(fields) => {
                    assert_eq!(fields["id"], AttributeType::String)
                }
                other => panic!("expected object element, got {other:?}"),
            },
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn resolves_local_name_to_fqpn() {
        let json = serde_json::json!({
            "provider_schemas": {
                "registry.terraform.io/hashicorp/null": {}
            }
        });
        let catalog: ProviderSchemaCatalog = serde_json::from_value(json).unwrap();
        assert_eq!(
            catalog.fqpn_for("null"),
            Some("registry.terraform.io/hashicorp/null")
        );
        assert_eq!(catalog.fqpn_for("aws"), None);
    }
}
