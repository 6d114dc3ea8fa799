//! Validated view of a parsed Terraform configuration.
//!
//! [`Plan::from_body`] checks the raw HCL body against the Terraform block
//! grammar and rejects anything out of shape with a structured path. Leaf
//! values stay as parsed [`hcl::Expression`] trees; nothing is evaluated
//! here.

use hcl::{Block, Body, Expression};
use indexmap::IndexMap;

use crate::error::ConvertError;
use crate::schema::ProviderSchemaCatalog;

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub terraform: Option<TerraformSettings>,
    /// provider name -> configurations (one per `provider` block).
    pub providers: IndexMap<String, Vec<Body>>,
    pub variables: IndexMap<String, Body>,
    /// Merged from every `locals` block, in file order.
    pub locals: Vec<(String, Expression)>,
    pub outputs: IndexMap<String, Body>,
    /// module name -> invocations.
    pub modules: IndexMap<String, Vec<Body>>,
    /// resource type -> name -> configurations.
    pub resources: IndexMap<String, IndexMap<String, Vec<Body>>>,
    pub data: IndexMap<String, IndexMap<String, Vec<Body>>>,
}

#[derive(Debug, Clone, Default)]
pub struct TerraformSettings {
    /// Backend type and its configuration body, at most one.
    pub backend: Option<(String, Body)>,
    pub required_providers: IndexMap<String, ProviderRequirement>,
}

#[derive(Debug, Clone)]
pub struct ProviderRequirement {
    pub source: String,
    pub version: Option<String>,
}

fn conformance(path: &[&str], expected: &str) -> ConvertError {
    ConvertError::SchemaConformance {
        path: path.iter().map(|s| s.to_string()).collect(),
        expected: expected.to_string(),
    }
}

fn single_label<'a>(blk: &'a Block, kind: &str) -> Result<&'a str, ConvertError> {
    match blk.labels() {
        [l] => Ok(l.as_str()),
        _ => Err(conformance(&[kind], "exactly one label")),
    }
}

impl Plan {
    pub fn from_body(body: &Body) -> Result<Self, ConvertError> {
        // Top-level attributes are not part of the Terraform grammar.
        if let Some(attr) = body.attributes().next() {
            return Err(conformance(
                &[attr.key()],
                "a block; top-level attributes are not valid Terraform",
            ));
        }

        let mut plan = Plan::default();
        for blk in body.blocks() {
            match blk.identifier() {
                "terraform" => plan.parse_terraform(blk)?,
                "provider" => {
                    let name = single_label(blk, "provider")?;
                    plan.providers
                        .entry(name.to_string())
                        .or_default()
                        .push(blk.body().clone());
                }
                "variable" => {
                    let name = single_label(blk, "variable")?;
                    plan.variables.insert(name.to_string(), blk.body().clone());
                }
                "locals" => {
                    if !blk.labels().is_empty() {
                        return Err(conformance(&["locals"], "no labels"));
                    }
                    for attr in blk.body().attributes() {
                        plan.locals
                            .push((attr.key().to_string(), attr.expr().clone()));
                    }
                }
                "output" => {
                    let name = single_label(blk, "output")?;
                    if blk.body().attributes().all(|a| a.key() != "value") {
                        return Err(conformance(&["output", name], "a 'value' attribute"));
                    }
                    plan.outputs.insert(name.to_string(), blk.body().clone());
                }
                "module" => {
                    let name = single_label(blk, "module")?;
                    if blk.body().attributes().all(|a| a.key() != "source") {
                        return Err(conformance(&["module", name], "a 'source' attribute"));
                    }
                    plan.modules
                        .entry(name.to_string())
                        .or_default()
                        .push(blk.body().clone());
                }
                "resource" => Self::parse_typed(&mut plan.resources, blk, "resource")?,
                "data" => Self::parse_typed(&mut plan.data, blk, "data")?,
                other => {
                    return Err(conformance(
                        &[other],
                        "one of terraform, provider, variable, locals, output, module, resource, data",
                    ))
                }
            }
        }
        Ok(plan)
    }

    fn parse_typed(
        map: &mut IndexMap<String, IndexMap<String, Vec<Body>>>,
        blk: &Block,
        kind: &str,
    ) -> Result<(), ConvertError> {
        let [ty, name] = blk.labels() else {
            return Err(conformance(&[kind], "exactly two labels (type and name)"));
        };
        map.entry(ty.as_str().to_string())
            .or_default()
            .entry(name.as_str().to_string())
            .or_default()
            .push(blk.body().clone());
        Ok(())
    }

    fn parse_terraform(&mut self, blk: &Block) -> Result<(), ConvertError> {
        if !blk.labels().is_empty() {
            return Err(conformance(&["terraform"], "no labels"));
        }
        let settings = self.terraform.get_or_insert_with(TerraformSettings::default);
        for inner in blk.body().blocks() {
            match inner.identifier() {
                "backend" => {
                    let ty = match inner.labels() {
                        [l] => l.as_str().to_string(),
                        _ => {
                            return Err(conformance(
                                &["terraform", "backend"],
                                "exactly one label (the backend type)",
                            ))
                        }
                    };
                    if settings.backend.is_some() {
                        return Err(conformance(
                            &["terraform", "backend"],
                            "at most one backend block",
                        ));
                    }
                    settings.backend = Some((ty, inner.body().clone()));
                }
                "required_providers" => {
                    for attr in inner.body().attributes() {
                        let req = parse_requirement(attr.key(), attr.expr())?;
                        settings
                            .required_providers
                            .insert(attr.key().to_string(), req);
                    }
                }
                // required_version, cloud, experiments and friends carry no
                // information the emitted program needs.
                _ => {}
            }
        }
        Ok(())
    }

    /// The requirements table entry for a provider: `required_providers`
    /// wins, then the schema catalog, then the registry default namespace.
    pub fn provider_requirement(
        &self,
        provider: &str,
        catalog: &ProviderSchemaCatalog,
    ) -> ProviderRequirement {
        if let Some(req) = self
            .terraform
            .as_ref()
            .and_then(|t| t.required_providers.get(provider))
        {
            return req.clone();
        }
        if let Some(fqpn) = catalog.fqpn_for(provider) {
            return ProviderRequirement {
                source: fqpn
                    .strip_prefix("registry.terraform.io/")
                    .unwrap_or(fqpn)
                    .to_string(),
                version: None,
            };
        }
        ProviderRequirement {
            source: format!("hashicorp/{provider}"),
            version: None,
        }
    }
}

fn parse_requirement(name: &str, expr: &Expression) -> Result<ProviderRequirement, ConvertError> {
    match expr {
        // Legacy form: aws = "~> 4.0"
        Expression::String(version) => Ok(ProviderRequirement {
            source: format!("hashicorp/{name}"),
            version: Some(version.clone()),
        }),
        Expression::Object(fields) => {
            let mut source = None;
            let mut version = None;
            for (k, v) in fields {
                let key: String = k.clone().into();
                match (key.as_str(), v) {
                    ("source", Expression::String(s)) => source = Some(s.clone()),
                    ("version", Expression::String(s)) => version = Some(s.clone()),
                    _ => {}
                }
            }
            Ok(ProviderRequirement {
                source: source.unwrap_or_else(|| format!("hashicorp/{name}")),
                version,
            })
        }
        _ => Err(conformance(
            &["terraform", "required_providers", name],
            "a version string or an object with source/version",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Plan, ConvertError> {
        let body: Body = hcl::from_str(input).unwrap();
        Plan::from_body(&body)
    }

    #[test]
    fn collects_all_block_kinds() {
        let plan = parse(
            r#"
            terraform {
              backend "s3" { bucket = "b" }
              required_providers {
                aws = { source = "hashicorp/aws", version = "5.0.0" }
                null = "3.2.1"
              }
            }
            provider "aws" { region = "us-east-1" }
            variable "r" { type = string }
            locals { prefix = "p" }
            output "o" { value = var.r }
            module "net" { source = "./net" }
            resource "aws_vpc" "main" {}
            data "aws_ami" "ubuntu" {}
            "#,
        )
        .unwrap();

        let tf = plan.terraform.unwrap();
        assert_eq!(tf.backend.as_ref().unwrap().0, "s3");
        assert_eq!(tf.required_providers["aws"].source, "hashicorp/aws");
        assert_eq!(tf.required_providers["null"].version.as_deref(), Some("3.2.1"));
        assert_eq!(plan.providers["aws"].len(), 1);
        assert!(plan.variables.contains_key("r"));
        assert_eq!(plan.locals[0].0, "prefix");
        assert!(plan.outputs.contains_key("o"));
        assert!(plan.modules.contains_key("net"));
        assert!(plan.resources["aws_vpc"].contains_key("main"));
        assert!(plan.data["aws_ami"].contains_key("ubuntu"));
    }

    #[test]
    fn rejects_unknown_top_level_block() {
        let err = parse("widget \"x\" {}").unwrap_err();
        match err {
            ConvertError::SchemaConformance { path, .. } => assert_eq!(path, vec!["widget"]),
            other => panic!("expected conformance error, got {other}"),
        }
    }

    #[test]
    fn rejects_top_level_attribute() {
        let err = parse("region = \"us-east-1\"").unwrap_err();
        assert!(matches!(err, ConvertError::SchemaConformance { .. }));
    }

    #[test]
    fn rejects_resource_with_one_label() {
        let err = parse("resource \"aws_vpc\" {}").unwrap_err();
        match err {
            ConvertError::SchemaConformance { expected, .. } => {
                assert!(expected.contains("two labels"))
            }
            other => panic!("expected conformance error, got {other}"),
        }
    }

    #[test]
    fn rejects_output_without_value() {
        let err = parse("output \"o\" { description = \"d\" }").unwrap_err();
        match err {
            ConvertError::SchemaConformance { path, .. } => {
                assert_eq!(path, vec!["output", "o"])
            }
            other => panic!("expected conformance error, got {other}"),
        }
    }

    #[test]
    fn merges_multiple_locals_blocks_in_order() {
        let plan = parse("locals { a = 1 }\nlocals { b = 2 }").unwrap();
        let keys: Vec<_> = plan.locals.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn unknown_attributes_inside_blocks_pass_through() {
        assert!(parse("resource \"aws_vpc\" \"m\" { future_attr = true }").is_ok());
    }
}
