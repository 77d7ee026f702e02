// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations. Each returns the text to print.

use crate::cli::{Command, ValueArgs};
use crate::config::{CliConfig, OutputFormat};
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use metaop_graph::{
    Fragment, Graph, MetaOperationInstance, MetaOperationRegistry, PropertyValue, RenderPlan,
};
use serde::Serialize;

/// How results are written
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// Serialization
    pub format: OutputFormat,
    /// Pretty-print
    pub pretty: bool,
}

impl Output {
    /// Serialize a value
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String> {
        Ok(match (self.format, self.pretty) {
            (OutputFormat::Ron, true) => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())?,
            (OutputFormat::Ron, false) => ron::ser::to_string(value)?,
            (OutputFormat::Json, true) => serde_json::to_string_pretty(value)?,
            (OutputFormat::Json, false) => serde_json::to_string(value)?,
        })
    }
}

/// Run one subcommand
pub fn run(command: &Command, registry: &MetaOperationRegistry, config: &CliConfig, output: Output) -> Result<String> {
    match command {
        Command::List => list(registry, output),
        Command::Schema { name } => {
            let operation = registry
                .get(name)
                .ok_or_else(|| anyhow!("Unknown meta-operation `{name}`"))?;
            output.render(&**operation)
        }
        Command::Instantiate { name, values } => {
            let instance = instantiate(registry, config, name, values)?;
            output.render(&GraphReport::new(&instance))
        }
        Command::Plan { name, values } => {
            let instance = instantiate(registry, config, name, values)?;
            let graph = instance.graph();
            let plan = RenderPlan::new(graph)?;
            let order: Vec<String> = plan
                .order()
                .iter()
                .filter_map(|id| graph.node(*id))
                .map(|node| format!("{} ({})", node.name, node.kind()))
                .collect();
            output.render(&order)
        }
        Command::Parse { text } => {
            let fragment = Fragment::parse(text)?;
            output.render(&ParseReport::new(&fragment))
        }
    }
}

#[derive(Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    title: &'a str,
    categories: &'a [String],
    properties: usize,
}

fn list(registry: &MetaOperationRegistry, output: Output) -> Result<String> {
    let entries: Vec<ListEntry<'_>> = registry
        .iter()
        .map(|op| ListEntry {
            name: &op.name,
            title: &op.title,
            categories: &op.categories,
            properties: op.properties.len(),
        })
        .collect();
    output.render(&entries)
}

/// Instantiate and apply the preset, then every `--set`, in order
fn instantiate(
    registry: &MetaOperationRegistry,
    config: &CliConfig,
    name: &str,
    values: &ValueArgs,
) -> Result<MetaOperationInstance> {
    let mut instance = registry.instantiate(name)?;
    let operation = instance.name().to_string();

    let mut assignments: Vec<(String, String)> = Vec::new();
    if let Some(preset) = &values.preset {
        let preset = config.preset(preset, &operation)?;
        assignments.extend(preset.values.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    assignments.extend(values.set.iter().cloned());

    for (property, text) in &assignments {
        let kind = instance
            .schema(property)
            .map(|schema| schema.kind)
            .ok_or_else(|| anyhow!("`{operation}` has no property `{property}`"))?;
        let value = PropertyValue::parse(kind, text)
            .with_context(|| format!("Invalid value for `{property}`"))?;
        let stored = instance.set_property(property, value.clone())?;
        if stored.kind() == value.kind() && stored != value {
            tracing::warn!(property = %property, requested = %value, stored = %stored, "Value was clamped");
        }
    }

    Ok(instance)
}

#[derive(Serialize)]
struct NodeReport {
    name: String,
    operation: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<&'static str, String>,
}

#[derive(Serialize)]
struct GraphReport {
    name: String,
    properties: IndexMap<String, String>,
    nodes: Vec<NodeReport>,
    connections: Vec<String>,
}

impl GraphReport {
    fn new(instance: &MetaOperationInstance) -> Self {
        let graph = instance.graph();
        Self {
            name: instance.name().to_string(),
            properties: instance
                .properties()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            nodes: graph
                .nodes()
                .map(|node| NodeReport {
                    name: node.name.clone(),
                    operation: node.kind().to_string(),
                    properties: node
                        .operation()
                        .changed_properties()
                        .into_iter()
                        .map(|(name, value)| (name, value.to_string()))
                        .collect(),
                })
                .collect(),
            connections: describe_connections(graph),
        }
    }
}

fn describe_connections(graph: &Graph) -> Vec<String> {
    let name = |id| graph.node(id).map_or("?", |n| n.name.as_str());
    graph
        .connections()
        .map(|c| format!("{}.{} -> {}.{}", name(c.from_node), c.from_socket, name(c.to_node), c.to_socket))
        .collect()
}

#[derive(Serialize)]
struct ParseReport {
    normalized: String,
    operations: Vec<NodeReport>,
}

impl ParseReport {
    fn new(fragment: &Fragment) -> Self {
        Self {
            normalized: fragment.to_string(),
            operations: fragment
                .operations()
                .iter()
                .map(|op| NodeReport {
                    name: op.kind().identifier().to_string(),
                    operation: op.kind().to_string(),
                    properties: op
                        .properties()
                        .into_iter()
                        .map(|(name, value)| (name, value.to_string()))
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;

    const JSON: Output = Output {
        format: OutputFormat::Json,
        pretty: false,
    };

    fn registry() -> MetaOperationRegistry {
        MetaOperationRegistry::with_builtins().unwrap()
    }

    fn run_json(command: Command, config: &CliConfig) -> Result<serde_json::Value> {
        let text = run(&command, &registry(), config, JSON)?;
        Ok(serde_json::from_str(&text)?)
    }

    #[test]
    fn test_list() {
        let value = run_json(Command::List, &CliConfig::default()).unwrap();
        assert_eq!(value[0]["name"], "gegl:sparkle");
        assert_eq!(value[1]["name"], "lb:sparkle2");
        assert_eq!(value[1]["properties"], 7);
    }

    #[test]
    fn test_schema() {
        let value = run_json(Command::Schema { name: "sparkle".into() }, &CliConfig::default()).unwrap();
        assert_eq!(value["name"], "gegl:sparkle");
        assert_eq!(value["properties"][0]["name"], "color3");
        assert!(run_json(Command::Schema { name: "glitter".into() }, &CliConfig::default()).is_err());
    }

    #[test]
    fn test_instantiate_with_preset_and_overrides() {
        let mut config = CliConfig::default();
        config.presets.insert(
            "dense".to_string(),
            Preset {
                operation: "gegl:sparkle".to_string(),
                values: [("iterations", "4"), ("scale", "0.2")]
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        );
        let command = Command::Instantiate {
            name: "sparkle".into(),
            values: ValueArgs {
                preset: Some("dense".into()),
                set: vec![("scale".into(), "5".into())],
            },
        };
        let value = run_json(command, &config).unwrap();
        assert_eq!(value["properties"]["iterations"], "4");
        assert_eq!(value["properties"]["scale"], "1");
        let connections = value["connections"].as_array().unwrap();
        assert!(connections.iter().any(|c| c == "cellnoise.output -> divide.aux"));
    }

    #[test]
    fn test_instantiate_errors() {
        let config = CliConfig::default();
        let bad = |set: (&str, &str)| Command::Instantiate {
            name: "gegl:sparkle".into(),
            values: ValueArgs {
                preset: None,
                set: vec![(set.0.into(), set.1.into())],
            },
        };
        assert!(run_json(bad(("volume", "1")), &config).is_err());
        assert!(run_json(bad(("iterations", "many")), &config).is_err());
        assert!(run_json(bad(("color", "#zzzzzz")), &config).is_err());
    }

    #[test]
    fn test_plan() {
        let command = Command::Plan {
            name: "lb:sparkle2".into(),
            values: ValueArgs::default(),
        };
        let value = run_json(command, &CliConfig::default()).unwrap();
        let order: Vec<&str> = value.as_array().unwrap().iter().filter_map(|v| v.as_str()).collect();
        assert_eq!(order.first(), Some(&"input (nop)"));
        assert_eq!(order.last(), Some(&"output (nop)"));
        let position = |entry: &str| order.iter().position(|e| *e == entry).unwrap();
        assert!(position("cellnoise (cell-noise)") < position("replace (src)"));
    }

    #[test]
    fn test_parse() {
        let command = Command::Parse {
            text: "gegl:layer-mode layer-mode=41 opacity=1".into(),
        };
        let value = run_json(command, &CliConfig::default()).unwrap();
        assert_eq!(value["normalized"], "layer-mode layer-mode=divide");
        assert_eq!(value["operations"][0]["properties"]["layer-mode"], "divide");
    }

    #[test]
    fn test_ron_output() {
        let output = Output {
            format: OutputFormat::Ron,
            pretty: false,
        };
        let text = run(&Command::List, &registry(), &CliConfig::default(), output).unwrap();
        assert!(text.starts_with('[') && text.contains("\"gegl:sparkle\""), "{text}");
    }
}
