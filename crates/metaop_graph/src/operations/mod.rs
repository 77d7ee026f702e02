// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in meta-operations.

pub mod sparkle;
pub mod sparkle2;

use crate::registry::{MetaOperationRegistry, RegistryError};

/// Register every built-in meta-operation
pub fn register_builtins(registry: &mut MetaOperationRegistry) -> Result<(), RegistryError> {
    registry.register_meta_operation(sparkle::meta_operation())?;
    registry.register_meta_operation(sparkle2::meta_operation())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::RenderPlan;
    use crate::instance::MetaOperationInstance;
    use crate::node::NodeId;
    use crate::operation::{Operation, OperationKind};
    use crate::socket::{AUX, INPUT};
    use crate::value::{Color, PropertyValue, Seed};
    use indexmap::IndexMap;

    fn registry() -> MetaOperationRegistry {
        MetaOperationRegistry::with_builtins().unwrap()
    }

    fn snapshot(instance: &MetaOperationInstance) -> IndexMap<NodeId, Operation> {
        instance
            .graph()
            .nodes()
            .map(|n| (n.id, n.operation().clone()))
            .collect()
    }

    fn target_value(instance: &MetaOperationInstance, external: &str) -> PropertyValue {
        let target = &instance.redirects().targets(external).unwrap()[0];
        instance.graph().node(target.node).unwrap().property(&target.property).unwrap()
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = registry();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["gegl:sparkle", "lb:sparkle2"]);
        assert_eq!(
            registry.get("sparkle2").and_then(|op| op.menu_path.clone()).as_deref(),
            Some("<Image>/Filters/Render/Fun")
        );
    }

    #[test]
    fn test_output_reachable_from_input() {
        let registry = registry();
        for name in registry.names() {
            let instance = registry.instantiate(name).unwrap();
            let graph = instance.graph();
            assert!(graph.is_reachable(graph.input_proxy(), graph.output_proxy()), "{name}");
            let plan = RenderPlan::new(graph).unwrap();
            assert!(plan.contains(graph.input_proxy()), "{name}");
        }
    }

    #[test]
    fn test_defaults_reach_targets() {
        let registry = registry();
        for operation in registry.iter() {
            let instance = registry.instantiate(&operation.name).unwrap();
            for property in &operation.properties {
                for target in instance.redirects().targets(&property.name).unwrap() {
                    let node = instance.graph().node(target.node).unwrap();
                    assert_eq!(
                        node.property(&target.property),
                        Some(target.transform.apply(&property.default)),
                        "{}.{}",
                        operation.name,
                        property.name
                    );
                }
            }
        }
    }

    #[test]
    fn test_noise_scale_touches_only_noise() {
        let mut instance = registry().instantiate("gegl:sparkle").unwrap();
        let before = snapshot(&instance);
        let noise = instance.redirects().targets("scale").unwrap()[0].node;

        instance.set_property("scale", 0.3).unwrap();

        let after = snapshot(&instance);
        assert_eq!(
            instance.graph().node(noise).unwrap().property("scale"),
            Some(PropertyValue::Double(0.3))
        );
        for (id, operation) in &after {
            if *id != noise {
                assert_eq!(Some(operation), before.get(id));
            }
        }
    }

    #[test]
    fn test_targets_receive_clamped_value() {
        let mut instance = registry().instantiate("gegl:sparkle").unwrap();
        let cases = [
            ("opacity", PropertyValue::Double(3.0), PropertyValue::Double(1.5)),
            ("opacitymeter", PropertyValue::Double(-2.0), PropertyValue::Double(0.0)),
            ("shape", PropertyValue::Double(2.5), PropertyValue::Double(2.0)),
            ("scale", PropertyValue::Int(4), PropertyValue::Double(1.0)),
            ("x", PropertyValue::Double(300.0), PropertyValue::Double(300.0)),
        ];
        for (name, value, clamped) in cases {
            let stored = instance.set_property(name, value).unwrap();
            assert_eq!(stored, clamped, "{name}");
            assert_eq!(instance.property(name), Some(&clamped));
            assert_eq!(target_value(&instance, name), clamped, "{name}");
        }
    }

    #[test]
    fn test_iteration_boundaries() {
        let mut instance = registry().instantiate("gegl:sparkle").unwrap();
        for (value, expected) in [(20, 20), (21, 20), (0, 1), (1, 1)] {
            instance.set_property("iterations", value).unwrap();
            assert_eq!(target_value(&instance, "iterations"), PropertyValue::Int(expected));
        }
    }

    #[test]
    fn test_double_boundaries() {
        let mut instance = registry().instantiate("gegl:sparkle").unwrap();
        let cases = [
            ("opacity", 1.5, 1.5),
            ("opacity", 0.0, 0.0),
            ("opacity", 1.6, 1.5),
            ("shape", 1.0, 1.0),
            ("shape", 2.0, 2.0),
            ("shape", 0.9, 1.0),
            ("scale", 1.0, 1.0),
            ("opacitymeter", 6.0, 6.0),
            ("opacitymeter", 7.0, 6.0),
        ];
        for (name, value, expected) in cases {
            let stored = instance.set_property(name, value).unwrap();
            assert_eq!(stored, PropertyValue::Double(expected), "{name}={value}");
            assert_eq!(target_value(&instance, name), PropertyValue::Double(expected), "{name}={value}");
        }
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut instance = registry().instantiate("lb:sparkle2").unwrap();
        instance.set_property("seed", Seed(7)).unwrap();
        instance.set_property("color", Color::hex(0x3366ff)).unwrap();
        let once = snapshot(&instance);
        instance.set_property("seed", Seed(7)).unwrap();
        instance.set_property("color", Color::hex(0x3366ff)).unwrap();
        assert_eq!(snapshot(&instance), once);
    }

    #[test]
    fn test_rejected_writes_leave_instance_unchanged() {
        let mut instance = registry().instantiate("gegl:sparkle").unwrap();
        let before = snapshot(&instance);
        assert!(instance.set_property("sparkliness", 1.0).is_err());
        assert!(instance.set_property("color", "#12345").is_err());
        assert!(instance.set_property("scale", Color::WHITE).is_err());
        assert_eq!(snapshot(&instance), before);
        assert_eq!(instance.property("color"), Some(&PropertyValue::Color(Color::WHITE)));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut instance = registry().instantiate("gegl:sparkle").unwrap();
        let defaults = snapshot(&instance);
        instance.set_property("upload", "stars.png").unwrap();
        instance.set_property("colorshadow", "#000000").unwrap();
        assert_ne!(snapshot(&instance), defaults);
        instance.reset().unwrap();
        assert_eq!(snapshot(&instance), defaults);
    }

    #[test]
    fn test_sparkle_topology() {
        let instance = registry().instantiate("gegl:sparkle").unwrap();
        let graph = instance.graph();
        let kinds: Vec<OperationKind> = {
            let mut kinds = Vec::new();
            let mut current = graph.input_proxy();
            while let Some(next) = graph.consumers(current).find(|c| c.to_socket == INPUT) {
                current = next.to_node;
                kinds.push(graph.node(current).unwrap().kind());
            }
            kinds
        };
        assert_eq!(
            kinds,
            vec![
                OperationKind::ColorFill,
                OperationKind::LayerMode,
                OperationKind::LayerMode,
                OperationKind::ColorOverlay,
                OperationKind::DropShadow,
                OperationKind::Opacity,
                OperationKind::SrcAtop,
                OperationKind::Nop,
            ]
        );

        let color2 = graph.node_by_name("color2").unwrap();
        let head = graph.producer(color2.id, INPUT).unwrap();
        assert_eq!(head.from_node, graph.input_proxy());

        let divide = graph.node_by_name("divide").unwrap();
        let aux = graph.producer(divide.id, AUX).unwrap();
        assert_eq!(graph.node(aux.from_node).unwrap().kind(), OperationKind::CellNoise);
    }

    #[test]
    fn test_sparkle2_replace_wraps_star_field() {
        let instance = registry().instantiate("lb:sparkle2").unwrap();
        let graph = instance.graph();
        let by_name = |name: &str| graph.node_by_name(name).unwrap().id;
        let replace = by_name("replace");

        assert_eq!(graph.producer(replace, INPUT).map(|c| c.from_node), Some(by_name("id1")));
        assert_eq!(graph.producer(replace, AUX).map(|c| c.from_node), Some(by_name("normal")));
        let downstream: Vec<NodeId> = graph.consumers(replace).map(|c| c.to_node).collect();
        assert_eq!(downstream.len(), 1);
        assert_eq!(graph.node(downstream[0]).unwrap().kind(), OperationKind::RgbClip);

        // The star field is only reachable through `aux`
        let normal = by_name("normal");
        assert_eq!(graph.consumers(normal).count(), 1);
        assert_eq!(graph.producer(normal, AUX).map(|c| c.from_node), Some(by_name("opacity")));
        assert_eq!(graph.producer(by_name("divide"), INPUT).map(|c| c.from_node), Some(by_name("idref")));
        assert!(graph.is_reachable(by_name("cellnoise"), replace));
    }

    #[test]
    fn test_sparkle2_redirects() {
        let mut instance = registry().instantiate("lb:sparkle2").unwrap();
        instance.set_property("masteropacity", 0.07).unwrap();
        let opacity = instance.graph().node_by_name("opacity").unwrap();
        assert_eq!(opacity.property("value"), Some(PropertyValue::Double(0.07)));

        let fix = instance.graph().node_by_name("fix").unwrap();
        assert_eq!(fix.property("radius"), Some(PropertyValue::Int(0)));
        assert_eq!(fix.property("abyss-policy"), Some(PropertyValue::Enum("none".to_string())));
    }
}
