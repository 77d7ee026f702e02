// SPDX-License-Identifier: MIT OR Apache-2.0
//! `lb:sparkle2`: the sparkle field rebuilt from portable operations only.
//!
//! The star field is rendered inside the `aux` of a replace node: a distance
//! transform of the input is tinted, then blended over cell noise divided
//! into itself. The result is cleaned up by a short embedded chain.

use crate::builder::{BuildError, GraphBuilder, NodeSpec, Recipe};
use crate::operation::{AbyssPolicy, OperationKind};
use crate::registry::MetaOperation;
use crate::schema::PropertySchema;
use crate::value::Color;

/// Clean-up applied to the replaced content
pub const EMBEDDED_GRAPH: &str =
    " rgb-clip  color-to-alpha color=#ff7aff   color-overlay value=#ffffff ";

/// Template of `lb:sparkle2`
pub fn meta_operation() -> MetaOperation {
    MetaOperation {
        name: "lb:sparkle2".to_string(),
        title: "Sparkle (revision)".to_string(),
        description: "Render Sparkles on Canvas - works best on 16 bit integer canvases and bright colors"
            .to_string(),
        categories: Vec::new(),
        reference_hash: Some("bspgsaakzaz55aavsp54sp0xc25500f2ec".to_string()),
        menu_path: Some("<Image>/Filters/Render/Fun".to_string()),
        menu_label: Some("Sparkle Effect 2...".to_string()),
        properties: vec![
            PropertySchema::color("color", Color::WHITE)
                .label("Color")
                .description("The main sparkle's color"),
            PropertySchema::color("colorshadow", Color::hex(0x74e3ff))
                .label("Shadow Color")
                .description("The main sparkle's optional shadow color"),
            PropertySchema::double("opacity", 0.0)
                .label("Shadow Clone Opacity")
                .description("A drop shadow that reads as a second sparkle field")
                .value_range(0.0, 1.5)
                .ui_steps(0.1, 0.1),
            PropertySchema::double("scale", 0.24)
                .label("Scale")
                .description("The scale of the cell noise powering the sparkle; lower is larger")
                .ui_range(0.0, 1.0),
            PropertySchema::double("shape", 1.0)
                .label("Shape")
                .description("Shape of the sparkle, from a diamond to a circle")
                .value_range(1.0, 2.0),
            PropertySchema::seed("seed", 0)
                .label("Random seed")
                .description("The random seed for the noise function"),
            PropertySchema::double("masteropacity", 0.04)
                .label("Hyper Opacity")
                .description("Opacity intensity of the stars")
                .ui_range(0.03, 0.09),
        ],
        build,
    }
}

fn build(builder: &mut GraphBuilder) -> Result<(), BuildError> {
    let stars = Recipe::chain([
        Recipe::reference("id1"),
        NodeSpec::new(OperationKind::DistanceTransform).named("dt").into(),
        NodeSpec::new(OperationKind::ColorOverlay)
            .named("tint")
            .with("value", Color::hex(0xff7aff))
            .into(),
        NodeSpec::new(OperationKind::Nop).named("idref").into(),
        NodeSpec::new(OperationKind::Over).named("normal").aux(Recipe::chain([
            Recipe::reference("idref"),
            NodeSpec::new(OperationKind::Divide)
                .named("divide")
                .aux(NodeSpec::new(OperationKind::CellNoise).named("cellnoise").with("iterations", 1)),
            NodeSpec::new(OperationKind::Opacity).named("opacity").into(),
        ])),
    ]);

    builder.main_chain(&Recipe::chain([
        NodeSpec::new(OperationKind::Nop).named("id1").into(),
        NodeSpec::new(OperationKind::Src).named("replace").wrap(stars),
        Recipe::embedded(EMBEDDED_GRAPH),
        NodeSpec::new(OperationKind::ColorOverlay).named("colorchange").into(),
        NodeSpec::new(OperationKind::MedianBlur)
            .named("fix")
            .with("radius", 0)
            .with("abyss-policy", AbyssPolicy::None)
            .into(),
        NodeSpec::new(OperationKind::DropShadow).named("ds").into(),
    ]))?;

    builder.redirect("masteropacity", "opacity", "value");
    builder.redirect("color", "colorchange", "value");
    builder.redirect("opacity", "ds", "opacity");
    builder.redirect("colorshadow", "ds", "color");
    builder.redirect("scale", "cellnoise", "scale");
    builder.redirect("shape", "cellnoise", "shape");
    builder.redirect("seed", "cellnoise", "seed");
    Ok(())
}
