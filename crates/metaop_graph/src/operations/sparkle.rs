// SPDX-License-Identifier: MIT OR Apache-2.0
//! `gegl:sparkle`: cell noise divided into the image, with an optional
//! shadow clone and a top overlay image.

use crate::builder::{BuildError, GraphBuilder, NodeSpec, Recipe};
use crate::operation::{BlendMode, BlendSpace, OperationKind};
use crate::registry::MetaOperation;
use crate::schema::PropertySchema;
use crate::value::Color;

const PINK: Color = Color::hex(0xff7aff);
const SHADOW_BLUE: Color = Color::hex(0x74e3ff);

/// Template of `gegl:sparkle`
pub fn meta_operation() -> MetaOperation {
    MetaOperation {
        name: "gegl:sparkle".to_string(),
        title: "Sparkle".to_string(),
        description: "GEGL sparkle effect - works best on 16 bit integer canvases and bright colors"
            .to_string(),
        categories: vec!["Artistic".to_string()],
        reference_hash: Some("bkagspakzaz10aavx45421xc255001b2ac".to_string()),
        menu_path: None,
        menu_label: None,
        properties: vec![
            PropertySchema::color("color3", PINK)
                .label("Color 3")
                .description("The color to paint over the input")
                .ui_meta("role", "output-extent"),
            PropertySchema::color("color2", PINK)
                .label("Color 2")
                .description("The color to paint over the input")
                .ui_meta("role", "output-extent"),
            PropertySchema::color("color", Color::WHITE)
                .label("Color")
                .description("The color to paint over the input"),
            PropertySchema::color("colorshadow", SHADOW_BLUE)
                .label("Shadow Color")
                .description("The shadow's color"),
            PropertySchema::double("x", -126.0)
                .label("Shadow Clone X")
                .description("Horizontal shadow offset")
                .ui_range(-126.0, 126.0)
                .ui_steps(1.0, 10.0)
                .ui_meta("unit", "pixel-distance")
                .ui_meta("axis", "x"),
            PropertySchema::double("y", -8.0)
                .label("Shadow Clone Y")
                .description("Vertical shadow offset")
                .ui_range(-126.0, 126.0)
                .ui_steps(1.0, 10.0)
                .ui_meta("unit", "pixel-distance")
                .ui_meta("axis", "y"),
            PropertySchema::double("opacity", 0.0)
                .label("Shadow Clone Opacity")
                .description("Slide above zero to enable the shadow clone")
                .value_range(0.0, 1.5)
                .ui_steps(0.1, 0.1),
            PropertySchema::file_path("upload", "")
                .label("Top Image Overlay")
                .description("Source image file path (png, jpg, raw, svg, bmp, tif, ...)")
                .ui_meta("role", "output-extent"),
            PropertySchema::double("scale", 0.14)
                .label("Scale")
                .description("The scale of the noise function; lower is larger")
                .value_range(0.0, 1.0),
            PropertySchema::double("shape", 1.0)
                .label("Shape")
                .description("Interpolate between Manhattan and Euclidean distance")
                .value_range(1.0, 2.0),
            PropertySchema::int("iterations", 1)
                .label("Iterations")
                .description("The number of noise octaves")
                .value_range(1.0, 20.0)
                .ui_meta("role", "output-extent"),
            PropertySchema::seed("seed", 0)
                .label("Random seed")
                .description("The random seed for the noise function"),
            PropertySchema::double("opacitymeter", 6.0)
                .label("Above 100% Opacity Meter")
                .value_range(0.0, 6.0)
                .ui_steps(1.0, 6.0),
        ],
        build,
    }
}

fn build(builder: &mut GraphBuilder) -> Result<(), BuildError> {
    builder.main_chain(&Recipe::chain([
        NodeSpec::new(OperationKind::ColorFill).named("color2").into(),
        NodeSpec::new(OperationKind::LayerMode)
            .named("divide")
            .with("layer-mode", BlendMode::Divide)
            .with("blend-space", BlendSpace::RgbLinear)
            .with("opacity", 0.03)
            .aux(NodeSpec::new(OperationKind::CellNoise).named("cellnoise")),
        NodeSpec::new(OperationKind::LayerMode)
            .named("colorerase")
            .with("layer-mode", BlendMode::ColorErase)
            .with("blend-space", BlendSpace::RgbLinear)
            .aux(NodeSpec::new(OperationKind::ColorFill).named("color3")),
        NodeSpec::new(OperationKind::ColorOverlay).named("color").into(),
        NodeSpec::new(OperationKind::DropShadow).named("ds").into(),
        NodeSpec::new(OperationKind::Opacity).named("opacity").into(),
        NodeSpec::new(OperationKind::SrcAtop)
            .named("ontop")
            .aux(NodeSpec::new(OperationKind::Layer).named("layer")),
    ]))?;

    builder.redirect("color", "color", "value");
    builder.redirect("color3", "color3", "value");
    builder.redirect("upload", "layer", "src");
    builder.redirect("opacity", "ds", "opacity");
    builder.redirect("x", "ds", "x");
    builder.redirect("y", "ds", "y");
    builder.redirect("colorshadow", "ds", "color");
    builder.redirect("color2", "color2", "value");
    builder.redirect("scale", "cellnoise", "scale");
    builder.redirect("shape", "cellnoise", "shape");
    builder.redirect("seed", "cellnoise", "seed");
    builder.redirect("iterations", "cellnoise", "iterations");
    builder.redirect("opacitymeter", "opacity", "value");
    Ok(())
}
