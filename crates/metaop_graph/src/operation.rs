// SPDX-License-Identifier: MIT OR Apache-2.0
//! Catalog of primitive operations.
//!
//! Every primitive is a variant of [`Operation`] carrying its own typed
//! property struct. The set is closed: identifiers that are not listed here
//! are rejected when a node is created or a graph string is parsed, never at
//! render time.
//!
//! Property access by name goes through [`Operation::get`] and
//! [`Operation::set`], which perform the type check for the target field.

use crate::socket::Socket;
use crate::value::{
    Color, FilePath, PropertyError, PropertyKind, PropertyType, PropertyValue, Seed, ValueError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares an enumerated property type addressed by nick or numeric code.
macro_rules! enum_property {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = ($code:literal, $nick:literal), )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $name {
            /// All values, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            /// Textual nick
            pub fn nick(self) -> &'static str {
                match self {
                    $($name::$variant => $nick,)*
                }
            }

            /// Numeric code used by the host
            pub fn code(self) -> i64 {
                match self {
                    $($name::$variant => $code,)*
                }
            }

            /// Look up by nick
            pub fn from_nick(nick: &str) -> Option<Self> {
                match nick {
                    $($nick => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// Look up by numeric code
            pub fn from_code(code: i64) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)*
                    _ => None,
                }
            }

            /// Nicks of all values
            pub fn nicks() -> Vec<String> {
                Self::ALL.iter().map(|v| v.nick().to_string()).collect()
            }
        }

        impl PropertyType for $name {
            const KIND: PropertyKind = PropertyKind::Enum;

            fn from_value(value: &PropertyValue) -> Result<Self, ValueError> {
                let found = match value {
                    PropertyValue::Enum(nick) | PropertyValue::String(nick) => Self::from_nick(nick),
                    PropertyValue::Int(code) => Self::from_code(*code),
                    other => {
                        return Err(ValueError::Mismatch {
                            expected: PropertyKind::Enum,
                            found: other.kind(),
                        })
                    }
                };
                found.ok_or_else(|| ValueError::OutOfDomain {
                    value: value.to_string(),
                    domain: Self::nicks(),
                })
            }

            fn to_value(&self) -> PropertyValue {
                PropertyValue::Enum(self.nick().to_string())
            }
        }

        impl From<$name> for PropertyValue {
            fn from(value: $name) -> Self {
                value.to_value()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.nick())
            }
        }
    };
}

enum_property! {
    /// Blend mode of a `layer-mode` composer, numbered like GIMP's layer modes
    pub enum BlendMode {
        /// Overlay
        Overlay = (23, "overlay"),
        /// Normal
        Normal = (28, "normal"),
        /// Behind
        Behind = (29, "behind"),
        /// Multiply
        Multiply = (30, "multiply"),
        /// Screen
        Screen = (31, "screen"),
        /// Difference
        Difference = (32, "difference"),
        /// Addition
        Addition = (33, "addition"),
        /// Subtract
        Subtract = (34, "subtract"),
        /// Darken only
        DarkenOnly = (35, "darken-only"),
        /// Lighten only
        LightenOnly = (36, "lighten-only"),
        /// HSV hue
        HsvHue = (37, "hsv-hue"),
        /// HSV saturation
        HsvSaturation = (38, "hsv-saturation"),
        /// HSL color
        HslColor = (39, "hsl-color"),
        /// HSV value
        HsvValue = (40, "hsv-value"),
        /// Divide
        Divide = (41, "divide"),
        /// Dodge
        Dodge = (42, "dodge"),
        /// Burn
        Burn = (43, "burn"),
        /// Hard light
        Hardlight = (44, "hardlight"),
        /// Soft light
        Softlight = (45, "softlight"),
        /// Grain extract
        GrainExtract = (46, "grain-extract"),
        /// Grain merge
        GrainMerge = (47, "grain-merge"),
        /// Vivid light
        VividLight = (48, "vivid-light"),
        /// Pin light
        PinLight = (49, "pin-light"),
        /// Linear light
        LinearLight = (50, "linear-light"),
        /// Hard mix
        HardMix = (51, "hard-mix"),
        /// Exclusion
        Exclusion = (52, "exclusion"),
        /// Linear burn
        LinearBurn = (53, "linear-burn"),
        /// Luma darken only
        LumaDarkenOnly = (54, "luma-darken-only"),
        /// Luma lighten only
        LumaLightenOnly = (55, "luma-lighten-only"),
        /// Luminance
        Luminance = (56, "luminance"),
        /// Color erase
        ColorErase = (57, "color-erase"),
        /// Erase
        Erase = (58, "erase"),
        /// Merge
        Merge = (59, "merge"),
        /// Split
        Split = (60, "split"),
    }
}

enum_property! {
    /// Color space a composer blends in
    pub enum BlendSpace {
        /// Chosen by the mode
        Auto = (0, "auto"),
        /// Linear RGB
        RgbLinear = (1, "rgb-linear"),
        /// Perceptual RGB
        RgbPerceptual = (2, "rgb-perceptual"),
        /// CIE Lab
        Lab = (3, "lab"),
    }
}

enum_property! {
    /// How samples outside the input extent are produced
    pub enum AbyssPolicy {
        /// Transparent
        None = (0, "none"),
        /// Repeat the edge pixel
        Clamp = (1, "clamp"),
        /// Tile the input
        Loop = (2, "loop"),
        /// Opaque black
        Black = (3, "black"),
        /// Opaque white
        White = (4, "white"),
    }
}

enum_property! {
    /// Metric of the distance transform
    pub enum DistanceMetric {
        /// Euclidean
        Euclidean = (0, "euclidean"),
        /// Manhattan
        Manhattan = (1, "manhattan"),
        /// Chebyshev
        Chebyshev = (2, "chebyshev"),
    }
}

/// Declares the primitive catalog.
///
/// Each entry produces a property struct of the same name, a variant of
/// [`Operation`] and a variant of [`OperationKind`].
macro_rules! operations {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident($id:literal $(, $alias:literal)*) [$($socket:expr),*] {
                $( $(#[$fmeta:meta])* $field:ident: $ty:ty = $default:expr => $pname:literal $(| $palias:literal)*, )*
            }
        )*
    ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
            #[serde(default)]
            pub struct $variant {
                $( $(#[$fmeta])* pub $field: $ty, )*
            }

            impl Default for $variant {
                fn default() -> Self {
                    Self {
                        $( $field: $default, )*
                    }
                }
            }

            impl $variant {
                /// Canonical property names, in declaration order
                pub const PROPERTIES: &'static [&'static str] = &[$($pname),*];

                fn get(&self, name: &str) -> Option<PropertyValue> {
                    match name {
                        $( $pname $(| $palias)* => Some(PropertyType::to_value(&self.$field)), )*
                        _ => None,
                    }
                }

                fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), PropertyError> {
                    let _ = value;
                    match name {
                        $(
                            $pname $(| $palias)* => {
                                self.$field = <$ty as PropertyType>::from_value(value).map_err(|reason| {
                                    PropertyError::InvalidValue {
                                        property: $pname.to_string(),
                                        reason,
                                    }
                                })?;
                                Ok(())
                            }
                        )*
                        _ => Err(PropertyError::UnknownProperty {
                            owner: $id.to_string(),
                            property: name.to_string(),
                        }),
                    }
                }

                fn kind_of(name: &str) -> Option<PropertyKind> {
                    match name {
                        $( $pname $(| $palias)* => Some(<$ty as PropertyType>::KIND), )*
                        _ => None,
                    }
                }

                fn canonical(name: &str) -> Option<&'static str> {
                    match name {
                        $( $pname $(| $palias)* => Some($pname), )*
                        _ => None,
                    }
                }
            }
        )*

        /// A primitive operation together with its property values
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Operation {
            $( $(#[$meta])* $variant($variant), )*
        }

        /// The type of a primitive operation
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum OperationKind {
            $( $(#[$meta])* $variant, )*
        }

        impl OperationKind {
            /// Every primitive in the catalog
            pub const ALL: &'static [OperationKind] = &[$(OperationKind::$variant),*];

            /// Canonical identifier
            pub fn identifier(self) -> &'static str {
                match self {
                    $( Self::$variant => $id, )*
                }
            }

            /// Resolve an identifier or alias; a leading `gegl:` namespace is ignored
            pub fn from_identifier(identifier: &str) -> Option<Self> {
                let identifier = identifier.strip_prefix("gegl:").unwrap_or(identifier);
                match identifier {
                    $( $id $(| $alias)* => Some(Self::$variant), )*
                    _ => None,
                }
            }

            /// Sockets declared by this operation type
            pub fn sockets(self) -> &'static [Socket] {
                match self {
                    $(
                        Self::$variant => {
                            const SOCKETS: &[Socket] = &[$($socket),*];
                            SOCKETS
                        }
                    )*
                }
            }

            /// Canonical property names
            pub fn property_names(self) -> &'static [&'static str] {
                match self {
                    $( Self::$variant => $variant::PROPERTIES, )*
                }
            }

            /// Kind of a property, accepting aliases
            pub fn property_kind(self, name: &str) -> Option<PropertyKind> {
                match self {
                    $( Self::$variant => $variant::kind_of(name), )*
                }
            }

            /// Canonical name for a property or one of its aliases
            pub fn canonical_property(self, name: &str) -> Option<&'static str> {
                match self {
                    $( Self::$variant => $variant::canonical(name), )*
                }
            }

            /// A fresh operation of this type with default properties
            pub fn default_operation(self) -> Operation {
                match self {
                    $( Self::$variant => Operation::$variant($variant::default()), )*
                }
            }
        }

        impl Operation {
            /// Type of this operation
            pub fn kind(&self) -> OperationKind {
                match self {
                    $( Self::$variant(_) => OperationKind::$variant, )*
                }
            }

            /// Read a property by name or alias
            pub fn get(&self, name: &str) -> Option<PropertyValue> {
                match self {
                    $( Self::$variant(props) => props.get(name), )*
                }
            }

            /// Write a property by name or alias, checking its type
            pub fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), PropertyError> {
                match self {
                    $( Self::$variant(props) => props.set(name, value), )*
                }
            }
        }
    };
}

operations! {
    /// Pass-through; also used for graph proxies and `id`/`ref` anchors
    Nop("nop") [Socket::INPUT, Socket::OUTPUT] {}

    /// Solid color generator; a connected input is ignored
    ColorFill("color") [Socket::OPTIONAL_INPUT, Socket::OUTPUT] {
        value: Color = Color::BLACK => "value",
    }

    /// Paint a color over the input
    ColorOverlay("color-overlay", "overlay") [Socket::INPUT, Socket::OUTPUT] {
        value: Color = Color::TRANSPARENT => "value" | "color",
    }

    /// Blend-mode composer
    LayerMode("layer-mode", "gimp:layer-mode") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {
        layer_mode: BlendMode = BlendMode::Normal => "layer-mode",
        blend_space: BlendSpace = BlendSpace::Auto => "blend-space",
        opacity: f64 = 1.0 => "opacity",
    }

    /// Divide composer
    Divide("divide") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {}

    /// Scale alpha, optionally masked by `aux`
    Opacity("opacity") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {
        value: f64 = 1.0 => "value",
    }

    /// Porter-Duff over
    Over("over") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {}

    /// Porter-Duff source-atop
    SrcAtop("src-atop") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {}

    /// Replace the input with `aux`
    Src("src", "replace") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {}

    /// Image file loaded by the host and composited over the input
    Layer("layer") [Socket::OPTIONAL_INPUT, Socket::OUTPUT] {
        opacity: f64 = 1.0 => "opacity",
        x: f64 = 0.0 => "x",
        y: f64 = 0.0 => "y",
        scale: f64 = 1.0 => "scale",
        src: FilePath = FilePath::default() => "src",
    }

    /// Cell noise generator
    CellNoise("cell-noise") [Socket::OUTPUT] {
        scale: f64 = 1.0 => "scale",
        shape: f64 = 2.0 => "shape",
        rank: i64 = 1 => "rank",
        iterations: i64 = 1 => "iterations",
        seed: Seed = Seed(0) => "seed",
        width: i64 = 1024 => "width",
        height: i64 = 768 => "height",
    }

    /// Drop shadow
    DropShadow("dropshadow", "drop-shadow") [Socket::INPUT, Socket::OUTPUT] {
        x: f64 = 20.0 => "x",
        y: f64 = 20.0 => "y",
        radius: f64 = 10.0 => "radius",
        grow_radius: f64 = 0.0 => "grow-radius",
        color: Color = Color::BLACK => "color",
        opacity: f64 = 0.5 => "opacity",
    }

    /// Crop to a rectangle, or to the extent of `aux`
    Crop("crop") [Socket::INPUT, Socket::AUX, Socket::OUTPUT] {
        x: f64 = 0.0 => "x",
        y: f64 = 0.0 => "y",
        width: f64 = 0.0 => "width",
        height: f64 = 0.0 => "height",
    }

    /// Median blur
    MedianBlur("median-blur") [Socket::INPUT, Socket::OUTPUT] {
        radius: i64 = 3 => "radius",
        percentile: f64 = 50.0 => "percentile",
        alpha_percentile: f64 = 50.0 => "alpha-percentile",
        abyss_policy: AbyssPolicy = AbyssPolicy::Clamp => "abyss-policy",
    }

    /// Distance transform
    DistanceTransform("distance-transform") [Socket::INPUT, Socket::OUTPUT] {
        metric: DistanceMetric = DistanceMetric::Euclidean => "metric",
        threshold_lo: f64 = 0.0001 => "threshold-lo",
        threshold_hi: f64 = 1.0 => "threshold-hi",
        averaging: i64 = 0 => "averaging",
    }

    /// Make a color transparent
    ColorToAlpha("color-to-alpha") [Socket::INPUT, Socket::OUTPUT] {
        color: Color = Color::WHITE => "color",
        transparency_threshold: f64 = 0.0 => "transparency-threshold",
        opacity_threshold: f64 = 1.0 => "opacity-threshold",
    }

    /// Clip RGB components
    RgbClip("rgb-clip") [Socket::INPUT, Socket::OUTPUT] {
        low_limit: f64 = 0.0 => "low-limit",
        high_limit: f64 = 1.0 => "high-limit",
    }

    /// Gaussian blur
    GaussianBlur("gaussian-blur", "blur") [Socket::INPUT, Socket::OUTPUT] {
        radius: f64 = 1.5 => "radius",
        abyss_policy: AbyssPolicy = AbyssPolicy::Clamp => "abyss-policy",
    }
}

impl OperationKind {
    /// Look up a declared socket by name
    pub fn socket(self, name: &str) -> Option<&'static Socket> {
        self.sockets().iter().find(|s| s.name == name)
    }

    /// Whether the operation produces output without a primary input
    pub fn is_source(self) -> bool {
        !self.sockets().iter().any(|s| s.is_input())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl Operation {
    /// All canonical properties with their current values
    pub fn properties(&self) -> Vec<(&'static str, PropertyValue)> {
        self.kind()
            .property_names()
            .iter()
            .filter_map(|name| self.get(name).map(|value| (*name, value)))
            .collect()
    }

    /// Properties whose value differs from the operation's default
    pub fn changed_properties(&self) -> Vec<(&'static str, PropertyValue)> {
        let defaults = self.kind().default_operation();
        self.properties()
            .into_iter()
            .filter(|(name, value)| defaults.get(name).as_ref() != Some(value))
            .collect()
    }
}

impl From<OperationKind> for Operation {
    fn from(kind: OperationKind) -> Self {
        kind.default_operation()
    }
}
