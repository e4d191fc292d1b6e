use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use three_d::Srgba;

use crate::config::{CameraRig, HudConfig, SceneConfig};
use crate::geometry::Shape;
use crate::log; // macro import
use crate::motion::{Axis, Drift, ElementState, Hover, Motion, Ripple, Spin, Wave};
use crate::particles::{CloudShape, ParticleCloud};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb::hex(0xffffff);

    pub const fn hex(v: u32) -> Self {
        Rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    pub fn to_srgba(self, opacity: f32) -> Srgba {
        Srgba {
            r: self.0,
            g: self.1,
            b: self.2,
            a: (opacity.clamp(0.0, 1.0) * 255.0).round() as u8,
        }
    }

    /// Converts hue, saturation and lightness, each in `[0, 1]`.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let h = hue.rem_euclid(1.0) * 6.0;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let channel = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgb(channel(r), channel(g), channel(b))
    }

    /// Channels scaled to `[0, 1]`, as clear colors expect.
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        ]
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub color: Rgb,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Option<(Rgb, f32)>,
    /// Set for transparent surfaces.
    pub opacity: Option<f32>,
}

impl Surface {
    pub fn new(color: u32) -> Self {
        Self {
            color: Rgb::hex(color),
            roughness: 1.0,
            metalness: 0.0,
            emissive: None,
            opacity: None,
        }
    }

    pub fn roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }

    pub fn metalness(mut self, metalness: f32) -> Self {
        self.metalness = metalness;
        self
    }

    pub fn emissive(mut self, color: u32, intensity: f32) -> Self {
        self.emissive = Some((Rgb::hex(color), intensity));
        self
    }

    pub fn transparent(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }
}


/// Per-point coloring of a cloud.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Tint {
    /// Every point takes the cloud's color.
    Uniform,
    /// Point `i` of `n` gets hue `i / n` at a fixed saturation and lightness.
    Spectrum { saturation: f32, lightness: f32 },
}

impl Tint {
    pub fn color(&self, base: Rgb, index: usize, count: usize) -> Rgb {
        match *self {
            Tint::Uniform => base,
            Tint::Spectrum {
                saturation,
                lightness,
            } => Rgb::from_hsl(index as f32 / count.max(1) as f32, saturation, lightness),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Visual {
    Mesh {
        shape: Shape,
        surface: Surface,
    },
    /// Point sprites sharing the node's transform.
    Points {
        cloud: ParticleCloud,
        size: f32,
        color: Rgb,
        opacity: f32,
        tint: Tint,
        /// Size multiplier per point. Empty means every point uses `size`.
        scales: Vec<f32>,
    },
    /// Screen-space text pinned to the node's world position.
    Label {
        text: String,
    },
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub visual: Option<Visual>,
    pub motions: Vec<Motion>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            visual: None,
            motions: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn mesh(name: impl Into<String>, shape: Shape, surface: Surface) -> Self {
        let mut node = Self::group(name);
        node.visual = Some(Visual::Mesh { shape, surface });
        node
    }

    pub fn points(
        name: impl Into<String>,
        cloud: ParticleCloud,
        size: f32,
        color: u32,
        opacity: f32,
    ) -> Self {
        let mut node = Self::group(name);
        node.visual = Some(Visual::Points {
            cloud,
            size,
            color: Rgb::hex(color),
            opacity,
            tint: Tint::Uniform,
            scales: Vec::new(),
        });
        node
    }

    /// Sets per-point color and size on a point-cloud node. Other nodes are unchanged.
    pub fn styled(mut self, point_tint: Tint, point_scales: Vec<f32>) -> Self {
        if let Some(Visual::Points { tint, scales, .. }) = &mut self.visual {
            *tint = point_tint;
            *scales = point_scales;
        }
        self
    }

    pub fn label(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::group(name);
        node.visual = Some(Visual::Label { text: text.into() });
        node
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = [x, y, z];
        self
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = [x, y, z];
        self
    }

    pub fn animated(mut self, motion: Motion) -> Self {
        self.motions.push(motion);
        self
    }

    pub fn with(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = SceneNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Local state before any motion is applied.
    pub fn base_state(&self) -> ElementState {
        let opacity = match &self.visual {
            Some(Visual::Mesh { surface, .. }) => surface.opacity.unwrap_or(1.0),
            Some(Visual::Points { opacity, .. }) => *opacity,
            _ => 1.0,
        };
        ElementState {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            opacity,
        }
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Pre-order list in which every parent precedes its children.
    pub fn flatten(self) -> Vec<FlatNode> {
        let mut nodes = Vec::with_capacity(self.node_count());
        flatten_into(self, None, &mut nodes);
        nodes
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode {
    pub name: String,
    pub parent: Option<usize>,
    pub base: ElementState,
    pub motions: Vec<Motion>,
    pub visual: Option<Visual>,
}

fn flatten_into(node: SceneNode, parent: Option<usize>, out: &mut Vec<FlatNode>) {
    let index = out.len();
    let base = node.base_state();
    out.push(FlatNode {
        name: node.name,
        parent,
        base,
        motions: node.motions,
        visual: node.visual,
    });
    for child in node.children {
        flatten_into(child, Some(index), out);
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSpec {
    pub color: Rgb,
    pub intensity: f32,
    pub position: [f32; 3],
}

/// Distance fog that thins out at `near` and hides everything past `far`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Linear fog amount at `distance` from the camera, in `[0, 1]`.
    pub fn factor(&self, distance: f32) -> f32 {
        if self.far <= self.near {
            return if distance >= self.far { 1.0 } else { 0.0 };
        }
        ((distance - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }

    /// Exponential density whose fog amount `1 - exp(-density * d)` matches
    /// the linear falloff halfway between `near` and `far`.
    pub fn density(&self) -> f32 {
        let mid = 0.5 * (self.near + self.far);
        if mid <= 0.0 {
            return 0.0;
        }
        -(1.0 - self.factor(mid)).ln() / mid
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub background: Rgb,
    pub fog: Fog,
    pub ambient: LightSpec,
    /// Shines from `position` toward the origin.
    pub sun: LightSpec,
    /// Shines from `position` toward the origin.
    pub spot: LightSpec,
    pub spot_angle: f32,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            background: Rgb::hex(0xa9d9ff),
            fog: Fog {
                color: Rgb::hex(0xa9d9ff),
                near: 6.0,
                far: 18.0,
            },
            ambient: LightSpec {
                color: Rgb::WHITE,
                intensity: 0.5,
                position: [0.0; 3],
            },
            sun: LightSpec {
                color: Rgb::hex(0xfce3bb),
                intensity: 1.1,
                position: [6.0, 8.0, 4.0],
            },
            spot: LightSpec {
                color: Rgb::hex(0xf0f6ff),
                intensity: 0.4,
                position: [-6.0, 5.0, 3.0],
            },
            spot_angle: 0.6,
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub root: SceneNode,
    pub environment: Environment,
    pub camera: CameraRig,
    pub hud: HudConfig,
}

impl Scene {
    /// Assembles the whole diorama. Particle clouds draw from `rng`.
    pub fn build<R: Rng>(config: &SceneConfig, rng: &mut R) -> Self {
        let counts = config.particles;
        let root = SceneNode::group("scene")
            .with(ground())
            .with(wolf())
            .with(log_house(config.hud.show_label))
            .with(wind_pulse(counts.wind, rng))
            .with(fireflies(counts.fireflies, rng))
            .with(starfield(counts.stars, rng));
        log!("Scene::build(): nodes={}, particles={}", root.node_count(), counts.total());

        Self {
            root,
            environment: Environment::default(),
            camera: config.camera,
            hud: config.hud.clone(),
        }
    }
}


fn sphere(radius: f32, segments: usize) -> Shape {
    Shape::Sphere {
        radius,
        width_segments: segments,
        height_segments: segments,
    }
}

fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, radial_segments: usize) -> Shape {
    Shape::Cylinder {
        radius_top,
        radius_bottom,
        height,
        radial_segments,
    }
}

fn cone(radius: f32, height: f32, radial_segments: usize) -> Shape {
    Shape::Cone {
        radius,
        height,
        radial_segments,
    }
}

fn cuboid(width: f32, height: f32, depth: f32) -> Shape {
    Shape::Box {
        width,
        height,
        depth,
    }
}


pub fn ground() -> SceneNode {
    SceneNode::group("ground")
        .with(
            SceneNode::mesh(
                "grass",
                Shape::Circle {
                    radius: 12.0,
                    segments: 64,
                },
                Surface::new(0x8ab370).roughness(0.9),
            )
            .at(0.0, -0.01, 0.0)
            .rotated(-PI / 2.0, 0.0, 0.0),
        )
        .with(
            SceneNode::mesh(
                "sand",
                Shape::Plane {
                    width: 40.0,
                    height: 20.0,
                },
                Surface::new(0xe3dfc8),
            )
            .at(0.0, 0.02, -4.0)
            .rotated(-PI / 2.0, 0.0, 0.0),
        )
}


pub fn wolf() -> SceneNode {
    let body = SceneNode::group("wolf-body")
        .with(
            SceneNode::mesh(
                "wolf-chest",
                Shape::Capsule {
                    radius: 0.4,
                    length: 0.9,
                    cap_segments: 6,
                    radial_segments: 12,
                },
                Surface::new(0x4d4d5c).metalness(0.15).roughness(0.6),
            )
            .at(0.0, 0.55, 0.0)
            .animated(Motion::Bob(Wave::new(0.55, 0.05, 3.0))),
        )
        .with(
            SceneNode::mesh("wolf-head", sphere(0.32, 32), Surface::new(0x5c556d).roughness(0.5))
                .at(0.0, 1.05, 0.25),
        )
        .with(
            SceneNode::mesh(
                "wolf-muzzle",
                cylinder(0.18, 0.26, 0.45, 24),
                Surface::new(0xd9d9df).roughness(0.2),
            )
            .at(0.0, 1.0, 0.6)
            .rotated(PI / 2.0, 0.0, 0.0)
            .animated(Motion::Pulse(Wave::new(1.0, 0.03, 4.0))),
        )
        .with(
            SceneNode::mesh("wolf-nose", cone(0.07, 0.14, 16), Surface::new(0x2f2f3b).roughness(0.4))
                .at(0.0, 1.32, 0.38),
        )
        .with_children([1.0f32, -1.0].map(|side| {
            SceneNode::mesh(
                if side > 0.0 { "wolf-ear-left" } else { "wolf-ear-right" },
                cone(0.12, 0.36, 18),
                Surface::new(0x3f3f50).roughness(0.45),
            )
            .at(0.16 * side, 1.22, 0.16)
            .rotated(0.0, 0.0, side * PI / 10.0)
        }));

    let legs = SceneNode::group("wolf-legs")
        .at(0.0, 0.16, -0.12)
        .with_children([("left", -0.22f32), ("right", 0.22)].map(|(side, x)| {
            SceneNode::mesh(
                format!("wolf-foreleg-{}", side),
                cylinder(0.07, 0.07, 0.7, 16),
                Surface::new(0x2e2e39).roughness(0.5),
            )
            .at(x, 0.0, -0.12)
            .rotated(PI / 2.0, 0.0, 0.0)
        }))
        .with_children([("left", -0.22f32), ("right", 0.22)].map(|(side, x)| {
            SceneNode::mesh(
                format!("wolf-leg-{}", side),
                cylinder(0.08, 0.06, 0.55, 16),
                Surface::new(0x2a2a38).roughness(0.6),
            )
            .at(x, -0.45, 0.0)
        }));

    let tail = SceneNode::group("wolf-tail")
        .at(0.0, 0.42, -0.55)
        .rotated(0.0, PI * 0.04, 0.0)
        .with(SceneNode::mesh(
            "wolf-tail-cone",
            cone(0.12, 0.5, 16),
            Surface::new(0x2c2c3a).roughness(0.6),
        ));

    let fangs = SceneNode::group("wolf-fangs")
        .at(0.0, 1.0, 0.52)
        .with_children([1.0f32, -1.0].map(|side| {
            SceneNode::mesh(
                if side > 0.0 { "wolf-fang-left" } else { "wolf-fang-right" },
                cuboid(0.08, 0.22, 0.08),
                Surface::new(0xf1f1f2).roughness(0.3),
            )
            .at(0.18 * side, 0.05, 0.08)
            .rotated(0.0, 0.0, side * PI / 14.0)
        }));

    let breath = SceneNode::mesh(
        "wolf-breath",
        Shape::Ring {
            inner_radius: 0.12,
            outer_radius: 0.2,
            segments: 24,
            theta_start: 0.0,
            theta_length: PI * 1.6,
        },
        Surface::new(0xffffff).emissive(0x9dd7ff, 0.4).transparent(0.55),
    )
    .at(0.0, 1.1, 0.55)
    .rotated(PI / 2.4, 0.0, 0.0);

    SceneNode::group("wolf")
        .at(-2.4, 0.0, 0.4)
        .rotated(0.0, PI * 0.18, 0.0)
        .with(body)
        .with(legs)
        .with(tail)
        .with(fangs)
        .with(breath)
}


/// Centers of the stacked logs: five layers of five, odd layers shifted half a log.
pub fn log_positions() -> Vec<[f32; 3]> {
    let mut positions = Vec::with_capacity(25);
    for layer in 0..5 {
        let y = 0.25 + layer as f32 * 0.18;
        let offset = if layer % 2 == 0 { 0.0 } else { 0.14 };
        for k in 0..5 {
            let x = -0.56 + k as f32 * 0.28;
            positions.push([x + offset, y, 0.0]);
        }
    }
    positions
}


pub fn log_house(show_label: bool) -> SceneNode {
    let logs = log_positions()
        .into_iter()
        .enumerate()
        .map(|(i, [x, y, z])| {
            SceneNode::mesh(
                format!("log-{}", i),
                cylinder(0.14, 0.14, 1.2, 12),
                Surface::new(0x8d5e2a).roughness(0.8).metalness(0.05),
            )
            .at(x, y, z)
        });

    SceneNode::group("log-house")
        .at(1.4, 0.35, -0.4)
        .rotated(0.0, -PI / 8.0, 0.0)
        .with_children(logs)
        .with(
            SceneNode::mesh(
                "roof-front",
                cuboid(1.8, 1.1, 0.15),
                Surface::new(0x5d2f10).roughness(0.8),
            )
            .at(0.0, 1.2, 0.0)
            .rotated(PI / 3.6, 0.0, 0.0),
        )
        .with(
            SceneNode::mesh(
                "roof-back",
                cuboid(1.8, 1.1, 0.15),
                Surface::new(0x67421d).roughness(0.8),
            )
            .at(0.0, 1.2, -0.8)
            .rotated(-PI / 3.6, 0.0, PI),
        )
        .with(
            SceneNode::mesh("floor", cuboid(1.4, 0.1, 1.0), Surface::new(0x7b4c1c).roughness(0.8))
                .at(0.0, 0.4, 0.0),
        )
        .with(
            SceneNode::mesh("door", cuboid(0.4, 0.5, 0.05), Surface::new(0x2d1a0b))
                .at(0.0, 0.95, 0.46),
        )
        .with(
            SceneNode::mesh(
                "window",
                cuboid(0.32, 0.32, 0.08),
                Surface::new(0x3f5d86).roughness(0.35).metalness(0.6),
            )
            .at(0.0, 0.9, 0.48),
        )
        .with(pig(show_label))
}


pub fn pig(show_label: bool) -> SceneNode {
    let pink = 0xf4a7b9;
    let light_pink = 0xf2b9c8;
    let eye = 0x3c2232;

    let mut pig = SceneNode::group("pig")
        .at(0.0, 0.82, 0.42)
        .with(
            SceneNode::mesh("pig-body", sphere(0.16, 24), Surface::new(pink).roughness(0.6))
                .animated(Motion::Bob(Wave::new(0.9, 0.02, 8.0))),
        )
        .with(
            SceneNode::mesh("pig-head", sphere(0.11, 24), Surface::new(light_pink).roughness(0.6))
                .at(0.0, 0.12, 0.12),
        )
        .with(
            SceneNode::mesh(
                "pig-snout",
                cylinder(0.05, 0.06, 0.08, 16),
                Surface::new(0xf097ab).roughness(0.5),
            )
            .at(0.0, 0.12, 0.23),
        )
        .with(SceneNode::mesh("pig-eye-left", sphere(0.015, 10), Surface::new(eye)).at(-0.05, 0.16, 0.2))
        .with(SceneNode::mesh("pig-eye-right", sphere(0.015, 10), Surface::new(eye)).at(0.05, 0.16, 0.2))
        .with(
            SceneNode::mesh(
                "pig-mouth",
                Shape::Torus {
                    radius: 0.045,
                    tube: 0.014,
                    radial_segments: 8,
                    tubular_segments: 16,
                },
                Surface::new(light_pink),
            )
            .at(0.0, 0.07, 0.16),
        )
        .with(
            SceneNode::mesh("pig-leg", cuboid(0.05, 0.24, 0.05), Surface::new(pink))
                .at(0.0, -0.11, 0.02),
        );

    if show_label {
        pig = pig.with(SceneNode::label("pig-label", "Eeeeek!").at(0.0, 0.12, 0.15));
    }
    pig
}


pub fn wind_pulse<R: Rng>(count: usize, rng: &mut R) -> SceneNode {
    const PERIOD: f32 = 2.5;

    let cloud = ParticleCloud::generate(
        CloudShape::Annulus {
            r_min: 0.12,
            r_max: 0.52,
            y_min: -0.14,
            y_max: 0.06,
        },
        count,
        rng,
    );

    let ring = SceneNode::mesh(
        "wind-ring",
        Shape::Torus {
            radius: 0.25,
            tube: 0.03,
            radial_segments: 32,
            tubular_segments: 64,
        },
        Surface::new(0xcfe8ff).emissive(0xa2d4ff, 1.0).transparent(0.55),
    )
    .rotated(PI / 2.0, 0.0, 0.0)
    .animated(Motion::Ripple(Ripple {
        period: PERIOD,
        rate: 1.1,
        opacity_start: 0.6,
        opacity_end: 0.0,
        axis_weights: [1.0, 1.0, 0.7],
    }))
    .animated(Motion::Drift(Drift {
        axis: Axis::Z,
        base: 0.5,
        rate: 1.3,
        range: 1.3 * PERIOD,
        period: Some(PERIOD),
    }));

    let particles = SceneNode::points("wind-particles", cloud, 0.03, 0xf5fbff, 0.65)
        .animated(Motion::Drift(Drift {
            axis: Axis::Z,
            base: 0.7,
            rate: 1.5,
            range: 2.0,
            period: Some(PERIOD),
        }))
        .animated(Motion::Spin(Spin {
            axis: Axis::Z,
            rate: 0.3,
        }));

    SceneNode::group("wind-pulse")
        .at(-1.9, 1.02, 0.8)
        .rotated(0.0, PI * 0.4, 0.0)
        .with(ring)
        .with(particles)
}


pub fn fireflies<R: Rng>(count: usize, rng: &mut R) -> SceneNode {
    let cloud = ParticleCloud::generate(
        CloudShape::Box {
            min: [-6.0, 0.5, -6.0],
            max: [6.0, 3.0, 6.0],
        },
        count,
        rng,
    );
    SceneNode::points("fireflies", cloud, 0.06, 0xffffff, 0.35).animated(Motion::Spin(Spin {
        axis: Axis::Y,
        rate: 0.02,
    }))
}


pub fn starfield<R: Rng>(count: usize, rng: &mut R) -> SceneNode {
    let cloud = ParticleCloud::generate(
        CloudShape::Shell {
            radius: 20.0,
            depth: 8.0,
        },
        count,
        rng,
    );
    let scales = (0..cloud.len())
        .map(|_| 0.5 + 0.5 * rng.gen::<f32>())
        .collect();
    SceneNode::points("stars", cloud, 0.08, 0xfff6e0, 1.0)
        .styled(
            Tint::Spectrum {
                saturation: 0.4,
                lightness: 0.9,
            },
            scales,
        )
        .animated(Motion::Hover(Hover {
            speed: 1.0,
            float_intensity: 1.8,
            rotation_intensity: 0.3,
        }))
}
