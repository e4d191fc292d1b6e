use num_format::{Locale, ToFormattedString};
use three_d::*;

use crate::config::{HudConfig, SceneConfig};
use crate::error::SceneError;
use crate::log; // macro import
use crate::motion::Clock;
use crate::scene::{Environment, Fog, FlatNode, Rgb, Scene, Tint, Visual};
use crate::stage::Stage;


const UP: Vec3 = Vec3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};


enum Drawable {
    Solid(Gm<Mesh, PhysicalMaterial>),
    Sprites(Gm<InstancedMesh, ColorMaterial>),
}

impl Drawable {
    fn build(context: &Context, node: &FlatNode) -> Option<Self> {
        match node.visual.as_ref()? {
            Visual::Mesh { shape, surface } => {
                let cpu_mesh = shape.build().to_cpu_mesh();
                let cpu_material = CpuMaterial {
                    albedo: surface.color.to_srgba(surface.opacity.unwrap_or(1.0)),
                    roughness: surface.roughness,
                    metallic: surface.metalness,
                    emissive: match surface.emissive {
                        Some((color, intensity)) => scaled(color, intensity).to_srgba(1.0),
                        None => Srgba::BLACK,
                    },
                    ..Default::default()
                };
                let material = if surface.opacity.is_some() {
                    PhysicalMaterial::new_transparent(context, &cpu_material)
                } else {
                    PhysicalMaterial::new_opaque(context, &cpu_material)
                };
                Some(Drawable::Solid(Gm::new(Mesh::new(context, &cpu_mesh), material)))
            }
            Visual::Points {
                cloud,
                size,
                color,
                opacity,
                tint,
                scales,
            } => {
                if cloud.is_empty() {
                    log!("Drawable::build(): WARNING: {} has no points.", node.name);
                    return None;
                }
                let radius = size * 0.5;
                let count = cloud.len();
                let colors = match tint {
                    Tint::Uniform => None,
                    Tint::Spectrum { .. } => Some(
                        (0..count)
                            .map(|i| tint.color(*color, i, count).to_srgba(1.0))
                            .collect(),
                    ),
                };
                let instances = Instances {
                    transformations: cloud
                        .points()
                        .enumerate()
                        .map(|(i, [x, y, z])| {
                            let scale = scales.get(i).copied().unwrap_or(1.0);
                            Mat4::from_translation(vec3(x, y, z)) * Mat4::from_scale(radius * scale)
                        })
                        .collect(),
                    colors,
                    ..Default::default()
                };
                let albedo = match tint {
                    Tint::Uniform => color.to_srgba(*opacity),
                    Tint::Spectrum { .. } => Rgb::WHITE.to_srgba(*opacity),
                };
                let material = ColorMaterial::new_transparent(
                    context,
                    &CpuMaterial {
                        albedo,
                        ..Default::default()
                    },
                );
                Some(Drawable::Sprites(Gm::new(
                    InstancedMesh::new(context, &instances, &CpuMesh::sphere(4)),
                    material,
                )))
            }
            Visual::Label { .. } => None,
        }
    }

    fn set_transformation(&mut self, transformation: Mat4) {
        match self {
            Drawable::Solid(gm) => gm.set_transformation(transformation),
            Drawable::Sprites(gm) => gm.set_transformation(transformation),
        }
    }

    fn set_opacity(&mut self, opacity: f32) {
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        match self {
            Drawable::Solid(gm) => gm.material.albedo.a = alpha,
            Drawable::Sprites(gm) => gm.material.color.a = alpha,
        }
    }

    fn object(&self) -> &dyn Object {
        match self {
            Drawable::Solid(gm) => gm,
            Drawable::Sprites(gm) => gm,
        }
    }
}


fn scaled(color: Rgb, intensity: f32) -> Rgb {
    let channel = |c: u8| (c as f32 * intensity).clamp(0.0, 255.0).round() as u8;
    Rgb(channel(color.0), channel(color.1), channel(color.2))
}


fn to_vec3(v: [f32; 3]) -> Vec3 {
    vec3(v[0], v[1], v[2])
}


struct Lights {
    ambient: AmbientLight,
    sun: DirectionalLight,
    spot: SpotLight,
}

impl Lights {
    fn new(context: &Context, environment: &Environment) -> Self {
        let sun_position = to_vec3(environment.sun.position);
        let spot_position = to_vec3(environment.spot.position);
        Self {
            ambient: AmbientLight::new(
                context,
                environment.ambient.intensity,
                environment.ambient.color.to_srgba(1.0),
            ),
            sun: DirectionalLight::new(
                context,
                environment.sun.intensity,
                environment.sun.color.to_srgba(1.0),
                &(-sun_position),
            ),
            spot: SpotLight::new(
                context,
                environment.spot.intensity,
                environment.spot.color.to_srgba(1.0),
                &spot_position,
                &(-spot_position),
                radians(environment.spot_angle),
                Attenuation {
                    constant: 1.0,
                    linear: 0.0,
                    quadratic: 0.0,
                },
            ),
        }
    }

    fn all(&self) -> [&dyn Light; 3] {
        [&self.ambient, &self.sun, &self.spot]
    }
}


/// Moves `position` on its orbit around `target` so that the angle between +Y
/// and the offset does not exceed `max_polar`. Distance and azimuth are kept.
pub fn clamp_polar(position: Vec3, target: Vec3, max_polar: f32) -> Vec3 {
    let offset = position - target;
    let distance = offset.magnitude();
    if distance <= f32::EPSILON {
        return position;
    }
    let polar = (offset.y / distance).clamp(-1.0, 1.0).acos();
    if polar <= max_polar {
        return position;
    }

    let horizontal = (offset.x * offset.x + offset.z * offset.z).sqrt();
    let (dx, dz) = if horizontal > f32::EPSILON {
        (offset.x / horizontal, offset.z / horizontal)
    } else {
        (1.0, 0.0)
    };
    let (sin, cos) = max_polar.sin_cos();
    target + vec3(dx * sin * distance, cos * distance, dz * sin * distance)
}


/// Logical-pixel position of `world` on screen, or `None` when behind the camera.
fn project(camera: &Camera, world: Vec3, viewport: Viewport, device_pixel_ratio: f32) -> Option<(f32, f32)> {
    let clip = *camera.projection() * *camera.view() * world.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    let x = (ndc.x * 0.5 + 0.5) * viewport.width as f32;
    let y = (0.5 - ndc.y * 0.5) * viewport.height as f32;
    Some((x / device_pixel_ratio, y / device_pixel_ratio))
}


fn fog_effect(fog: &Fog) -> FogEffect {
    FogEffect {
        color: fog.color.to_srgba(1.0),
        density: fog.density(),
        animation: 0.0,
        ..Default::default()
    }
}


fn draw_hud(gui_context: &egui::Context, hud: &HudConfig, particle_count: usize) {
    egui::Window::new("hud")
        .title_bar(false)
        .resizable(false)
        .anchor(egui::Align2::LEFT_TOP, [16.0, 16.0])
        .show(gui_context, |ui| {
            ui.heading(hud.title.as_str());
            ui.label(hud.caption.as_str());
            ui.small(format!(
                "{} particles adrift",
                particle_count.to_formatted_string(&Locale::en)
            ));
        });
}


/// Labels are centered on their projected anchor.
const LABEL_PIVOT: egui::Align2 = egui::Align2::CENTER_CENTER;

fn draw_label(gui_context: &egui::Context, index: usize, text: &str, at: (f32, f32)) {
    egui::Window::new(text)
        .id(egui::Id::new(("label", index)))
        .title_bar(false)
        .resizable(false)
        .collapsible(false)
        .pivot(LABEL_PIVOT)
        .fixed_pos(egui::pos2(at.0, at.1))
        .show(gui_context, |ui| {
            ui.label(egui::RichText::new(text).strong());
        });
}


pub fn main(config: SceneConfig) -> Result<(), SceneError> {
    let window = Window::new(WindowSettings {
        title: config.hud.window_title.clone(),
        max_size: None,
        ..Default::default()
    })
    .map_err(|e| SceneError::Window(format!("{:?}", e)))?;
    let context = window.gl();

    let mut rng = config.rng();
    let scene = Scene::build(&config, &mut rng);
    let rig = scene.camera;
    let hud = scene.hud.clone();
    let background = scene.environment.background.to_unit();
    let lights = Lights::new(&context, &scene.environment);
    let fog = fog_effect(&scene.environment.fog);
    log!(
        "renderer::main(): fog near={}, far={}, density={}",
        scene.environment.fog.near,
        scene.environment.fog.far,
        fog.density
    );
    let particle_count = config.particles.total();

    let mut camera = Camera::new_perspective(
        window.viewport(),
        to_vec3(rig.position),
        to_vec3(rig.target),
        UP,
        degrees(rig.fov_degrees),
        rig.z_near,
        rig.z_far,
    );
    let mut control = OrbitControl::new(*camera.target(), rig.min_distance, rig.max_distance);
    let mut gui = GUI::new(&context);

    let flat = scene.root.flatten();
    let mut stage = Stage::new(&flat);
    let mut drawables = flat
        .iter()
        .map(|node| Drawable::build(&context, node))
        .collect::<Vec<_>>();
    let labels = flat
        .iter()
        .enumerate()
        .filter_map(|(i, node)| match &node.visual {
            Some(Visual::Label { text }) => Some((i, text.clone())),
            _ => None,
        })
        .collect::<Vec<_>>();
    log!(
        "renderer::main(): drawables={}, labels={}",
        drawables.iter().flatten().count(),
        labels.len()
    );

    let mut clock = Clock::new();
    window.render_loop(move |mut frame_input| {
        clock.advance(frame_input.elapsed_time / 1000.0);
        stage.update(&clock);
        for (i, slot) in drawables.iter_mut().enumerate() {
            if let Some(drawable) = slot {
                drawable.set_transformation(stage.world(i));
                if stage.is_animated(i) {
                    drawable.set_opacity(stage.state(i).opacity);
                }
            }
        }

        camera.set_viewport(frame_input.viewport);
        let pinned = labels
            .iter()
            .filter_map(|(i, text)| {
                project(
                    &camera,
                    stage.world_position(*i),
                    frame_input.viewport,
                    frame_input.device_pixel_ratio,
                )
                    .map(|at| (*i, text.as_str(), at))
            })
            .collect::<Vec<_>>();
        gui.update(
            &mut frame_input.events,
            frame_input.accumulated_time,
            frame_input.viewport,
            frame_input.device_pixel_ratio,
            |gui_context| {
                draw_hud(gui_context, &hud, particle_count);
                for (i, text, at) in &pinned {
                    draw_label(gui_context, *i, text, *at);
                }
            },
        );

        control.handle_events(&mut camera, &mut frame_input.events);
        let position = *camera.position();
        let target = *camera.target();
        let clamped = clamp_polar(position, target, rig.max_polar_angle);
        if clamped != position {
            camera.set_view(clamped, target, UP);
        }

        let objects = drawables
            .iter()
            .flatten()
            .map(|drawable| drawable.object())
            .collect::<Vec<_>>();
        // draw offscreen so the fog pass can read color and depth
        let viewport = frame_input.viewport;
        let mut color_texture = Texture2D::new_empty::<[u8; 4]>(
            &context,
            viewport.width,
            viewport.height,
            Interpolation::Nearest,
            Interpolation::Nearest,
            None,
            Wrapping::ClampToEdge,
            Wrapping::ClampToEdge,
        );
        let mut depth_texture = DepthTexture2D::new::<f32>(
            &context,
            viewport.width,
            viewport.height,
            Wrapping::ClampToEdge,
            Wrapping::ClampToEdge,
        );
        RenderTarget::new(
            color_texture.as_color_target(None),
            depth_texture.as_depth_target(),
        )
        .clear(ClearState::color_and_depth(
            background[0],
            background[1],
            background[2],
            1.0,
            1.0,
        ))
        .render(&camera, objects, &lights.all());

        frame_input
            .screen()
            .clear(ClearState::depth(1.0))
            .apply_screen_effect(
                &fog,
                &camera,
                &[],
                Some(ColorTexture::Single(&color_texture)),
                Some(DepthTexture::Single(&depth_texture)),
            );
        let _ = gui.render();

        FrameOutput::default()
    });

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPS: f32 = 1e-4;

    fn polar_of(position: Vec3, target: Vec3) -> f32 {
        let offset = position - target;
        (offset.y / offset.magnitude()).acos()
    }

    #[test]
    fn test_clamp_polar_keeps_allowed_position() {
        let target = vec3(0.8, 0.8, -0.2);
        let position = vec3(-4.0, 2.5, 5.0);
        assert_eq!(clamp_polar(position, target, PI / 2.2), position);
    }

    #[test]
    fn test_clamp_polar_lifts_camera_below_limit() {
        let target = vec3(0.8, 0.8, -0.2);
        let position = vec3(3.0, -1.0, 4.0);
        let max_polar = PI / 2.2;
        let clamped = clamp_polar(position, target, max_polar);
        assert!(polar_of(clamped, target) <= max_polar + EPS);
        assert!(((clamped - target).magnitude() - (position - target).magnitude()).abs() < EPS);
        // azimuth kept
        let before = (position.z - target.z).atan2(position.x - target.x);
        let after = (clamped.z - target.z).atan2(clamped.x - target.x);
        assert!((before - after).abs() < EPS);
    }

    #[test]
    fn test_clamp_polar_straight_down() {
        let target = vec3(0.0, 0.0, 0.0);
        let clamped = clamp_polar(vec3(0.0, -5.0, 0.0), target, PI / 2.2);
        assert!((polar_of(clamped, target) - PI / 2.2).abs() < EPS);
        assert!((clamped.magnitude() - 5.0).abs() < EPS);
    }

    #[test]
    fn test_project_divides_by_pixel_ratio() {
        let viewport = Viewport::new_at_origo(800, 600);
        let camera = Camera::new_perspective(
            viewport,
            vec3(0.0, 0.0, 5.0),
            vec3(0.0, 0.0, 0.0),
            UP,
            degrees(40.0),
            0.1,
            100.0,
        );
        let (x, y) = project(&camera, vec3(0.0, 0.0, 0.0), viewport, 1.0).unwrap();
        assert!((x - 400.0).abs() < EPS && (y - 300.0).abs() < EPS);
        let (x, y) = project(&camera, vec3(0.0, 0.0, 0.0), viewport, 2.0).unwrap();
        assert!((x - 200.0).abs() < EPS && (y - 150.0).abs() < EPS);
        assert!(project(&camera, vec3(0.0, 0.0, 10.0), viewport, 1.0).is_none());
    }

    #[test]
    fn test_labels_centered_on_anchor() {
        assert_eq!(LABEL_PIVOT, egui::Align2::CENTER_CENTER);
    }

    #[test]
    fn test_fog_effect_uses_scene_fog() {
        let fog = Environment::default().fog;
        let effect = fog_effect(&fog);
        assert_eq!(effect.color, fog.color.to_srgba(1.0));
        assert_eq!(effect.density, fog.density());
        assert_eq!(effect.animation, 0.0);
    }

    #[test]
    fn test_scaled_emissive() {
        assert_eq!(scaled(Rgb::hex(0x9dd7ff), 0.0), Rgb(0, 0, 0));
        assert_eq!(scaled(Rgb::hex(0x9dd7ff), 1.0), Rgb(0x9d, 0xd7, 0xff));
        assert_eq!(scaled(Rgb(200, 100, 0), 0.5), Rgb(100, 50, 0));
    }
}
