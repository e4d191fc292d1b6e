use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::error::SceneError;
use crate::log; // macro import
use crate::particles::MAX_POINTS;


/// Optional tuning for the diorama. Every field falls back to the stock scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Pins particle generation. Unset means seeding from system entropy.
    pub seed: Option<u64>,
    pub camera: CameraRig,
    pub particles: ParticleCounts,
    pub hud: HudConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraRig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Largest angle between +Y and the target-to-camera offset, in radians.
    pub max_polar_angle: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: [-4.0, 2.5, 5.0],
            target: [0.8, 0.8, -0.2],
            fov_degrees: 40.0,
            z_near: 0.1,
            z_far: 1000.0,
            min_distance: 4.0,
            max_distance: 10.0,
            max_polar_angle: PI / 2.2,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleCounts {
    pub wind: usize,
    pub fireflies: usize,
    pub stars: usize,
}

impl Default for ParticleCounts {
    fn default() -> Self {
        Self {
            wind: 200,
            fireflies: 300,
            stars: 3000,
        }
    }
}

impl ParticleCounts {
    pub fn total(&self) -> usize {
        self.wind
            .saturating_add(self.fireflies)
            .saturating_add(self.stars)
    }

    fn named(&self) -> [(&'static str, usize); 3] {
        [
            ("wind", self.wind),
            ("fireflies", self.fireflies),
            ("stars", self.stars),
        ]
    }
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    /// Browser tab and window title.
    pub window_title: String,
    pub title: String,
    pub caption: String,
    /// Shows the pig's speech bubble.
    pub show_label: bool,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            window_title: String::from("Wolf and the Wooden House"),
            title: String::from("Hold Tight, Little Pig!"),
            caption: String::from(
                "The Big Bad Wolf huffs and puffs, but this timber hideout stands firm\u{2026} for now.",
            ),
            show_label: true,
        }
    }
}


impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        let cam = &self.camera;
        let finite = cam.position.iter().chain(cam.target.iter()).all(|v| v.is_finite());
        if !finite {
            return Err(SceneError::InvalidConfig(String::from(
                "camera position and target must be finite",
            )));
        }
        if !(cam.min_distance.is_finite() && cam.min_distance > 0.0) {
            return Err(SceneError::InvalidConfig(format!(
                "camera.min_distance must be positive, got {}",
                cam.min_distance
            )));
        }
        if !(cam.max_distance.is_finite() && cam.max_distance >= cam.min_distance) {
            return Err(SceneError::InvalidConfig(format!(
                "camera.max_distance ({}) must not be below camera.min_distance ({})",
                cam.max_distance, cam.min_distance
            )));
        }
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(SceneError::InvalidConfig(format!(
                "camera.fov_degrees must be in (0, 180), got {}",
                cam.fov_degrees
            )));
        }
        if !(cam.z_near > 0.0 && cam.z_far > cam.z_near) {
            return Err(SceneError::InvalidConfig(format!(
                "camera clip planes are inverted: near={}, far={}",
                cam.z_near, cam.z_far
            )));
        }
        if !(cam.max_polar_angle > 0.0 && cam.max_polar_angle <= PI) {
            return Err(SceneError::InvalidConfig(format!(
                "camera.max_polar_angle must be in (0, pi], got {}",
                cam.max_polar_angle
            )));
        }
        for (name, count) in self.particles.named() {
            if count > MAX_POINTS {
                return Err(SceneError::InvalidConfig(format!(
                    "particles.{} must be at most {}, got {}",
                    name, MAX_POINTS, count
                )));
            }
        }
        Ok(())
    }

    /// Random source for particle generation.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => {
                log!("SceneConfig::rng(): seed={}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = SceneConfig::from_json("{}").unwrap();
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.particles.total(), 3500);
    }

    #[test]
    fn test_partial_override() {
        let config = SceneConfig::from_json(
            r#"{ "seed": 9, "particles": { "stars": 10 }, "hud": { "show_label": false } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.particles.stars, 10);
        assert_eq!(config.particles.wind, 200);
        assert!(!config.hud.show_label);
        assert_eq!(config.hud.title, "Hold Tight, Little Pig!");
        assert_eq!(config.hud.window_title, "Wolf and the Wooden House");
    }

    #[test]
    fn test_rejects_inverted_distances() {
        let err = SceneConfig::from_json(
            r#"{ "camera": { "min_distance": 8.0, "max_distance": 2.0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SceneError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_oversized_particle_counts() {
        let err = SceneConfig::from_json(r#"{ "particles": { "stars": 6148914691236517206 } }"#)
            .unwrap_err();
        assert!(matches!(err, SceneError::InvalidConfig(ref msg) if msg.contains("particles.stars")));

        let mut config = SceneConfig::default();
        config.particles.fireflies = MAX_POINTS;
        assert!(config.validate().is_ok());
        config.particles.fireflies = MAX_POINTS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_polar_limit_and_fov() {
        let mut config = SceneConfig::default();
        config.camera.max_polar_angle = 0.0;
        assert!(config.validate().is_err());

        let mut config = SceneConfig::default();
        config.camera.fov_degrees = 180.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = SceneConfig::from_json("{ seed: ").unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = SceneConfig {
            seed: Some(5),
            ..Default::default()
        };
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }
}
