use cgmath::{vec3, Vector3};

/// RGB color built from a `0xRRGGBB` literal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// The same color with the sRGB transfer curve removed.
    pub fn linear(self) -> Self {
        fn decode(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Self {
            r: decode(self.r),
            g: decode(self.g),
            b: decode(self.b),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    pub primary: Color,
    pub secondary: Color,
    pub accent: Color,
}

impl Palette {
    /// Maps a uniform sample in [0, 1) onto one of the three palette entries.
    pub fn pick(&self, choice: f32) -> Color {
        if choice < 0.33 {
            self.primary
        } else if choice < 0.66 {
            self.secondary
        } else {
            self.accent
        }
    }
}

/// Which tweening capability the scene is built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TweenerKind {
    Eased,
    /// Minimal built-in interpolator; ignores easing curves.
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSettings {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitSettings {
    pub damping_factor: f32,
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub zoom_step: f32,
}

/// Metal/rough surface with a self-lit term in the base color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialSettings {
    pub emissive_intensity: f32,
    pub metalness: f32,
    pub roughness: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomSettings {
    pub threshold: f32,
    pub strength: f32,
    pub radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneMapping {
    pub exposure: f32,
}

#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub particle_count: usize,
    pub particle_spread: f32,
    pub particle_size: f32,
    pub particle_opacity: f32,
    pub palette: Palette,
    pub cube_count: usize,
    pub cube_size: f32,
    pub orbit_radius: f32,
    pub shape_material: MaterialSettings,
    pub cube_material: MaterialSettings,
    pub wireframe_opacity: f32,
    pub background: Color,
    pub fog_density: f32,
    pub ambient_intensity: f32,
    pub camera: CameraSettings,
    pub orbit: OrbitSettings,
    pub bloom: BloomSettings,
    pub tone_mapping: ToneMapping,
    pub tweener: TweenerKind,
    /// Fixed RNG seed. `None` seeds from the wall clock.
    pub seed: Option<u64>,
}

impl SceneConfig {
    pub fn with_defaults() -> Self {
        Self {
            particle_count: 1500,
            particle_spread: 20.0,
            particle_size: 0.05,
            particle_opacity: 0.8,
            palette: Palette {
                primary: Color::from_hex(0x00ffff),
                secondary: Color::from_hex(0xff00ff),
                accent: Color::from_hex(0xffff00),
            },
            cube_count: 8,
            cube_size: 0.3,
            orbit_radius: 3.0,
            shape_material: MaterialSettings {
                emissive_intensity: 0.5,
                metalness: 0.8,
                roughness: 0.2,
            },
            cube_material: MaterialSettings {
                emissive_intensity: 0.3,
                metalness: 0.7,
                roughness: 0.3,
            },
            wireframe_opacity: 0.3,
            background: Color::from_hex(0x0a0a0f),
            fog_density: 0.05,
            ambient_intensity: 0.5,
            camera: CameraSettings {
                fov_degrees: 75.0,
                near: 0.1,
                far: 1000.0,
                position: vec3(0.0, 0.0, 5.0),
            },
            orbit: OrbitSettings {
                damping_factor: 0.05,
                auto_rotate_speed: 0.5,
                rotate_speed: 1.0,
                min_distance: 3.0,
                max_distance: 10.0,
                zoom_step: 0.95,
            },
            bloom: BloomSettings {
                threshold: 0.21,
                strength: 1.2,
                radius: 0.55,
            },
            tone_mapping: ToneMapping { exposure: 1.5 },
            tweener: TweenerKind::Eased,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_tweener(mut self, kind: TweenerKind) -> Self {
        self.tweener = kind;
        self
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}
