use crate::scene::Bounds;
use glam::Vec3;

const MIN_DISTANCE: f32 = 0.05;
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Radius part of a camera orbit string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrbitRadius {
    Auto,
    Meters(f32),
    /// Fraction of the framing distance, `1.0` for `100%`.
    Fraction(f32),
}

/// Parsed `"<theta> <phi> <radius>"` orbit, angles in radians. `theta` is the
/// azimuth around +Y from +Z, `phi` the polar angle down from +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraOrbit {
    pub theta: f32,
    pub phi: f32,
    pub radius: OrbitRadius,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OrbitParseError {
    #[error("camera orbit needs three terms, got {0}")]
    TermCount(usize),
    #[error("unrecognized camera orbit term '{0}'")]
    Term(String),
}

impl std::str::FromStr for CameraOrbit {
    type Err = OrbitParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let terms: Vec<&str> = value.split_whitespace().collect();
        let [theta, phi, radius] = terms.as_slice() else {
            return Err(OrbitParseError::TermCount(terms.len()));
        };
        Ok(Self {
            theta: parse_angle(theta)?,
            phi: parse_angle(phi)?,
            radius: parse_radius(radius)?,
        })
    }
}

fn parse_angle(term: &str) -> Result<f32, OrbitParseError> {
    let invalid = || OrbitParseError::Term(term.to_string());
    if let Some(deg) = term.strip_suffix("deg") {
        return deg.parse::<f32>().map(f32::to_radians).map_err(|_| invalid());
    }
    let rad = term.strip_suffix("rad").unwrap_or(term);
    rad.parse::<f32>().map_err(|_| invalid())
}

fn parse_radius(term: &str) -> Result<OrbitRadius, OrbitParseError> {
    let invalid = || OrbitParseError::Term(term.to_string());
    if term == "auto" {
        return Ok(OrbitRadius::Auto);
    }
    if let Some(percent) = term.strip_suffix('%') {
        let value = percent.parse::<f32>().map_err(|_| invalid())?;
        return Ok(OrbitRadius::Fraction(value / 100.0));
    }
    let meters = term.strip_suffix('m').unwrap_or(term);
    meters
        .parse::<f32>()
        .map(OrbitRadius::Meters)
        .map_err(|_| invalid())
}

/// Orbit camera of the inline preview: looks at `target` from `distance`,
/// positioned by yaw (around +Y) and pitch (elevation).
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 0.0, 0.3, 3.0)
    }
}

impl OrbitCamera {
    pub fn new(target: Vec3, yaw: f32, pitch: f32, distance: f32) -> Self {
        let mut camera = Self {
            target,
            yaw,
            pitch,
            distance,
        };
        camera.clamp();
        camera
    }

    pub fn from_bounds(bounds: Bounds) -> Self {
        let mut camera = Self::default();
        camera.frame_bounds_preserve_orientation(bounds);
        camera
    }

    pub fn frame_bounds_preserve_orientation(&mut self, bounds: Bounds) {
        self.target = bounds.center;
        self.distance = framing_distance(Some(bounds));
        self.clamp();
    }

    /// Applies an orbit string's angles and radius; `Auto` and fractional
    /// radii are relative to the framing distance of `bounds`.
    pub fn apply_orbit(&mut self, orbit: CameraOrbit, bounds: Option<Bounds>) {
        self.yaw = orbit.theta;
        self.pitch = std::f32::consts::FRAC_PI_2 - orbit.phi;
        let framing = framing_distance(bounds);
        self.distance = match orbit.radius {
            OrbitRadius::Auto => framing,
            OrbitRadius::Meters(meters) => meters,
            OrbitRadius::Fraction(fraction) => framing * fraction,
        };
        if let Some(bounds) = bounds {
            self.target = bounds.center;
        }
        self.clamp();
    }

    pub fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch += pitch_delta;
        self.clamp();
    }

    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.distance *= factor;
            self.clamp();
        }
    }

    pub fn eye(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        let offset = Vec3::new(
            self.yaw.sin() * cos_pitch,
            self.pitch.sin(),
            self.yaw.cos() * cos_pitch,
        );
        self.target + offset * self.distance
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye()).normalize_or_zero()
    }

    fn clamp(&mut self) {
        const TWO_PI: f32 = std::f32::consts::PI * 2.0;
        if self.yaw.is_finite() {
            self.yaw = (self.yaw + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI;
        } else {
            self.yaw = 0.0;
        }
        if !self.pitch.is_finite() {
            self.pitch = 0.0;
        }
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        if !self.distance.is_finite() {
            self.distance = 3.0;
        }
        self.distance = self.distance.max(MIN_DISTANCE);
    }
}

fn framing_distance(bounds: Option<Bounds>) -> f32 {
    match bounds.map(|b| b.radius()) {
        Some(radius) if radius > 0.0 => radius * 3.0,
        _ => 3.0,
    }
}
