use std::f64::consts::PI;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    core::{GridSize, Point, Vec3, clamp01},
    error::{KinemaError, KinemaResult},
    grid::{GridAttachment, MeshGrid},
    node::NodeState,
    quad_actions::QuadMove,
    run::IntervalEffect,
    tiled_actions::{FadeOutTiles, JumpTiles, ShakyTiles, ShatteredTiles, TurnOffTiles},
};

/// A grid-warp blueprint: which closed-form deformation to run, over which
/// grid, for how long. Wrapped by [`Action::Warp`](crate::Action::Warp).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Warp {
    Waves3D(Waves3D),
    Liquid(Liquid),
    Waves(Waves),
    Ripple3D(Ripple3D),
    Lens3D(Lens3D),
    Twirl(Twirl),
    Shaky3D(Shaky3D),
    ShakyTiles(ShakyTiles),
    ShatteredTiles(ShatteredTiles),
    JumpTiles(JumpTiles),
    FadeOutTiles(FadeOutTiles),
    TurnOffTiles(TurnOffTiles),
    QuadMove(QuadMove),
}

impl Warp {
    pub fn duration(&self) -> f64 {
        match self {
            Self::Waves3D(p) => p.duration,
            Self::Liquid(p) => p.duration,
            Self::Waves(p) => p.duration,
            Self::Ripple3D(p) => p.duration,
            Self::Lens3D(p) => p.duration,
            Self::Twirl(p) => p.duration,
            Self::Shaky3D(p) => p.duration,
            Self::ShakyTiles(p) => p.duration,
            Self::ShatteredTiles(p) => p.duration,
            Self::JumpTiles(p) => p.duration,
            Self::FadeOutTiles(p) => p.duration,
            Self::TurnOffTiles(p) => p.duration,
            Self::QuadMove(p) => p.duration,
        }
    }

    /// Warps whose formula carries an amplitude the ramp modulators can
    /// drive.
    pub fn has_amplitude(&self) -> bool {
        matches!(
            self,
            Self::Waves3D(_)
                | Self::Liquid(_)
                | Self::Waves(_)
                | Self::Ripple3D(_)
                | Self::Twirl(_)
                | Self::JumpTiles(_)
        )
    }

    pub fn validate(&self) -> KinemaResult<()> {
        match self {
            Self::Waves3D(p) => p.validate(),
            Self::Liquid(p) => p.validate(),
            Self::Waves(p) => p.validate(),
            Self::Ripple3D(p) => p.validate(),
            Self::Lens3D(p) => p.validate(),
            Self::Twirl(p) => p.validate(),
            Self::Shaky3D(p) => p.validate(),
            Self::ShakyTiles(p) => p.validate(),
            Self::ShatteredTiles(p) => p.validate(),
            Self::JumpTiles(p) => p.validate(),
            Self::FadeOutTiles(p) => p.validate(),
            Self::TurnOffTiles(p) => p.validate(),
            Self::QuadMove(p) => p.validate(),
        }
    }

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        match self {
            Self::Waves3D(p) => Box::new(Waves3DEffect::new(p.clone())),
            Self::Liquid(p) => Box::new(LiquidEffect::new(p.clone())),
            Self::Waves(p) => Box::new(WavesEffect::new(p.clone())),
            Self::Ripple3D(p) => Box::new(Ripple3DEffect::new(p.clone())),
            Self::Lens3D(p) => Box::new(Lens3DEffect::new(p.clone())),
            Self::Twirl(p) => Box::new(TwirlEffect::new(p.clone())),
            Self::Shaky3D(p) => Box::new(Shaky3DEffect::new(p.clone())),
            Self::ShakyTiles(p) => p.effect(),
            Self::ShatteredTiles(p) => p.effect(),
            Self::JumpTiles(p) => p.effect(),
            Self::FadeOutTiles(p) => p.effect(),
            Self::TurnOffTiles(p) => p.effect(),
            Self::QuadMove(p) => p.effect(),
        }
    }
}

pub(crate) fn check_duration(d: f64) -> KinemaResult<()> {
    if !d.is_finite() || d < 0.0 {
        return Err(KinemaError::config(
            "warp duration must be finite and >= 0",
        ));
    }
    Ok(())
}

pub(crate) fn check_waves(waves: u32) -> KinemaResult<()> {
    if waves == 0 {
        return Err(KinemaError::config("wave count must be >= 1"));
    }
    Ok(())
}

pub(crate) fn check_amplitude(a: f64) -> KinemaResult<()> {
    if !a.is_finite() {
        return Err(KinemaError::config("amplitude must be finite"));
    }
    Ok(())
}

pub(crate) fn check_radius(r: f64) -> KinemaResult<()> {
    if !(r > 0.0) || !r.is_finite() {
        return Err(KinemaError::config("radius must be finite and > 0"));
    }
    Ok(())
}

pub(crate) fn check_randrange(r: f64) -> KinemaResult<()> {
    if !(r > 0.0) || !r.is_finite() {
        return Err(KinemaError::config("randrange must be finite and > 0"));
    }
    Ok(())
}

pub(crate) fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Attach a fresh mesh grid sized from the node surface. Replaces any grid
/// already present; the snapshot is always the undeformed layout.
pub(crate) fn attach_mesh(target: &mut NodeState, size: GridSize) -> KinemaResult<()> {
    target.grid = Some(GridAttachment::Mesh(MeshGrid::new(size, target.size)?));
    Ok(())
}

pub(crate) fn mesh_mut(target: &mut NodeState) -> KinemaResult<&mut MeshGrid> {
    match target.grid.as_mut() {
        Some(GridAttachment::Mesh(g)) => Ok(g),
        _ => Err(KinemaError::action("mesh warp has no mesh grid attached")),
    }
}

/// Sinusoidal surface wave: vertices bob out of the plane.
///
/// `z = amplitude * rate * sin(2 pi * waves * t + 0.01 * (x + y))`
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Waves3D {
    pub grid: GridSize,
    pub duration: f64,
    pub waves: u32,
    pub amplitude: f64,
}

impl Waves3D {
    pub fn new(grid: GridSize, duration: f64, waves: u32, amplitude: f64) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            waves,
            amplitude,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_waves(self.waves)?;
        check_amplitude(self.amplitude)
    }
}

#[derive(Debug)]
struct Waves3DEffect {
    p: Waves3D,
    amplitude_rate: f64,
}

impl Waves3DEffect {
    fn new(p: Waves3D) -> Self {
        Self {
            p,
            amplitude_rate: 1.0,
        }
    }
}

impl IntervalEffect for Waves3DEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let amp = self.p.amplitude * self.amplitude_rate;
        let phase = 2.0 * PI * f64::from(self.p.waves) * f;
        let g = mesh_mut(target)?;
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let o = g.original_vertex(i, j);
                let z = amp * (phase + 0.01 * (o.x + o.y)).sin();
                g.set_vertex(i, j, Vec3::new(o.x, o.y, z));
            }
        }
        Ok(())
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.amplitude_rate = rate;
    }
}

/// In-plane sinusoidal slosh: both axes displaced by their own sine.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Liquid {
    pub grid: GridSize,
    pub duration: f64,
    pub waves: u32,
    pub amplitude: f64,
}

impl Liquid {
    pub fn new(grid: GridSize, duration: f64, waves: u32, amplitude: f64) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            waves,
            amplitude,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_waves(self.waves)?;
        check_amplitude(self.amplitude)
    }
}

#[derive(Debug)]
struct LiquidEffect {
    p: Liquid,
    amplitude_rate: f64,
}

impl LiquidEffect {
    fn new(p: Liquid) -> Self {
        Self {
            p,
            amplitude_rate: 1.0,
        }
    }
}

impl IntervalEffect for LiquidEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let amp = self.p.amplitude * self.amplitude_rate;
        let phase = 2.0 * PI * f64::from(self.p.waves) * f;
        let g = mesh_mut(target)?;
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let o = g.original_vertex(i, j);
                let x = o.x + amp * (phase + 0.01 * o.x).sin();
                let y = o.y + amp * (phase + 0.01 * o.y).sin();
                g.set_vertex(i, j, Vec3::new(x, y, o.z));
            }
        }
        Ok(())
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.amplitude_rate = rate;
    }
}

/// In-plane wave with selectable axes: `hsin` displaces x as a function of
/// y, `vsin` displaces y as a function of x. At least one must be enabled.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Waves {
    pub grid: GridSize,
    pub duration: f64,
    pub waves: u32,
    pub amplitude: f64,
    pub hsin: bool,
    pub vsin: bool,
}

impl Waves {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        grid: GridSize,
        duration: f64,
        waves: u32,
        amplitude: f64,
        hsin: bool,
        vsin: bool,
    ) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            waves,
            amplitude,
            hsin,
            vsin,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_waves(self.waves)?;
        check_amplitude(self.amplitude)?;
        if !self.hsin && !self.vsin {
            return Err(KinemaError::config(
                "Waves needs hsin and/or vsin enabled",
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct WavesEffect {
    p: Waves,
    amplitude_rate: f64,
}

impl WavesEffect {
    fn new(p: Waves) -> Self {
        Self {
            p,
            amplitude_rate: 1.0,
        }
    }
}

impl IntervalEffect for WavesEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let amp = self.p.amplitude * self.amplitude_rate;
        let phase = 2.0 * PI * f64::from(self.p.waves) * f;
        let g = mesh_mut(target)?;
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let o = g.original_vertex(i, j);
                let x = if self.p.hsin {
                    o.x + amp * (phase + 0.01 * o.y).sin()
                } else {
                    o.x
                };
                let y = if self.p.vsin {
                    o.y + amp * (phase + 0.01 * o.x).sin()
                } else {
                    o.y
                };
                g.set_vertex(i, j, Vec3::new(x, y, o.z));
            }
        }
        Ok(())
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.amplitude_rate = rate;
    }
}

/// Radial ripple decaying linearly to zero at `radius` from `center`.
///
/// `z = amplitude * rate * sin(2 pi * waves * t - r * pi / radius)
///      * (1 - min(r / radius, 1))`
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ripple3D {
    pub grid: GridSize,
    pub duration: f64,
    pub center: Point,
    pub radius: f64,
    pub waves: u32,
    pub amplitude: f64,
}

impl Ripple3D {
    pub fn new(
        grid: GridSize,
        duration: f64,
        center: Point,
        radius: f64,
        waves: u32,
        amplitude: f64,
    ) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            center,
            radius,
            waves,
            amplitude,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_radius(self.radius)?;
        check_waves(self.waves)?;
        check_amplitude(self.amplitude)
    }
}

#[derive(Debug)]
struct Ripple3DEffect {
    p: Ripple3D,
    amplitude_rate: f64,
}

impl Ripple3DEffect {
    fn new(p: Ripple3D) -> Self {
        Self {
            p,
            amplitude_rate: 1.0,
        }
    }
}

impl IntervalEffect for Ripple3DEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let amp = self.p.amplitude * self.amplitude_rate;
        let phase = 2.0 * PI * f64::from(self.p.waves) * f;
        let g = mesh_mut(target)?;
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let o = g.original_vertex(i, j);
                let r = o.xy().distance(self.p.center);
                let falloff = 1.0 - clamp01(r / self.p.radius);
                let z = amp * (phase - r * PI / self.p.radius).sin() * falloff;
                g.set_vertex(i, j, Vec3::new(o.x, o.y, z));
            }
        }
        Ok(())
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.amplitude_rate = rate;
    }
}

/// Magnifying lens: radii inside `radius` are remapped through a log-domain
/// power curve, `r' = radius * (r / radius)^(1 - strength * t)`, pulling
/// vertices outward around `center` as the effect ramps in.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lens3D {
    pub grid: GridSize,
    pub duration: f64,
    pub center: Point,
    pub radius: f64,
    /// Magnification strength in `(0, 1)`.
    pub strength: f64,
}

impl Lens3D {
    pub fn new(
        grid: GridSize,
        duration: f64,
        center: Point,
        radius: f64,
        strength: f64,
    ) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            center,
            radius,
            strength,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_radius(self.radius)?;
        if !(self.strength > 0.0 && self.strength < 1.0) {
            return Err(KinemaError::config("lens strength must be in (0, 1)"));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Lens3DEffect {
    p: Lens3D,
}

impl Lens3DEffect {
    fn new(p: Lens3D) -> Self {
        Self { p }
    }
}

impl IntervalEffect for Lens3DEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let exponent = 1.0 - self.p.strength * f;
        let g = mesh_mut(target)?;
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let o = g.original_vertex(i, j);
                let d = o.xy() - self.p.center;
                let r = d.hypot();
                if r > 0.0 && r < self.p.radius {
                    let pre = (r / self.p.radius).max(1e-3);
                    let nr = pre.powf(exponent) * self.p.radius;
                    let xy = self.p.center + d * (nr / r);
                    g.set_vertex(i, j, Vec3::new(xy.x, xy.y, o.z));
                } else {
                    g.set_vertex(i, j, o);
                }
            }
        }
        Ok(())
    }
}

/// Rotates vertices around `center` by an angle that grows with radial
/// distance and oscillates `twirls` times over the run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Twirl {
    pub grid: GridSize,
    pub duration: f64,
    pub center: Point,
    pub twirls: u32,
    /// Peak rotation, in radians, at half the surface diagonal from center.
    pub amplitude: f64,
}

impl Twirl {
    pub fn new(
        grid: GridSize,
        duration: f64,
        center: Point,
        twirls: u32,
        amplitude: f64,
    ) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            center,
            twirls,
            amplitude,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_waves(self.twirls)?;
        check_amplitude(self.amplitude)
    }
}

#[derive(Debug)]
struct TwirlEffect {
    p: Twirl,
    amplitude_rate: f64,
    half_diag: f64,
}

impl TwirlEffect {
    fn new(p: Twirl) -> Self {
        Self {
            p,
            amplitude_rate: 1.0,
            half_diag: 0.0,
        }
    }
}

impl IntervalEffect for TwirlEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.half_diag = 0.5 * target.size.hypot();
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let base = self.p.amplitude
            * self.amplitude_rate
            * (2.0 * PI * f64::from(self.p.twirls) * f).sin();
        let g = mesh_mut(target)?;
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let o = g.original_vertex(i, j);
                let d = o.xy() - self.p.center;
                let r = d.hypot();
                let a = base * (r / self.half_diag);
                let (sin_a, cos_a) = a.sin_cos();
                let x = self.p.center.x + d.x * cos_a - d.y * sin_a;
                let y = self.p.center.y + d.x * sin_a + d.y * cos_a;
                g.set_vertex(i, j, Vec3::new(x, y, o.z));
            }
        }
        Ok(())
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.amplitude_rate = rate;
    }
}

/// Per-vertex random jitter redrawn every tick. Not a pure function of `t`:
/// this one deliberately trades replay for chaos. Seed it for deterministic
/// runs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Shaky3D {
    pub grid: GridSize,
    pub duration: f64,
    pub randrange: f64,
    pub shake_z: bool,
    pub seed: Option<u64>,
}

impl Shaky3D {
    pub fn new(
        grid: GridSize,
        duration: f64,
        randrange: f64,
        shake_z: bool,
        seed: Option<u64>,
    ) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            randrange,
            shake_z,
            seed,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_randrange(self.randrange)
    }
}

#[derive(Debug)]
struct Shaky3DEffect {
    p: Shaky3D,
    rng: StdRng,
}

impl Shaky3DEffect {
    fn new(p: Shaky3D) -> Self {
        let rng = rng_for(p.seed);
        Self { p, rng }
    }
}

impl IntervalEffect for Shaky3DEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_mesh(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        let range = self.p.randrange;
        // Split borrows: draw jitter before touching the grid.
        let jitter = |rng: &mut StdRng| rng.gen_range(-range..=range);
        for i in 0..=self.p.grid.cols {
            for j in 0..=self.p.grid.rows {
                let dx = jitter(&mut self.rng);
                let dy = jitter(&mut self.rng);
                let dz = if self.p.shake_z {
                    jitter(&mut self.rng)
                } else {
                    0.0
                };
                let g = mesh_mut(target)?;
                let o = g.original_vertex(i, j);
                g.set_vertex(i, j, o + Vec3::new(dx, dy, dz));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Vec2;

    fn state() -> NodeState {
        NodeState::new(Vec2::new(100.0, 80.0))
    }

    fn grid() -> GridSize {
        GridSize::new(4, 4).unwrap()
    }

    fn mesh_vertices(s: &NodeState) -> Vec<Vec3> {
        s.grid
            .as_ref()
            .and_then(GridAttachment::mesh)
            .map(|g| g.vertices().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn waves3d_update_is_idempotent_and_replayable() {
        let mut s = state();
        let mut e = Waves3DEffect::new(Waves3D::new(grid(), 2.0, 3, 12.0).unwrap());
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.3).unwrap();
        let at_03 = mesh_vertices(&s);
        e.update(&mut s, 0.3).unwrap();
        assert_eq!(mesh_vertices(&s), at_03);
        // Reverse then forward again lands on the exact same state.
        e.update(&mut s, 0.7).unwrap();
        assert_ne!(mesh_vertices(&s), at_03);
        e.update(&mut s, 0.3).unwrap();
        assert_eq!(mesh_vertices(&s), at_03);
    }

    #[test]
    fn waves3d_keeps_xy_and_moves_z() {
        let mut s = state();
        let mut e = Waves3DEffect::new(Waves3D::new(grid(), 2.0, 1, 5.0).unwrap());
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.13).unwrap();
        let g = s.grid.as_ref().unwrap().mesh().unwrap();
        let o = g.original_vertex(2, 3);
        let v = g.vertex(2, 3);
        assert_eq!((v.x, v.y), (o.x, o.y));
        let expected = 5.0 * (2.0 * PI * 0.13 + 0.01 * (o.x + o.y)).sin();
        approx::assert_abs_diff_eq!(v.z, expected, epsilon = 1e-12);
    }

    #[test]
    fn amplitude_rate_scales_displacement() {
        let mut s = state();
        let mut e = Waves3DEffect::new(Waves3D::new(grid(), 2.0, 1, 5.0).unwrap());
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.2).unwrap();
        let full = s.grid.as_ref().unwrap().mesh().unwrap().vertex(1, 1).z;
        e.set_amplitude_rate(0.5);
        e.update(&mut s, 0.2).unwrap();
        let half = s.grid.as_ref().unwrap().mesh().unwrap().vertex(1, 1).z;
        approx::assert_abs_diff_eq!(half, full * 0.5, epsilon = 1e-12);
    }

    #[test]
    fn ripple_decays_to_zero_at_radius() {
        let mut s = state();
        let p = Ripple3D::new(grid(), 2.0, Point::new(0.0, 0.0), 30.0, 2, 10.0).unwrap();
        let mut e = Ripple3DEffect::new(p);
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.4).unwrap();
        let g = s.grid.as_ref().unwrap().mesh().unwrap();
        // Far corner is well beyond the 30-unit radius: untouched.
        assert_eq!(g.vertex(4, 4).z, 0.0);
        // Near the center the ripple displaces.
        assert_ne!(g.vertex(1, 0).z, 0.0);
    }

    #[test]
    fn lens_is_identity_at_t_zero_and_magnifies_later() {
        let mut s = state();
        let p = Lens3D::new(grid(), 2.0, Point::new(50.0, 40.0), 60.0, 0.7).unwrap();
        let mut e = Lens3DEffect::new(p);
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.0).unwrap();
        {
            let g = s.grid.as_ref().unwrap().mesh().unwrap();
            assert_eq!(g.vertex(1, 1), g.original_vertex(1, 1));
        }
        e.update(&mut s, 1.0).unwrap();
        let g = s.grid.as_ref().unwrap().mesh().unwrap();
        let o = g.original_vertex(1, 1);
        let v = g.vertex(1, 1);
        let c = Point::new(50.0, 40.0);
        // Pushed outward from the lens center.
        assert!(v.xy().distance(c) > o.xy().distance(c));
    }

    #[test]
    fn twirl_preserves_radius() {
        let mut s = state();
        let c = Point::new(50.0, 40.0);
        let p = Twirl::new(grid(), 2.0, c, 1, 1.0).unwrap();
        let mut e = TwirlEffect::new(p);
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.2).unwrap();
        let g = s.grid.as_ref().unwrap().mesh().unwrap();
        let o = g.original_vertex(0, 0);
        let v = g.vertex(0, 0);
        approx::assert_abs_diff_eq!(
            v.xy().distance(c),
            o.xy().distance(c),
            epsilon = 1e-9
        );
        assert_ne!(v, o);
    }

    #[test]
    fn shaky_is_bounded_and_seed_deterministic() {
        let p = Shaky3D::new(grid(), 2.0, 4.0, false, Some(7)).unwrap();
        let mut s1 = state();
        let mut e1 = Shaky3DEffect::new(p.clone());
        e1.start(&mut s1).unwrap();
        e1.update(&mut s1, 0.5).unwrap();

        let mut s2 = state();
        let mut e2 = Shaky3DEffect::new(p);
        e2.start(&mut s2).unwrap();
        e2.update(&mut s2, 0.5).unwrap();

        assert_eq!(mesh_vertices(&s1), mesh_vertices(&s2));
        let g = s1.grid.as_ref().unwrap().mesh().unwrap();
        for i in 0..=4 {
            for j in 0..=4 {
                let d = g.vertex(i, j) - g.original_vertex(i, j);
                assert!(d.x.abs() <= 4.0 && d.y.abs() <= 4.0);
                assert_eq!(d.z, 0.0);
            }
        }
    }

    #[test]
    fn bad_parameters_fail_at_construction() {
        assert!(Waves3D::new(grid(), 2.0, 0, 5.0).is_err());
        assert!(Ripple3D::new(grid(), 2.0, Point::ZERO, 0.0, 2, 5.0).is_err());
        assert!(Lens3D::new(grid(), 2.0, Point::ZERO, 10.0, 1.5).is_err());
        assert!(Shaky3D::new(grid(), 2.0, -1.0, false, None).is_err());
        assert!(Waves::new(grid(), 2.0, 2, 5.0, false, false).is_err());
    }
}
