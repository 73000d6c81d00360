use crate::{
    core::{Point, Vec2},
    ease,
    error::{KinemaError, KinemaResult},
    node::NodeState,
    run::IntervalEffect,
};

fn not_started() -> KinemaError {
    KinemaError::action("effect stepped before start")
}

#[derive(Debug)]
pub(crate) struct DelayEffect;

impl IntervalEffect for DelayEffect {
    fn update(&mut self, _target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct MoveToEffect {
    pub to: Point,
    from: Option<Point>,
}

impl MoveToEffect {
    pub fn new(to: Point) -> Self {
        Self { to, from: None }
    }
}

impl IntervalEffect for MoveToEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.position);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        target.position = from.lerp(self.to, f);
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct MoveByEffect {
    pub delta: Vec2,
    from: Option<Point>,
}

impl MoveByEffect {
    pub fn new(delta: Vec2) -> Self {
        Self { delta, from: None }
    }
}

impl IntervalEffect for MoveByEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.position);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        target.position = from + self.delta * f;
        Ok(())
    }
}

/// Signed shortest rotation from `from` to `to`, in degrees.
fn shortest_arc_deg(from: f64, to: f64) -> f64 {
    let diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 { diff - 360.0 } else { diff }
}

#[derive(Debug)]
pub(crate) struct RotateToEffect {
    pub to_deg: f64,
    from: Option<(f64, f64)>, // (start angle, signed arc)
}

impl RotateToEffect {
    pub fn new(to_deg: f64) -> Self {
        Self { to_deg, from: None }
    }
}

impl IntervalEffect for RotateToEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        let from = target.rotation_deg;
        self.from = Some((from, shortest_arc_deg(from, self.to_deg)));
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let (from, arc) = self.from.ok_or_else(not_started)?;
        target.rotation_deg = from + arc * f;
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct RotateByEffect {
    pub delta_deg: f64,
    from: Option<f64>,
}

impl RotateByEffect {
    pub fn new(delta_deg: f64) -> Self {
        Self {
            delta_deg,
            from: None,
        }
    }
}

impl IntervalEffect for RotateByEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.rotation_deg);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        target.rotation_deg = from + self.delta_deg * f;
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct ScaleToEffect {
    pub to: Vec2,
    from: Option<Vec2>,
}

impl ScaleToEffect {
    pub fn new(to: Vec2) -> Self {
        Self { to, from: None }
    }
}

impl IntervalEffect for ScaleToEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.scale);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        target.scale = from.lerp(self.to, f);
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct ScaleByEffect {
    pub factor: Vec2,
    from: Option<Vec2>,
}

impl ScaleByEffect {
    pub fn new(factor: Vec2) -> Self {
        Self { factor, from: None }
    }
}

impl IntervalEffect for ScaleByEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.scale);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        let to = Vec2::new(from.x * self.factor.x, from.y * self.factor.y);
        target.scale = from.lerp(to, f);
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct FadeToEffect {
    pub to: f64,
    from: Option<f64>,
}

impl FadeToEffect {
    pub fn new(to: f64) -> Self {
        Self { to, from: None }
    }
}

impl IntervalEffect for FadeToEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.opacity);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        target.opacity = from + (self.to - from) * f;
        Ok(())
    }
}

/// Parabolic-feel jump: linear travel plus `height * |sin(pi * jumps * f)|`
/// vertical arcs.
#[derive(Debug)]
pub(crate) struct JumpByEffect {
    pub delta: Vec2,
    pub height: f64,
    pub jumps: u32,
    from: Option<Point>,
}

impl JumpByEffect {
    pub fn new(delta: Vec2, height: f64, jumps: u32) -> Self {
        Self {
            delta,
            height,
            jumps,
            from: None,
        }
    }
}

impl IntervalEffect for JumpByEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.from = Some(target.position);
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let from = self.from.ok_or_else(not_started)?;
        let hop = self.height * (f * std::f64::consts::PI * f64::from(self.jumps)).sin().abs();
        target.position = Point::new(
            from.x + self.delta.x * f,
            from.y + self.delta.y * f + hop,
        );
        Ok(())
    }
}

// Instants run as zero-duration intervals: they receive a single
// `update(1.0)` in the tick they start, which is what lets a sequence of
// instants drain within one step call.

#[derive(Debug)]
pub(crate) struct PlaceEffect {
    pub position: Point,
}

impl IntervalEffect for PlaceEffect {
    fn update(&mut self, target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        target.position = self.position;
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct VisibilityEffect {
    pub visible: Option<bool>, // None toggles
}

impl IntervalEffect for VisibilityEffect {
    fn update(&mut self, target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        target.visible = self.visible.unwrap_or(!target.visible);
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct StopGridEffect;

impl IntervalEffect for StopGridEffect {
    fn update(&mut self, target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        target.grid = None;
        Ok(())
    }
}

// Fraction wrappers.

#[derive(Debug)]
pub(crate) struct ReverseEffect {
    pub inner: Box<dyn IntervalEffect>,
}

impl IntervalEffect for ReverseEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.inner.start(target)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        self.inner.update(target, 1.0 - f)
    }

    fn stop(&mut self, target: &mut NodeState) {
        self.inner.stop(target);
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.inner.set_amplitude_rate(rate);
    }
}

#[derive(Debug)]
pub(crate) struct AccelerateEffect {
    pub inner: Box<dyn IntervalEffect>,
    pub rate: f64,
}

impl IntervalEffect for AccelerateEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.inner.start(target)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        self.inner.update(target, ease::accelerate(f, self.rate))
    }

    fn stop(&mut self, target: &mut NodeState) {
        self.inner.stop(target);
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.inner.set_amplitude_rate(rate);
    }
}

#[derive(Debug)]
pub(crate) struct AccelDeccelEffect {
    pub inner: Box<dyn IntervalEffect>,
}

impl IntervalEffect for AccelDeccelEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.inner.start(target)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        self.inner.update(target, ease::accel_deccel(f))
    }

    fn stop(&mut self, target: &mut NodeState) {
        self.inner.stop(target);
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.inner.set_amplitude_rate(rate);
    }
}

/// Drives the wrapped grid warp's amplitude rate from the current fraction
/// before delegating, replacing the companion-action pattern with explicit
/// ownership of the modulated effect.
#[derive(Debug)]
pub(crate) struct AmplitudeRampEffect {
    pub inner: Box<dyn IntervalEffect>,
    pub rate: f64,
    pub deaccel: bool,
}

impl IntervalEffect for AmplitudeRampEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.inner.start(target)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let r = if self.deaccel {
            (1.0 - f).powf(self.rate)
        } else {
            f.powf(self.rate)
        };
        self.inner.set_amplitude_rate(r);
        self.inner.update(target, f)
    }

    fn stop(&mut self, target: &mut NodeState) {
        self.inner.stop(target);
    }
}
