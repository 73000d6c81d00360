use crate::{
    core::{Point, Vec2},
    error::{KinemaError, KinemaResult},
    grid_actions::Warp,
};

/// Capability tag of an action: what its running form can do.
///
/// `Instant` completes within the tick it starts, `Interval` has a finite
/// duration and fraction-driven progress, `Generic` runs until told otherwise
/// (e.g. `Repeat`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ActionKind {
    Instant,
    Interval,
    Generic,
}

/// Result-type table for combining two operands with `+` or `|`.
pub fn combine_kinds(a: ActionKind, b: ActionKind) -> ActionKind {
    use ActionKind::*;
    match (a, b) {
        (Generic, _) | (_, Generic) => Generic,
        (Instant, Instant) => Instant,
        _ => Interval,
    }
}

/// An immutable action blueprint.
///
/// An `Action` never runs itself: dispatching it through
/// [`Scene::run_action`](crate::Scene::run_action) instantiates a fresh
/// running copy with its own elapsed time and sub-action cursors, so the same
/// blueprint can be dispatched to any number of nodes concurrently.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    // Instants.
    Place { position: Point },
    Show,
    Hide,
    ToggleVisibility,
    /// Detach the node's active grid so unwarped rendering resumes.
    StopGrid,

    // Node-property intervals.
    Delay { duration: f64 },
    MoveTo { position: Point, duration: f64 },
    MoveBy { delta: Vec2, duration: f64 },
    /// Rotates along the shortest arc to the target angle.
    RotateTo { angle_deg: f64, duration: f64 },
    RotateBy { angle_deg: f64, duration: f64 },
    ScaleTo { scale: Vec2, duration: f64 },
    /// Multiplies the starting scale by `factor` over the duration.
    ScaleBy { factor: Vec2, duration: f64 },
    FadeTo { opacity: f64, duration: f64 },
    JumpBy {
        delta: Vec2,
        height: f64,
        jumps: u32,
        duration: f64,
    },

    /// Grid-warp interval action (mesh, tiled or quad family).
    Warp(Warp),

    // Combinators.
    Sequence(Box<Action>, Box<Action>),
    Spawn(Box<Action>, Box<Action>),
    Repeat(Box<Action>),
    Loop(Box<Action>, u32),
    Reverse(Box<Action>),
    /// Scales the flow of time seen by the inner action by `factor`.
    Speed(Box<Action>, f64),
    /// Ease-in: inner fraction becomes `f^rate`.
    Accelerate(Box<Action>, f64),
    /// Ease-in/ease-out via smoothstep.
    AccelDeccel(Box<Action>),
    /// Ramps the wrapped grid warp's amplitude rate up as `f^rate`.
    AccelAmplitude(Box<Action>, f64),
    /// Ramps the wrapped grid warp's amplitude rate down as `(1-f)^rate`.
    DeaccelAmplitude(Box<Action>, f64),
}

impl Action {
    pub fn fade_in(duration: f64) -> Self {
        Self::FadeTo {
            opacity: 1.0,
            duration,
        }
    }

    pub fn fade_out(duration: f64) -> Self {
        Self::FadeTo {
            opacity: 0.0,
            duration,
        }
    }

    pub fn sequence(a: Action, b: Action) -> Self {
        Self::Sequence(Box::new(a), Box::new(b))
    }

    pub fn spawn(a: Action, b: Action) -> Self {
        Self::Spawn(Box::new(a), Box::new(b))
    }

    pub fn repeat(a: Action) -> Self {
        Self::Repeat(Box::new(a))
    }

    pub fn loop_n(a: Action, n: u32) -> Self {
        Self::Loop(Box::new(a), n)
    }

    pub fn reverse(a: Action) -> Self {
        Self::Reverse(Box::new(a))
    }

    pub fn speed(a: Action, factor: f64) -> Self {
        Self::Speed(Box::new(a), factor)
    }

    pub fn accelerate(a: Action, rate: f64) -> Self {
        Self::Accelerate(Box::new(a), rate)
    }

    pub fn accel_deccel(a: Action) -> Self {
        Self::AccelDeccel(Box::new(a))
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Place { .. }
            | Self::Show
            | Self::Hide
            | Self::ToggleVisibility
            | Self::StopGrid => ActionKind::Instant,

            Self::Delay { .. }
            | Self::MoveTo { .. }
            | Self::MoveBy { .. }
            | Self::RotateTo { .. }
            | Self::RotateBy { .. }
            | Self::ScaleTo { .. }
            | Self::ScaleBy { .. }
            | Self::FadeTo { .. }
            | Self::JumpBy { .. }
            | Self::Warp(_) => ActionKind::Interval,

            Self::Sequence(a, b) | Self::Spawn(a, b) => combine_kinds(a.kind(), b.kind()),
            Self::Repeat(_) => ActionKind::Generic,
            Self::Loop(a, _) => a.kind(),
            Self::Reverse(a)
            | Self::Speed(a, _)
            | Self::Accelerate(a, _)
            | Self::AccelDeccel(a)
            | Self::AccelAmplitude(a, _)
            | Self::DeaccelAmplitude(a, _) => a.kind(),
        }
    }

    /// Total duration in seconds; `None` means "runs indefinitely".
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Place { .. }
            | Self::Show
            | Self::Hide
            | Self::ToggleVisibility
            | Self::StopGrid => Some(0.0),

            Self::Delay { duration }
            | Self::MoveTo { duration, .. }
            | Self::MoveBy { duration, .. }
            | Self::RotateTo { duration, .. }
            | Self::RotateBy { duration, .. }
            | Self::ScaleTo { duration, .. }
            | Self::ScaleBy { duration, .. }
            | Self::FadeTo { duration, .. }
            | Self::JumpBy { duration, .. } => Some(*duration),
            Self::Warp(w) => Some(w.duration()),

            Self::Sequence(a, b) => match (a.duration(), b.duration()) {
                (Some(x), Some(y)) => Some(x + y),
                _ => None,
            },
            Self::Spawn(a, b) => match (a.duration(), b.duration()) {
                (Some(x), Some(y)) => Some(x.max(y)),
                _ => None,
            },
            Self::Repeat(_) => None,
            Self::Loop(a, n) => a.duration().map(|d| d * f64::from(*n)),
            Self::Reverse(a)
            | Self::Accelerate(a, _)
            | Self::AccelDeccel(a)
            | Self::AccelAmplitude(a, _)
            | Self::DeaccelAmplitude(a, _) => a.duration(),
            Self::Speed(a, factor) => a.duration().map(|d| d / factor),
        }
    }

    /// True when the running form is driven through a single `update(f)`
    /// fraction, which is what `Reverse`/`Accelerate`/`AccelDeccel` and the
    /// amplitude modulators need. Step-driven combinators are not; reverse
    /// distributes over them structurally and speed modulation uses `Speed`.
    fn is_fraction_drivable(&self) -> bool {
        match self {
            Self::Delay { .. }
            | Self::MoveTo { .. }
            | Self::MoveBy { .. }
            | Self::RotateTo { .. }
            | Self::RotateBy { .. }
            | Self::ScaleTo { .. }
            | Self::ScaleBy { .. }
            | Self::FadeTo { .. }
            | Self::JumpBy { .. }
            | Self::Warp(_) => true,
            Self::Reverse(a)
            | Self::Accelerate(a, _)
            | Self::AccelDeccel(a)
            | Self::AccelAmplitude(a, _)
            | Self::DeaccelAmplitude(a, _) => a.is_fraction_drivable(),
            _ => false,
        }
    }

    /// True when the action (through any fraction wrappers) is a grid warp
    /// with an amplitude parameter the amplitude modulators can drive.
    fn carries_amplitude(&self) -> bool {
        match self {
            Self::Warp(w) => w.has_amplitude(),
            Self::Reverse(a)
            | Self::Accelerate(a, _)
            | Self::AccelDeccel(a)
            | Self::AccelAmplitude(a, _)
            | Self::DeaccelAmplitude(a, _) => a.carries_amplitude(),
            _ => false,
        }
    }

    /// Validate the blueprint; every configuration error is reported here,
    /// before anything runs.
    pub fn validate(&self) -> KinemaResult<()> {
        fn check_duration(d: f64) -> KinemaResult<()> {
            if !d.is_finite() || d < 0.0 {
                return Err(KinemaError::config(
                    "action duration must be finite and >= 0",
                ));
            }
            Ok(())
        }

        match self {
            Self::Place { .. }
            | Self::Show
            | Self::Hide
            | Self::ToggleVisibility
            | Self::StopGrid => Ok(()),

            Self::Delay { duration }
            | Self::MoveTo { duration, .. }
            | Self::MoveBy { duration, .. }
            | Self::RotateTo { duration, .. }
            | Self::RotateBy { duration, .. }
            | Self::ScaleTo { duration, .. }
            | Self::ScaleBy { duration, .. } => check_duration(*duration),
            Self::FadeTo { opacity, duration } => {
                check_duration(*duration)?;
                if !(0.0..=1.0).contains(opacity) {
                    return Err(KinemaError::config("FadeTo opacity must be in [0, 1]"));
                }
                Ok(())
            }
            Self::JumpBy {
                jumps, duration, ..
            } => {
                check_duration(*duration)?;
                if *jumps == 0 {
                    return Err(KinemaError::config("JumpBy jumps must be >= 1"));
                }
                Ok(())
            }
            Self::Warp(w) => w.validate(),

            Self::Sequence(a, b) | Self::Spawn(a, b) => {
                a.validate()?;
                b.validate()
            }
            Self::Repeat(a) => a.validate(),
            Self::Loop(a, n) => {
                if *n == 0 {
                    return Err(KinemaError::config("Loop count must be >= 1"));
                }
                a.validate()
            }
            Self::Reverse(a) => a.validate(),
            Self::Speed(a, factor) => {
                if !(*factor > 0.0) {
                    return Err(KinemaError::config("Speed factor must be > 0"));
                }
                a.validate()
            }
            Self::Accelerate(a, rate) => {
                if !(*rate > 0.0) {
                    return Err(KinemaError::config("Accelerate rate must be > 0"));
                }
                if !a.is_fraction_drivable() {
                    return Err(KinemaError::config(
                        "Accelerate wraps interval actions only; use Speed for combinators",
                    ));
                }
                a.validate()
            }
            Self::AccelDeccel(a) => {
                if !a.is_fraction_drivable() {
                    return Err(KinemaError::config(
                        "AccelDeccel wraps interval actions only; use Speed for combinators",
                    ));
                }
                a.validate()
            }
            Self::AccelAmplitude(a, rate) | Self::DeaccelAmplitude(a, rate) => {
                if !(*rate > 0.0) {
                    return Err(KinemaError::config("amplitude ramp rate must be > 0"));
                }
                if !a.carries_amplitude() {
                    return Err(KinemaError::config(
                        "amplitude ramps wrap grid warps with an amplitude parameter",
                    ));
                }
                a.validate()
            }
        }
    }

    /// Time-reversed blueprint.
    ///
    /// Structural over combinators (a reversed sequence runs the reversed
    /// operands in swapped order); a reversed leaf interval drives its
    /// `update` with `1 - f`. Instants reverse by meaning: `Show <-> Hide`,
    /// `ToggleVisibility` is its own inverse, the rest reverse to themselves.
    pub fn reversed(&self) -> Action {
        match self {
            Self::Show => Self::Hide,
            Self::Hide => Self::Show,
            Self::ToggleVisibility => Self::ToggleVisibility,
            Self::Place { position } => Self::Place {
                position: *position,
            },
            Self::StopGrid => Self::StopGrid,

            Self::Sequence(a, b) => Self::sequence(b.reversed(), a.reversed()),
            Self::Spawn(a, b) => Self::spawn(a.reversed(), b.reversed()),
            Self::Repeat(a) => Self::repeat(a.reversed()),
            Self::Loop(a, n) => Self::loop_n(a.reversed(), *n),
            Self::Speed(a, factor) => Self::speed(a.reversed(), *factor),
            Self::Accelerate(a, rate) => Self::accelerate(a.reversed(), *rate),
            Self::AccelDeccel(a) => Self::accel_deccel(a.reversed()),
            Self::AccelAmplitude(a, rate) => {
                Self::AccelAmplitude(Box::new(a.reversed()), *rate)
            }
            Self::DeaccelAmplitude(a, rate) => {
                Self::DeaccelAmplitude(Box::new(a.reversed()), *rate)
            }
            Self::Reverse(a) => (**a).clone(),

            leaf => Self::Reverse(Box::new(leaf.clone())),
        }
    }
}

impl std::ops::Add for Action {
    type Output = Action;

    /// `a + b` runs `a` to completion, then `b`.
    fn add(self, rhs: Action) -> Action {
        Action::sequence(self, rhs)
    }
}

impl std::ops::BitOr for Action {
    type Output = Action;

    /// `a | b` runs both concurrently; done when both are done.
    fn bitor(self, rhs: Action) -> Action {
        Action::spawn(self, rhs)
    }
}

impl std::ops::Mul<u32> for Action {
    type Output = Action;

    /// `a * n` repeats `a` exactly `n` times.
    fn mul(self, n: u32) -> Action {
        Action::loop_n(self, n)
    }
}
