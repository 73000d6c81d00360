use crate::{
    action::Action,
    core::clamp01,
    error::{KinemaError, KinemaResult},
    interval::{
        AccelDeccelEffect, AccelerateEffect, AmplitudeRampEffect, DelayEffect, FadeToEffect,
        JumpByEffect, MoveByEffect, MoveToEffect, PlaceEffect, ReverseEffect, RotateByEffect,
        RotateToEffect, ScaleByEffect, ScaleToEffect, StopGridEffect, VisibilityEffect,
    },
    node::NodeState,
};

/// Fraction-driven behavior of an interval action.
///
/// `start` runs once after the target is bound and captures whatever the
/// effect derives from the target's initial state; `update` receives the
/// clamped progress fraction and must recompute the target's state from that
/// capture alone, never by accumulating onto its own previous writes.
pub(crate) trait IntervalEffect: std::fmt::Debug {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        let _ = target;
        Ok(())
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()>;

    fn stop(&mut self, target: &mut NodeState) {
        let _ = target;
    }

    /// Hook for the amplitude ramp modulators; warps with an amplitude
    /// parameter store the rate, everything else ignores it.
    fn set_amplitude_rate(&mut self, rate: f64) {
        let _ = rate;
    }
}

/// A running action instance: all mutable per-run state lives here, freshly
/// allocated by [`instantiate`] at every dispatch.
///
/// `step` returns the portion of `dt` the run did *not* consume when it
/// completed during the call; combinators feed that overflow into whatever
/// runs next so zero-duration chains drain within a single tick.
#[derive(Debug)]
pub(crate) enum Run {
    Interval(IntervalRun),
    Sequence(Box<SequenceRun>),
    Spawn(Box<SpawnRun>),
    Repeat(Box<RepeatRun>),
    Loop(Box<LoopRun>),
    Speed(Box<SpeedRun>),
}

impl Run {
    pub fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        match self {
            Self::Interval(r) => r.effect.start(target),
            Self::Sequence(r) => r.current.start(target),
            Self::Spawn(r) => {
                r.a.start(target)?;
                r.b.start(target)
            }
            Self::Repeat(r) => r.current.start(target),
            Self::Loop(r) => r.current.start(target),
            Self::Speed(r) => r.inner.start(target),
        }
    }

    pub fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        match self {
            Self::Interval(r) => r.step(target, dt),
            Self::Sequence(r) => r.step(target, dt),
            Self::Spawn(r) => r.step(target, dt),
            Self::Repeat(r) => r.step(target, dt),
            Self::Loop(r) => r.step(target, dt),
            Self::Speed(r) => r.step(target, dt),
        }
    }

    /// Runs exactly once per instance; the runner and the combinators above
    /// guarantee it.
    pub fn stop(&mut self, target: &mut NodeState) {
        match self {
            Self::Interval(r) => r.effect.stop(target),
            Self::Sequence(r) => r.current.stop(target),
            Self::Spawn(r) => {
                if !r.a_stopped {
                    r.a.stop(target);
                    r.a_stopped = true;
                }
                if !r.b_stopped {
                    r.b.stop(target);
                    r.b_stopped = true;
                }
            }
            Self::Repeat(r) => r.current.stop(target),
            Self::Loop(r) => r.current.stop(target),
            Self::Speed(r) => r.inner.stop(target),
        }
    }

    pub fn done(&self) -> bool {
        match self {
            Self::Interval(r) => r.elapsed >= r.duration,
            Self::Sequence(r) => r.next.is_none() && r.current.done(),
            Self::Spawn(r) => r.a.done() && r.b.done(),
            Self::Repeat(_) => false,
            Self::Loop(r) => r.finished,
            Self::Speed(r) => r.inner.done(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct IntervalRun {
    elapsed: f64,
    duration: f64,
    effect: Box<dyn IntervalEffect>,
}

impl IntervalRun {
    fn new(duration: f64, effect: Box<dyn IntervalEffect>) -> Self {
        Self {
            elapsed: 0.0,
            duration,
            effect,
        }
    }

    fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        let remaining = (self.duration - self.elapsed).max(0.0);
        self.elapsed += dt;
        let f = if self.duration <= 0.0 {
            1.0
        } else {
            clamp01(self.elapsed / self.duration)
        };
        self.effect.update(target, f)?;
        if self.elapsed >= self.duration {
            Ok((dt - remaining).max(0.0))
        } else {
            Ok(0.0)
        }
    }
}

#[derive(Debug)]
pub(crate) struct SequenceRun {
    current: Run,
    /// The second operand, instantiated at dispatch, started at handoff.
    next: Option<Run>,
}

impl SequenceRun {
    fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        if self.next.is_some() {
            let overflow = self.current.step(target, dt)?;
            if !self.current.done() {
                return Ok(0.0);
            }
            // First operand finished mid-tick: close it out, bring up the
            // second and hand it the unconsumed remainder of dt.
            self.current.stop(target);
            let next = self.next.take().ok_or_else(|| {
                KinemaError::action("sequence lost its second operand")
            })?;
            self.current = next;
            self.current.start(target)?;
            let overflow2 = self.current.step(target, overflow)?;
            return Ok(if self.current.done() { overflow2 } else { 0.0 });
        }

        let overflow = self.current.step(target, dt)?;
        Ok(if self.current.done() { overflow } else { 0.0 })
    }
}

#[derive(Debug)]
pub(crate) struct SpawnRun {
    a: Run,
    b: Run,
    a_stopped: bool,
    b_stopped: bool,
}

impl SpawnRun {
    fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        let oa = if self.a_stopped {
            dt
        } else {
            let o = self.a.step(target, dt)?;
            if self.a.done() {
                self.a.stop(target);
                self.a_stopped = true;
            }
            o
        };
        let ob = if self.b_stopped {
            dt
        } else {
            let o = self.b.step(target, dt)?;
            if self.b.done() {
                self.b.stop(target);
                self.b_stopped = true;
            }
            o
        };
        if self.a.done() && self.b.done() {
            Ok(oa.min(ob))
        } else {
            Ok(0.0)
        }
    }
}

#[derive(Debug)]
pub(crate) struct RepeatRun {
    spec: Action,
    current: Run,
}

impl RepeatRun {
    fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        let mut budget = dt;
        loop {
            let overflow = self.current.step(target, budget)?;
            if !self.current.done() {
                return Ok(0.0);
            }
            self.current.stop(target);
            self.current = instantiate(&self.spec)?;
            self.current.start(target)?;
            // A body that consumed no time restarts once and waits for the
            // next tick; anything else would spin forever inside this call.
            if overflow <= 0.0 || overflow >= budget {
                return Ok(0.0);
            }
            budget = overflow;
        }
    }
}

#[derive(Debug)]
pub(crate) struct LoopRun {
    spec: Action,
    current: Run,
    remaining: u32,
    finished: bool,
}

impl LoopRun {
    fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        let mut budget = dt;
        loop {
            let overflow = self.current.step(target, budget)?;
            if !self.current.done() {
                return Ok(0.0);
            }
            self.remaining -= 1;
            if self.remaining == 0 {
                self.finished = true;
                return Ok(overflow);
            }
            self.current.stop(target);
            self.current = instantiate(&self.spec)?;
            self.current.start(target)?;
            if overflow <= 0.0 || overflow >= budget {
                return Ok(0.0);
            }
            budget = overflow;
        }
    }
}

#[derive(Debug)]
pub(crate) struct SpeedRun {
    inner: Run,
    factor: f64,
}

impl SpeedRun {
    fn step(&mut self, target: &mut NodeState, dt: f64) -> KinemaResult<f64> {
        let overflow = self.inner.step(target, dt * self.factor)?;
        if self.inner.done() {
            Ok(overflow / self.factor)
        } else {
            Ok(0.0)
        }
    }
}

/// Build a running interval for actions whose whole behavior is a single
/// `update(f)` fraction, including nested fraction wrappers. `None` means
/// "not fraction-drivable" (instants and step-driven combinators).
fn fraction_run(action: &Action) -> KinemaResult<Option<IntervalRun>> {
    let run = match action {
        Action::Delay { duration } => IntervalRun::new(*duration, Box::new(DelayEffect)),
        Action::MoveTo { position, duration } => {
            IntervalRun::new(*duration, Box::new(MoveToEffect::new(*position)))
        }
        Action::MoveBy { delta, duration } => {
            IntervalRun::new(*duration, Box::new(MoveByEffect::new(*delta)))
        }
        Action::RotateTo { angle_deg, duration } => {
            IntervalRun::new(*duration, Box::new(RotateToEffect::new(*angle_deg)))
        }
        Action::RotateBy { angle_deg, duration } => {
            IntervalRun::new(*duration, Box::new(RotateByEffect::new(*angle_deg)))
        }
        Action::ScaleTo { scale, duration } => {
            IntervalRun::new(*duration, Box::new(ScaleToEffect::new(*scale)))
        }
        Action::ScaleBy { factor, duration } => {
            IntervalRun::new(*duration, Box::new(ScaleByEffect::new(*factor)))
        }
        Action::FadeTo { opacity, duration } => {
            IntervalRun::new(*duration, Box::new(FadeToEffect::new(*opacity)))
        }
        Action::JumpBy {
            delta,
            height,
            jumps,
            duration,
        } => IntervalRun::new(
            *duration,
            Box::new(JumpByEffect::new(*delta, *height, *jumps)),
        ),
        Action::Warp(w) => IntervalRun::new(w.duration(), w.effect()),

        Action::Reverse(a) => match fraction_run(a)? {
            Some(inner) => IntervalRun::new(
                inner.duration,
                Box::new(ReverseEffect {
                    inner: inner.effect,
                }),
            ),
            None => return Ok(None),
        },
        Action::Accelerate(a, rate) => match fraction_run(a)? {
            Some(inner) => IntervalRun::new(
                inner.duration,
                Box::new(AccelerateEffect {
                    inner: inner.effect,
                    rate: *rate,
                }),
            ),
            None => return Ok(None),
        },
        Action::AccelDeccel(a) => match fraction_run(a)? {
            Some(inner) => IntervalRun::new(
                inner.duration,
                Box::new(AccelDeccelEffect {
                    inner: inner.effect,
                }),
            ),
            None => return Ok(None),
        },
        Action::AccelAmplitude(a, rate) | Action::DeaccelAmplitude(a, rate) => {
            let deaccel = matches!(action, Action::DeaccelAmplitude(..));
            match fraction_run(a)? {
                Some(inner) => IntervalRun::new(
                    inner.duration,
                    Box::new(AmplitudeRampEffect {
                        inner: inner.effect,
                        rate: *rate,
                        deaccel,
                    }),
                ),
                None => return Ok(None),
            }
        }

        _ => return Ok(None),
    };
    Ok(Some(run))
}

/// The dispatch-time factory: turns an immutable blueprint into an
/// independent running instance. Two calls never share state, so two nodes
/// running "the same" action cannot leak elapsed time or sub-cursors into
/// each other.
pub(crate) fn instantiate(action: &Action) -> KinemaResult<Run> {
    if let Some(run) = fraction_run(action)? {
        return Ok(Run::Interval(run));
    }

    Ok(match action {
        Action::Place { position } => Run::Interval(IntervalRun::new(
            0.0,
            Box::new(PlaceEffect {
                position: *position,
            }),
        )),
        Action::Show => Run::Interval(IntervalRun::new(
            0.0,
            Box::new(VisibilityEffect {
                visible: Some(true),
            }),
        )),
        Action::Hide => Run::Interval(IntervalRun::new(
            0.0,
            Box::new(VisibilityEffect {
                visible: Some(false),
            }),
        )),
        Action::ToggleVisibility => Run::Interval(IntervalRun::new(
            0.0,
            Box::new(VisibilityEffect { visible: None }),
        )),
        Action::StopGrid => Run::Interval(IntervalRun::new(0.0, Box::new(StopGridEffect))),

        Action::Sequence(a, b) => Run::Sequence(Box::new(SequenceRun {
            current: instantiate(a)?,
            next: Some(instantiate(b)?),
        })),
        Action::Spawn(a, b) => Run::Spawn(Box::new(SpawnRun {
            a: instantiate(a)?,
            b: instantiate(b)?,
            a_stopped: false,
            b_stopped: false,
        })),
        Action::Repeat(a) => Run::Repeat(Box::new(RepeatRun {
            spec: (**a).clone(),
            current: instantiate(a)?,
        })),
        Action::Loop(a, n) => {
            if *n == 0 {
                return Err(KinemaError::config("Loop count must be >= 1"));
            }
            Run::Loop(Box::new(LoopRun {
                spec: (**a).clone(),
                current: instantiate(a)?,
                remaining: *n,
                finished: false,
            }))
        }
        Action::Speed(a, factor) => {
            if !(*factor > 0.0) {
                return Err(KinemaError::config("Speed factor must be > 0"));
            }
            Run::Speed(Box::new(SpeedRun {
                inner: instantiate(a)?,
                factor: *factor,
            }))
        }
        // Not fraction-drivable here, so distribute the reversal over the
        // structure and instantiate the result.
        Action::Reverse(a) => instantiate(&a.reversed())?,
        Action::Accelerate(..) | Action::AccelDeccel(..) => {
            return Err(KinemaError::config(
                "Accelerate wraps interval actions only; use Speed for combinators",
            ));
        }
        Action::AccelAmplitude(..) | Action::DeaccelAmplitude(..) => {
            return Err(KinemaError::config(
                "amplitude ramps wrap grid warps with an amplitude parameter",
            ));
        }
        // Leaf intervals and instants were handled above.
        _ => {
            return Err(KinemaError::action("unhandled action form at dispatch"));
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::core::{Point, Vec2};

    fn state() -> NodeState {
        NodeState::new(Vec2::new(100.0, 100.0))
    }

    /// Appends every lifecycle callback to a shared log.
    #[derive(Debug)]
    struct EventLogEffect {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl IntervalEffect for EventLogEffect {
        fn start(&mut self, _target: &mut NodeState) -> KinemaResult<()> {
            self.log.borrow_mut().push(format!("{}.start", self.label));
            Ok(())
        }

        fn update(&mut self, _target: &mut NodeState, f: f64) -> KinemaResult<()> {
            self.log
                .borrow_mut()
                .push(format!("{}.update({f})", self.label));
            Ok(())
        }

        fn stop(&mut self, _target: &mut NodeState) {
            self.log.borrow_mut().push(format!("{}.stop", self.label));
        }
    }

    fn move_x(to: f64, duration: f64) -> Action {
        Action::MoveTo {
            position: Point::new(to, 0.0),
            duration,
        }
    }

    #[test]
    fn interval_overflow_is_unconsumed_dt() {
        let mut s = state();
        let mut run = instantiate(&move_x(1.0, 2.0)).unwrap();
        run.start(&mut s).unwrap();
        assert_eq!(run.step(&mut s, 1.5).unwrap(), 0.0);
        assert!(!run.done());
        assert_eq!(run.step(&mut s, 1.5).unwrap(), 1.0);
        assert!(run.done());
        assert_eq!(s.position.x, 1.0);
    }

    #[test]
    fn zero_duration_run_completes_with_update_one() {
        let mut s = state();
        s.position = Point::new(9.0, 9.0);
        let mut run = instantiate(&move_x(4.0, 0.0)).unwrap();
        run.start(&mut s).unwrap();
        let overflow = run.step(&mut s, 0.7).unwrap();
        assert_eq!(overflow, 0.7);
        assert!(run.done());
        assert_eq!(s.position, Point::new(4.0, 0.0));
    }

    #[test]
    fn sequence_carries_overflow_into_second_operand() {
        let mut s = state();
        let seq = move_x(1.0, 1.0) + Action::MoveBy {
            delta: Vec2::new(10.0, 0.0),
            duration: 2.0,
        };
        let mut run = instantiate(&seq).unwrap();
        run.start(&mut s).unwrap();
        // 1.5s: first finishes at 1.0, second gets the remaining 0.5.
        run.step(&mut s, 1.5).unwrap();
        assert!(!run.done());
        assert_eq!(s.position.x, 1.0 + 10.0 * (0.5 / 2.0));
    }

    #[test]
    fn all_instant_sequence_drains_in_one_step() {
        let mut s = state();
        let chain = Action::Place {
            position: Point::new(1.0, 0.0),
        } + Action::Place {
            position: Point::new(2.0, 0.0),
        } + Action::Place {
            position: Point::new(3.0, 0.0),
        };
        let mut run = instantiate(&chain).unwrap();
        run.start(&mut s).unwrap();
        let overflow = run.step(&mut s, 0.25).unwrap();
        assert!(run.done());
        assert_eq!(overflow, 0.25);
        assert_eq!(s.position, Point::new(3.0, 0.0));
    }

    #[test]
    fn sequence_handoff_fires_lifecycle_callbacks_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let instant = |label| {
            Run::Interval(IntervalRun::new(
                0.0,
                Box::new(EventLogEffect {
                    label,
                    log: Rc::clone(&log),
                }),
            ))
        };
        // a + (b + c), all zero-duration.
        let tail = Run::Sequence(Box::new(SequenceRun {
            current: instant("b"),
            next: Some(instant("c")),
        }));
        let mut run = Run::Sequence(Box::new(SequenceRun {
            current: instant("a"),
            next: Some(tail),
        }));

        let mut s = state();
        run.start(&mut s).unwrap();
        let overflow = run.step(&mut s, 0.25).unwrap();
        assert!(run.done());
        assert_eq!(overflow, 0.25);
        run.stop(&mut s); // what the runner does on completion, same tick

        // Each operand goes through start, update(1.0), stop, strictly in
        // chain order, and stop fires exactly once per operand.
        assert_eq!(
            log.borrow().join(" "),
            "a.start a.update(1) a.stop b.start b.update(1) b.stop c.start c.update(1) c.stop"
        );
    }

    #[test]
    fn spawn_stops_finished_child_and_keeps_stepping_the_other() {
        let mut s = state();
        let spawn = move_x(1.0, 2.0)
            | Action::FadeTo {
                opacity: 0.0,
                duration: 5.0,
            };
        let mut run = instantiate(&spawn).unwrap();
        run.start(&mut s).unwrap();
        run.step(&mut s, 3.0).unwrap();
        assert!(!run.done());
        // Shorter child was driven to completion.
        assert_eq!(s.position.x, 1.0);
        // Longer child is at update(3/5).
        assert!((s.opacity - 0.4).abs() < 1e-12);
        let overflow = run.step(&mut s, 3.0).unwrap();
        assert!(run.done());
        assert_eq!(overflow, 1.0);
        assert_eq!(s.opacity, 0.0);
    }

    #[test]
    fn loop_restarts_with_leftover_dt() {
        let mut s = state();
        let looped = Action::MoveBy {
            delta: Vec2::new(3.0, 0.0),
            duration: 3.0,
        } * 2;
        let mut run = instantiate(&looped).unwrap();
        run.start(&mut s).unwrap();
        run.step(&mut s, 3.1).unwrap();
        assert!(!run.done());
        // First pass finished (x = 3), restart stepped 0.1 into the second.
        assert!((s.position.x - (3.0 + 3.0 * (0.1 / 3.0))).abs() < 1e-12);
        let overflow = run.step(&mut s, 4.0).unwrap();
        assert!(run.done());
        assert!((overflow - 1.1).abs() < 1e-12);
        assert_eq!(s.position.x, 6.0);
    }

    #[test]
    fn repeat_is_never_done() {
        let mut s = state();
        let rep = Action::repeat(Action::MoveBy {
            delta: Vec2::new(1.0, 0.0),
            duration: 1.0,
        });
        let mut run = instantiate(&rep).unwrap();
        run.start(&mut s).unwrap();
        for _ in 0..5 {
            run.step(&mut s, 1.0).unwrap();
            assert!(!run.done());
        }
        assert!((s.position.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn repeat_of_instant_restarts_once_per_tick() {
        let mut s = state();
        let rep = Action::repeat(Action::ToggleVisibility);
        let mut run = instantiate(&rep).unwrap();
        run.start(&mut s).unwrap();
        run.step(&mut s, 0.5).unwrap();
        // One toggle per tick, not an unbounded drain.
        assert!(!s.visible);
        run.step(&mut s, 0.5).unwrap();
        assert!(s.visible);
    }

    #[test]
    fn speed_scales_inner_time() {
        let mut s = state();
        let fast = Action::speed(move_x(1.0, 4.0), 2.0);
        let mut run = instantiate(&fast).unwrap();
        run.start(&mut s).unwrap();
        run.step(&mut s, 1.0).unwrap();
        assert_eq!(s.position.x, 0.5);
        let overflow = run.step(&mut s, 1.5).unwrap();
        assert!(run.done());
        // Inner finished 1.0s of outer time early: 2.5 - 4.0/2.
        assert!((overflow - 0.5).abs() < 1e-12);
    }

    #[test]
    fn reverse_of_interval_drives_one_minus_f() {
        let mut s = state();
        let rev = Action::reverse(move_x(10.0, 2.0));
        let mut run = instantiate(&rev).unwrap();
        run.start(&mut s).unwrap();
        run.step(&mut s, 0.5).unwrap();
        // f = 0.25, so the inner sees 0.75.
        assert_eq!(s.position.x, 7.5);
    }

    #[test]
    fn reverse_of_sequence_runs_operands_backwards() {
        let mut s = state();
        let seq = Action::Hide + move_x(10.0, 1.0);
        let mut run = instantiate(&Action::reverse(seq)).unwrap();
        run.start(&mut s).unwrap();
        // Reversed: first the reversed move, then Show.
        run.step(&mut s, 0.5).unwrap();
        assert!(s.visible);
        assert_eq!(s.position.x, 5.0);
        run.step(&mut s, 0.6).unwrap();
        assert!(run.done());
        assert!(s.visible);
    }

    #[test]
    fn two_instances_do_not_share_state() {
        let mut s1 = state();
        let mut s2 = state();
        let spec = move_x(10.0, 1.0);
        let mut r1 = instantiate(&spec).unwrap();
        let mut r2 = instantiate(&spec).unwrap();
        r1.start(&mut s1).unwrap();
        r2.start(&mut s2).unwrap();
        r1.step(&mut s1, 0.9).unwrap();
        r2.step(&mut s2, 0.1).unwrap();
        assert_eq!(s1.position.x, 9.0);
        assert_eq!(s2.position.x, 1.0);
        assert!(!r1.done() && !r2.done());
    }
}
