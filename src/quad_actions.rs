use crate::{
    core::{GridSize, Point, Vec3},
    error::{KinemaError, KinemaResult},
    grid_actions::{attach_mesh, check_duration, mesh_mut},
    node::NodeState,
    run::IntervalEffect,
};

/// Named target shapes for [`QuadMove`]. Every deform is expressed as the
/// four corner positions the quad interpolates towards.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum QuadDeform {
    /// Move each corner to an explicit position.
    MoveTo {
        bl: Point,
        br: Point,
        tr: Point,
        tl: Point,
    },
    /// Swap the bottom-right and top-left corners.
    CornerSwap,
    /// Slide the bottom-right corner up onto the top-right one.
    MoveCornerUp,
    /// Slide the top-left corner down onto the bottom-left one.
    MoveCornerDown,
    /// Flip the quad vertically (bottom edge becomes top edge).
    Flip,
    /// Shear horizontally: top corners shift by `amount`, bottom corners by
    /// `-amount`.
    SkewHorizontal { amount: f64 },
    /// Shear vertically: right corners shift by `amount`, left corners by
    /// `-amount`.
    SkewVertical { amount: f64 },
}

impl QuadDeform {
    fn validate(&self) -> KinemaResult<()> {
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        match self {
            Self::MoveTo { bl, br, tr, tl } => {
                if ![bl, br, tr, tl].into_iter().all(finite) {
                    return Err(KinemaError::config("quad corners must be finite"));
                }
            }
            Self::SkewHorizontal { amount } | Self::SkewVertical { amount } => {
                if !amount.is_finite() {
                    return Err(KinemaError::config("skew amount must be finite"));
                }
            }
            Self::CornerSwap | Self::MoveCornerUp | Self::MoveCornerDown | Self::Flip => {}
        }
        Ok(())
    }
}

/// Interpolates the node's surface quad from its rest shape to a deformed
/// one over `duration`. Runs on a single-cell mesh grid, so the corners are
/// exactly the four grid vertices.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuadMove {
    pub duration: f64,
    pub deform: QuadDeform,
}

impl QuadMove {
    pub fn new(duration: f64, deform: QuadDeform) -> KinemaResult<Self> {
        let p = Self { duration, deform };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        self.deform.validate()
    }

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        Box::new(QuadMoveEffect { p: self.clone() })
    }
}

#[derive(Debug)]
struct QuadMoveEffect {
    p: QuadMove,
}

impl QuadMoveEffect {
    /// Target corner positions, given the rest corners.
    fn targets(&self, bl: Point, br: Point, tr: Point, tl: Point) -> [Point; 4] {
        match &self.p.deform {
            QuadDeform::MoveTo { bl, br, tr, tl } => [*bl, *br, *tr, *tl],
            QuadDeform::CornerSwap => [bl, tl, tr, br],
            QuadDeform::MoveCornerUp => [bl, tr, tr, tl],
            QuadDeform::MoveCornerDown => [bl, br, tr, bl],
            QuadDeform::Flip => [tl, tr, br, bl],
            QuadDeform::SkewHorizontal { amount } => [
                Point::new(bl.x - amount, bl.y),
                Point::new(br.x - amount, br.y),
                Point::new(tr.x + amount, tr.y),
                Point::new(tl.x + amount, tl.y),
            ],
            QuadDeform::SkewVertical { amount } => [
                Point::new(bl.x, bl.y - amount),
                Point::new(br.x, br.y + amount),
                Point::new(tr.x, tr.y + amount),
                Point::new(tl.x, tl.y - amount),
            ],
        }
    }
}

fn lerp(from: Point, to: Point, f: f64) -> Point {
    from + (to - from) * f
}

impl IntervalEffect for QuadMoveEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        // Single cell: the grid vertices are exactly the surface corners.
        attach_mesh(target, GridSize::new(1, 1)?)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let g = mesh_mut(target)?;
        let bl = g.original_vertex(0, 0);
        let br = g.original_vertex(1, 0);
        let tr = g.original_vertex(1, 1);
        let tl = g.original_vertex(0, 1);
        let [t_bl, t_br, t_tr, t_tl] = self.targets(bl.xy(), br.xy(), tr.xy(), tl.xy());
        for (i, j, o, t) in [
            (0, 0, bl, t_bl),
            (1, 0, br, t_br),
            (1, 1, tr, t_tr),
            (0, 1, tl, t_tl),
        ] {
            let p = lerp(o.xy(), t, f);
            g.set_vertex(i, j, Vec3::new(p.x, p.y, o.z));
        }
        Ok(())
    }
}
