use std::f64::consts::PI;

use rand::{Rng, rngs::StdRng, seq::SliceRandom};

use crate::{
    core::{GridSize, Vec3, clamp01},
    error::{KinemaError, KinemaResult},
    grid::{GridAttachment, TiledGrid},
    grid_actions::{check_amplitude, check_duration, check_randrange, check_waves, rng_for},
    node::NodeState,
    run::IntervalEffect,
};

pub(crate) fn attach_tiled(target: &mut NodeState, size: GridSize) -> KinemaResult<()> {
    target.grid = Some(GridAttachment::Tiled(TiledGrid::new(size, target.size)?));
    Ok(())
}

pub(crate) fn tiled_mut(target: &mut NodeState) -> KinemaResult<&mut TiledGrid> {
    match target.grid.as_mut() {
        Some(GridAttachment::Tiled(g)) => Ok(g),
        _ => Err(KinemaError::action("tiled warp has no tiled grid attached")),
    }
}

/// Rigid per-tile jitter, redrawn every tick. All four corners of a tile move
/// together, so tiles shake without tearing. Seed it for deterministic runs.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShakyTiles {
    pub grid: GridSize,
    pub duration: f64,
    pub randrange: f64,
    pub shake_z: bool,
    pub seed: Option<u64>,
}

impl ShakyTiles {
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

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        Box::new(ShakyTilesEffect {
            p: self.clone(),
            rng: rng_for(self.seed),
        })
    }
}

#[derive(Debug)]
struct ShakyTilesEffect {
    p: ShakyTiles,
    rng: StdRng,
}

impl IntervalEffect for ShakyTilesEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_tiled(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        let range = self.p.randrange;
        for i in 0..self.p.grid.cols {
            for j in 0..self.p.grid.rows {
                let dx = self.rng.gen_range(-range..=range);
                let dy = self.rng.gen_range(-range..=range);
                let dz = if self.p.shake_z {
                    self.rng.gen_range(-range..=range)
                } else {
                    0.0
                };
                let g = tiled_mut(target)?;
                let t = g.original_tile(i, j).offset(Vec3::new(dx, dy, dz));
                g.set_tile(i, j, t);
            }
        }
        Ok(())
    }
}

/// Like [`ShakyTiles`] but the jitter is drawn once, on the first update, and
/// frozen for the rest of the run: a single shatter rather than a sustained
/// shake.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ShatteredTiles {
    pub grid: GridSize,
    pub duration: f64,
    pub randrange: f64,
    pub shake_z: bool,
    pub seed: Option<u64>,
}

impl ShatteredTiles {
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

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        Box::new(ShatteredTilesEffect {
            p: self.clone(),
            rng: rng_for(self.seed),
            offsets: None,
        })
    }
}

#[derive(Debug)]
struct ShatteredTilesEffect {
    p: ShatteredTiles,
    rng: StdRng,
    /// One rigid offset per tile, drawn on the first update.
    offsets: Option<Vec<Vec3>>,
}

impl IntervalEffect for ShatteredTilesEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        self.offsets = None;
        attach_tiled(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, _f: f64) -> KinemaResult<()> {
        if self.offsets.is_none() {
            let range = self.p.randrange;
            let shake_z = self.p.shake_z;
            let count = self.p.grid.cell_count();
            let offsets = (0..count)
                .map(|_| {
                    Vec3::new(
                        self.rng.gen_range(-range..=range),
                        self.rng.gen_range(-range..=range),
                        if shake_z {
                            self.rng.gen_range(-range..=range)
                        } else {
                            0.0
                        },
                    )
                })
                .collect();
            self.offsets = Some(offsets);
        }
        let Some(offsets) = self.offsets.as_deref() else {
            return Ok(());
        };
        let g = tiled_mut(target)?;
        let mut k = 0;
        for i in 0..self.p.grid.cols {
            for j in 0..self.p.grid.rows {
                let t = g.original_tile(i, j).offset(offsets[k]);
                g.set_tile(i, j, t);
                k += 1;
            }
        }
        Ok(())
    }
}

/// Checkerboard hop: even-parity tiles lift while odd-parity tiles dip, both
/// on z, oscillating `jumps` times over the run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JumpTiles {
    pub grid: GridSize,
    pub duration: f64,
    pub jumps: u32,
    pub amplitude: f64,
}

impl JumpTiles {
    pub fn new(grid: GridSize, duration: f64, jumps: u32, amplitude: f64) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            jumps,
            amplitude,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)?;
        check_waves(self.jumps)?;
        check_amplitude(self.amplitude)
    }

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        Box::new(JumpTilesEffect {
            p: self.clone(),
            amplitude_rate: 1.0,
        })
    }
}

#[derive(Debug)]
struct JumpTilesEffect {
    p: JumpTiles,
    amplitude_rate: f64,
}

impl IntervalEffect for JumpTilesEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_tiled(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let dz = self.p.amplitude
            * self.amplitude_rate
            * (2.0 * PI * f64::from(self.p.jumps) * f).sin();
        let g = tiled_mut(target)?;
        for i in 0..self.p.grid.cols {
            for j in 0..self.p.grid.rows {
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                let t = g
                    .original_tile(i, j)
                    .offset(Vec3::new(0.0, 0.0, sign * dz));
                g.set_tile(i, j, t);
            }
        }
        Ok(())
    }

    fn set_amplitude_rate(&mut self, rate: f64) {
        self.amplitude_rate = rate;
    }
}

/// Which way the [`FadeOutTiles`] shrink sweeps across the grid. Tiles on the
/// named side are the last to disappear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FadeOutDirection {
    TopRight,
    BottomLeft,
    Up,
    Down,
}

/// Shrinks tiles to nothing in a directional sweep: each tile has a fixed
/// threshold in `(0, 1]` by its grid position, and shrinks sharply once the
/// run fraction passes it.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FadeOutTiles {
    pub grid: GridSize,
    pub duration: f64,
    pub direction: FadeOutDirection,
}

impl FadeOutTiles {
    pub fn new(grid: GridSize, duration: f64, direction: FadeOutDirection) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            direction,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)
    }

    fn threshold(&self, i: u32, j: u32) -> f64 {
        let cols = f64::from(self.grid.cols);
        let rows = f64::from(self.grid.rows);
        match self.direction {
            FadeOutDirection::TopRight => f64::from(i + j + 2) / (cols + rows),
            FadeOutDirection::BottomLeft => {
                f64::from((self.grid.cols - i) + (self.grid.rows - j)) / (cols + rows)
            }
            FadeOutDirection::Up => f64::from(j + 1) / rows,
            FadeOutDirection::Down => f64::from(self.grid.rows - j) / rows,
        }
    }

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        Box::new(FadeOutTilesEffect { p: self.clone() })
    }
}

#[derive(Debug)]
struct FadeOutTilesEffect {
    p: FadeOutTiles,
}

impl IntervalEffect for FadeOutTilesEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        attach_tiled(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        for i in 0..self.p.grid.cols {
            for j in 0..self.p.grid.rows {
                let scale = if f <= 0.0 {
                    1.0
                } else {
                    clamp01((self.p.threshold(i, j) / f).powi(6))
                };
                let g = tiled_mut(target)?;
                let t = g.original_tile(i, j).scaled(scale);
                g.set_tile(i, j, t);
            }
        }
        Ok(())
    }
}

/// Collapses tiles one by one in a seeded-random order; at fraction `f` the
/// first `floor(f * count)` tiles of the shuffled order are off, the rest on.
/// Driving `f` backwards turns them back on in reverse order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TurnOffTiles {
    pub grid: GridSize,
    pub duration: f64,
    pub seed: Option<u64>,
}

impl TurnOffTiles {
    pub fn new(grid: GridSize, duration: f64, seed: Option<u64>) -> KinemaResult<Self> {
        let p = Self {
            grid,
            duration,
            seed,
        };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> KinemaResult<()> {
        check_duration(self.duration)
    }

    pub(crate) fn effect(&self) -> Box<dyn IntervalEffect> {
        Box::new(TurnOffTilesEffect {
            p: self.clone(),
            order: Vec::new(),
        })
    }
}

#[derive(Debug)]
struct TurnOffTilesEffect {
    p: TurnOffTiles,
    /// Shuffled tile coordinates, fixed at start.
    order: Vec<(u32, u32)>,
}

impl IntervalEffect for TurnOffTilesEffect {
    fn start(&mut self, target: &mut NodeState) -> KinemaResult<()> {
        let mut order: Vec<(u32, u32)> = (0..self.p.grid.cols)
            .flat_map(|i| (0..self.p.grid.rows).map(move |j| (i, j)))
            .collect();
        let mut rng = rng_for(self.p.seed);
        order.shuffle(&mut rng);
        self.order = order;
        attach_tiled(target, self.p.grid)
    }

    fn update(&mut self, target: &mut NodeState, f: f64) -> KinemaResult<()> {
        let count = self.order.len();
        let off = ((clamp01(f) * count as f64).floor() as usize).min(count);
        let g = tiled_mut(target)?;
        for (k, &(i, j)) in self.order.iter().enumerate() {
            if k < off {
                g.turn_off(i, j);
            } else {
                g.turn_on(i, j);
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
        NodeState::new(Vec2::new(80.0, 80.0))
    }

    fn grid() -> GridSize {
        GridSize::new(4, 4).unwrap()
    }

    fn tiles(s: &NodeState) -> &TiledGrid {
        s.grid.as_ref().unwrap().tiled().unwrap()
    }

    #[test]
    fn shaky_tiles_move_rigidly() {
        let mut s = state();
        let mut e = ShakyTiles::new(grid(), 1.0, 3.0, false, Some(11)).unwrap().effect();
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.5).unwrap();
        let g = tiles(&s);
        let t = g.tile(2, 2);
        let o = g.original_tile(2, 2);
        let d = t.bl - o.bl;
        // All four corners carry the same offset.
        assert_eq!(t.br - o.br, d);
        assert_eq!(t.tl - o.tl, d);
        assert_eq!(t.tr - o.tr, d);
        assert!(d.x.abs() <= 3.0 && d.y.abs() <= 3.0 && d.z == 0.0);
    }

    #[test]
    fn shattered_tiles_freeze_after_first_update() {
        let mut s = state();
        let mut e = ShatteredTiles::new(grid(), 1.0, 3.0, true, Some(5)).unwrap().effect();
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.1).unwrap();
        let first = tiles(&s).tiles().to_vec();
        e.update(&mut s, 0.6).unwrap();
        assert_eq!(tiles(&s).tiles(), &first[..]);
    }

    #[test]
    fn jump_tiles_alternate_by_parity() {
        let mut s = state();
        let mut e = JumpTiles::new(grid(), 1.0, 1, 10.0).unwrap().effect();
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.25).unwrap(); // sin peak
        let g = tiles(&s);
        approx::assert_abs_diff_eq!(g.tile(0, 0).bl.z, 10.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(g.tile(0, 1).bl.z, -10.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(g.tile(1, 1).bl.z, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn fade_out_starts_whole_and_ends_collapsed() {
        let mut s = state();
        let p = FadeOutTiles::new(grid(), 1.0, FadeOutDirection::TopRight).unwrap();
        let mut e = p.effect();
        e.start(&mut s).unwrap();
        e.update(&mut s, 0.0).unwrap();
        {
            let g = tiles(&s);
            assert_eq!(g.tile(0, 0), g.original_tile(0, 0));
            assert_eq!(g.tile(3, 3), g.original_tile(3, 3));
        }
        e.update(&mut s, 1.0).unwrap();
        let g = tiles(&s);
        // Bottom-left tile (lowest threshold) is all but collapsed.
        let t = g.tile(0, 0);
        assert!((t.tr - t.bl).x < 0.01);
        // Top-right tile has threshold 1.0 and survives intact.
        assert_eq!(g.tile(3, 3), g.original_tile(3, 3));
    }

    #[test]
    fn turn_off_is_monotone_and_reversible() {
        let mut s = state();
        let p = TurnOffTiles::new(grid(), 1.0, Some(3)).unwrap();
        let mut e = p.effect();
        e.start(&mut s).unwrap();

        let off_count = |s: &NodeState| {
            let g = tiles(s);
            g.tiles().iter().filter(|t| t.bl == t.tr).count()
        };

        e.update(&mut s, 0.0).unwrap();
        assert_eq!(off_count(&s), 0);
        e.update(&mut s, 0.5).unwrap();
        assert_eq!(off_count(&s), 8);
        e.update(&mut s, 1.0).unwrap();
        assert_eq!(off_count(&s), 16);
        // Driving the fraction backwards restores tiles.
        e.update(&mut s, 0.5).unwrap();
        assert_eq!(off_count(&s), 8);
        e.update(&mut s, 0.0).unwrap();
        assert_eq!(off_count(&s), 0);
    }

    #[test]
    fn same_seed_same_turn_off_order() {
        let p = TurnOffTiles::new(grid(), 1.0, Some(42)).unwrap();
        let mut s1 = state();
        let mut s2 = state();
        let mut e1 = p.effect();
        let mut e2 = p.effect();
        e1.start(&mut s1).unwrap();
        e2.start(&mut s2).unwrap();
        e1.update(&mut s1, 0.3).unwrap();
        e2.update(&mut s2, 0.3).unwrap();
        assert_eq!(tiles(&s1).tiles(), tiles(&s2).tiles());
    }
}
