use crate::{
    core::{GridSize, Vec2, Vec3},
    error::{KinemaError, KinemaResult},
};

/// Regular deformation mesh: `(cols + 1) x (rows + 1)` vertices laid over the
/// node surface, shared between neighbouring cells so warps bend a continuous
/// surface.
///
/// `original` is the snapshot taken at construction and never written again;
/// every warp recomputes `active` from it, which is what makes warps
/// replayable at arbitrary `t`.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshGrid {
    size: GridSize,
    step: Vec2,
    original: Vec<Vec3>,
    active: Vec<Vec3>,
}

impl MeshGrid {
    pub fn new(size: GridSize, surface: Vec2) -> KinemaResult<Self> {
        if !(surface.x > 0.0) || !(surface.y > 0.0) {
            return Err(KinemaError::config(
                "mesh grid needs a node surface with positive width and height",
            ));
        }
        let step = Vec2::new(
            surface.x / f64::from(size.cols),
            surface.y / f64::from(size.rows),
        );
        let mut original = Vec::with_capacity(size.vertex_count());
        for i in 0..=size.cols {
            for j in 0..=size.rows {
                original.push(Vec3::new(
                    f64::from(i) * step.x,
                    f64::from(j) * step.y,
                    0.0,
                ));
            }
        }
        let active = original.clone();
        Ok(Self {
            size,
            step,
            original,
            active,
        })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// World size of one grid cell.
    pub fn step(&self) -> Vec2 {
        self.step
    }

    fn idx(&self, i: u32, j: u32) -> usize {
        debug_assert!(i <= self.size.cols && j <= self.size.rows);
        (i as usize) * ((self.size.rows + 1) as usize) + (j as usize)
    }

    /// Current (warped) vertex at column `i`, row `j`.
    pub fn vertex(&self, i: u32, j: u32) -> Vec3 {
        self.active[self.idx(i, j)]
    }

    /// Undeformed snapshot vertex.
    pub fn original_vertex(&self, i: u32, j: u32) -> Vec3 {
        self.original[self.idx(i, j)]
    }

    /// Writes into the active buffer only; the snapshot is immutable.
    pub fn set_vertex(&mut self, i: u32, j: u32, v: Vec3) {
        let idx = self.idx(i, j);
        self.active[idx] = v;
    }

    /// Restore the active buffer to the undeformed snapshot.
    pub fn reset(&mut self) {
        self.active.copy_from_slice(&self.original);
    }

    /// The full active buffer, for the render collaborator.
    pub fn vertices(&self) -> &[Vec3] {
        &self.active
    }
}

/// One independently transformable quad of a [`TiledGrid`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub bl: Vec3,
    pub br: Vec3,
    pub tl: Vec3,
    pub tr: Vec3,
}

impl Tile {
    pub fn center(&self) -> Vec3 {
        (self.bl + self.br + self.tl + self.tr) * 0.25
    }

    /// Scale the quad about its own center. `k = 0` collapses it to a
    /// degenerate (invisible) point.
    pub fn scaled(&self, k: f64) -> Self {
        let c = self.center();
        Self {
            bl: c + (self.bl - c) * k,
            br: c + (self.br - c) * k,
            tl: c + (self.tl - c) * k,
            tr: c + (self.tr - c) * k,
        }
    }

    pub fn offset(&self, d: Vec3) -> Self {
        Self {
            bl: self.bl + d,
            br: self.br + d,
            tl: self.tl + d,
            tr: self.tr + d,
        }
    }
}

/// Tiled deformation grid: `cols x rows` quads with four private vertices
/// each, so warps can separate tiles instead of bending a continuous surface.
#[derive(Clone, Debug, PartialEq)]
pub struct TiledGrid {
    size: GridSize,
    step: Vec2,
    original: Vec<Tile>,
    active: Vec<Tile>,
}

impl TiledGrid {
    pub fn new(size: GridSize, surface: Vec2) -> KinemaResult<Self> {
        if !(surface.x > 0.0) || !(surface.y > 0.0) {
            return Err(KinemaError::config(
                "tiled grid needs a node surface with positive width and height",
            ));
        }
        let step = Vec2::new(
            surface.x / f64::from(size.cols),
            surface.y / f64::from(size.rows),
        );
        let mut original = Vec::with_capacity(size.cell_count());
        for i in 0..size.cols {
            for j in 0..size.rows {
                let x0 = f64::from(i) * step.x;
                let y0 = f64::from(j) * step.y;
                original.push(Tile {
                    bl: Vec3::new(x0, y0, 0.0),
                    br: Vec3::new(x0 + step.x, y0, 0.0),
                    tl: Vec3::new(x0, y0 + step.y, 0.0),
                    tr: Vec3::new(x0 + step.x, y0 + step.y, 0.0),
                });
            }
        }
        let active = original.clone();
        Ok(Self {
            size,
            step,
            original,
            active,
        })
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn step(&self) -> Vec2 {
        self.step
    }

    fn idx(&self, i: u32, j: u32) -> usize {
        debug_assert!(i < self.size.cols && j < self.size.rows);
        (i as usize) * (self.size.rows as usize) + (j as usize)
    }

    pub fn tile(&self, i: u32, j: u32) -> Tile {
        self.active[self.idx(i, j)]
    }

    pub fn original_tile(&self, i: u32, j: u32) -> Tile {
        self.original[self.idx(i, j)]
    }

    pub fn set_tile(&mut self, i: u32, j: u32, tile: Tile) {
        let idx = self.idx(i, j);
        self.active[idx] = tile;
    }

    /// Collapse the tile to a degenerate point at its undeformed center.
    pub fn turn_off(&mut self, i: u32, j: u32) {
        let t = self.original_tile(i, j).scaled(0.0);
        self.set_tile(i, j, t);
    }

    /// Restore the tile from the undeformed snapshot.
    pub fn turn_on(&mut self, i: u32, j: u32) {
        let t = self.original_tile(i, j);
        self.set_tile(i, j, t);
    }

    pub fn reset(&mut self) {
        self.active.copy_from_slice(&self.original);
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.active
    }
}

/// The grid currently driving a node's rendered surface, if any.
///
/// The render collaborator reads the active buffers between its before-draw
/// and after-draw hooks; the core's obligation is to keep them current and
/// correctly shaped.
#[derive(Clone, Debug, PartialEq)]
pub enum GridAttachment {
    Mesh(MeshGrid),
    Tiled(TiledGrid),
}

impl GridAttachment {
    pub fn reset(&mut self) {
        match self {
            Self::Mesh(g) => g.reset(),
            Self::Tiled(g) => g.reset(),
        }
    }

    pub fn mesh(&self) -> Option<&MeshGrid> {
        match self {
            Self::Mesh(g) => Some(g),
            Self::Tiled(_) => None,
        }
    }

    pub fn tiled(&self) -> Option<&TiledGrid> {
        match self {
            Self::Mesh(_) => None,
            Self::Tiled(g) => Some(g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Vec2 {
        Vec2::new(120.0, 60.0)
    }

    #[test]
    fn mesh_vertices_cover_surface() {
        let g = MeshGrid::new(GridSize::new(4, 3).unwrap(), surface()).unwrap();
        assert_eq!(g.vertices().len(), 20);
        assert_eq!(g.original_vertex(0, 0), Vec3::ZERO);
        assert_eq!(g.original_vertex(4, 3), Vec3::new(120.0, 60.0, 0.0));
        assert_eq!(g.original_vertex(2, 1), Vec3::new(60.0, 20.0, 0.0));
    }

    #[test]
    fn set_vertex_leaves_snapshot_untouched() {
        let mut g = MeshGrid::new(GridSize::new(2, 2).unwrap(), surface()).unwrap();
        g.set_vertex(1, 1, Vec3::new(0.0, 0.0, 9.0));
        assert_eq!(g.vertex(1, 1).z, 9.0);
        assert_eq!(g.original_vertex(1, 1).z, 0.0);
        g.reset();
        assert_eq!(g.vertex(1, 1), g.original_vertex(1, 1));
    }

    #[test]
    fn mesh_rejects_empty_surface() {
        assert!(MeshGrid::new(GridSize::new(2, 2).unwrap(), Vec2::new(0.0, 10.0)).is_err());
    }

    #[test]
    fn tiles_are_independent_quads() {
        let g = TiledGrid::new(GridSize::new(3, 2).unwrap(), surface()).unwrap();
        assert_eq!(g.tiles().len(), 6);
        let t = g.original_tile(1, 0);
        assert_eq!(t.bl, Vec3::new(40.0, 0.0, 0.0));
        assert_eq!(t.tr, Vec3::new(80.0, 30.0, 0.0));
    }

    #[test]
    fn turn_off_collapses_and_turn_on_restores() {
        let mut g = TiledGrid::new(GridSize::new(2, 2).unwrap(), surface()).unwrap();
        let orig = g.original_tile(0, 1);
        g.turn_off(0, 1);
        let off = g.tile(0, 1);
        assert_eq!(off.bl, off.tr);
        assert_eq!(off.bl, orig.center());
        g.turn_on(0, 1);
        assert_eq!(g.tile(0, 1), orig);
    }

    #[test]
    fn tile_scaled_keeps_center() {
        let g = TiledGrid::new(GridSize::new(1, 1).unwrap(), surface()).unwrap();
        let t = g.original_tile(0, 0);
        let half = t.scaled(0.5);
        assert_eq!(half.center(), t.center());
    }
}
