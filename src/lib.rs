#![forbid(unsafe_code)]

pub mod action;
pub mod core;
pub mod ease;
pub mod error;
pub mod grid;
pub mod grid_actions;
mod interval;
pub mod node;
pub mod quad_actions;
mod run;
mod runner;
pub mod tiled_actions;

pub use action::{Action, ActionKind};
pub use core::{GridSize, Point, Vec2, Vec3};
pub use error::{KinemaError, KinemaResult};
pub use grid::{GridAttachment, MeshGrid, Tile, TiledGrid};
pub use grid_actions::{Lens3D, Liquid, Ripple3D, Shaky3D, Twirl, Warp, Waves, Waves3D};
pub use node::{Node, NodeId, NodeState, Scene};
pub use quad_actions::{QuadDeform, QuadMove};
pub use runner::ActionHandle;
pub use tiled_actions::{
    FadeOutDirection, FadeOutTiles, JumpTiles, ShakyTiles, ShatteredTiles, TurnOffTiles,
};
