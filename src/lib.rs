//! Two-layer tile-map editing engine: grid store, tile transforms, render
//! cache, undo history, painting tools, zoom mapping and project I/O.
#![allow(clippy::too_many_arguments)]

pub mod logger;

pub mod assets;
pub mod cli;
pub mod components;
pub mod grid;
pub mod io;
pub mod ops;
pub mod session;
pub mod settings;

pub use grid::{Cell, Grid, LayerId, Rotation, TileId};
pub use session::EditorSession;
