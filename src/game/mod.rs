//! Game core: the grid/win detector, the bingo set generator, and the
//! session state machine that orchestrates them.

pub mod generator;
pub mod grid;
pub mod session;

pub use generator::{draw, BingoSet, SET_SIZE};
pub use grid::{detect_wins, GridCell, GRID_SIZE, WINNING_LINES};
pub use session::{GameEngine, GameError, NavOutcome, Phase, SessionRecord, SessionSnapshot};
