//! Session matching engine for a wiki-link bingo game.
//!
//! A player starts from a random encyclopedia article and follows
//! hyperlinks to hit 25 target articles arranged on a 5×5 grid, winning on
//! any completed row, column, or diagonal. This crate is the engine behind
//! that: it reconciles asynchronously-resolved navigation against the
//! target set under title-equivalence ambiguity (redirects, capitalization,
//! whitespace), keeps the timer/loading state machine consistent, detects
//! completed lines, and manages two bounded caches plus a shared
//! retry/backoff policy for the unreliable upstream content endpoints.
//!
//! The host drives it through three calls:
//!
//! - [`GameEngine::start_new_game`] — draw a fresh set and load the
//!   starting article
//! - [`GameEngine::register_navigation`] — feed it each link/history click
//! - [`GameEngine::snapshot`] — read back state to render
//!
//! Rendering, leaderboard persistence, and catalog/asset loading are the
//! host's problem; the engine performs no I/O beyond the content endpoints.

pub mod catalog;
pub mod config;
pub mod content;
pub mod game;
pub mod net;
pub mod util;

pub use catalog::{Catalog, CatalogError, Category};
pub use config::{Config, ConfigError};
pub use content::{Article, ArticleFetcher, ContentError, FifoCache, RedirectResolver, Resolution};
pub use game::{
    detect_wins, draw, BingoSet, GameEngine, GameError, GridCell, NavOutcome, Phase,
    SessionRecord, SessionSnapshot, GRID_SIZE, SET_SIZE, WINNING_LINES,
};
pub use net::{retry, RetryPolicy, Retryable};
