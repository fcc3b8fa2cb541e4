use crate::catalog::{Catalog, CatalogError};
use crate::config::Config;
use crate::content::{Article, ArticleFetcher, ContentError, RedirectResolver, Resolution};
use crate::game::generator::{self, SET_SIZE};
use crate::game::grid::{detect_wins, GridCell, GRID_SIZE};
use crate::util::normalize;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Replacement candidates tried before giving up and presenting an
/// empty-bodied article. Bounds the substitution loop when the reserve
/// itself is full of dead titles.
const MAX_SUBSTITUTION_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum GameError {
    /// No playable game can be constructed. The only hard failure the
    /// engine surfaces; everything network-side degrades gracefully.
    #[error("No usable catalog data: {0}")]
    CatalogUnavailable(#[from] CatalogError),

    #[error("Failed to construct HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Session lifecycle. `Won` is terminal: only `start_new_game` leaves it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    NotStarted,
    Loading,
    Active,
    Won,
}

/// Outcome of one navigation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavOutcome {
    /// Rejected at entry (navigation in flight, game not started, or
    /// already won) or superseded mid-flight by a new game. No state
    /// was mutated.
    Ignored,
    /// Processed to completion; content may have been substituted.
    Landed {
        /// Grid cell ids newly matched by this navigation.
        matched_cells: Vec<usize>,
        won: bool,
    },
}

/// Serializable snapshot of session state handed to the host for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub started: bool,
    pub won: bool,
    pub phase: Phase,
    pub grid: Vec<GridCell>,
    pub starting_article: String,
    /// Normalized titles matched so far; grows monotonically.
    pub matched_titles: Vec<String>,
    pub winning_line_indices: Vec<usize>,
    pub click_count: u32,
    pub elapsed_seconds: u64,
    pub timer_running: bool,
    pub article_loading: bool,
    pub history: Vec<String>,
    pub current_title: Option<String>,
}

/// Finished-session record emitted once on the transition to `Won`; the
/// leaderboard collaborator consumes it, this engine never writes it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub elapsed_seconds: u64,
    pub click_count: u32,
    /// `elapsed_seconds × click_count`; lower is better.
    pub score: u64,
    pub grid: Vec<GridCell>,
    pub history: Vec<String>,
    pub winning_lines: Vec<usize>,
    pub finished_at: DateTime<Utc>,
}

/// Accumulating stopwatch. Paused while an article loads, so
/// `running && loading` is unreachable by construction.
#[derive(Debug, Default)]
struct Stopwatch {
    accumulated: Duration,
    resumed_at: Option<Instant>,
}

impl Stopwatch {
    fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(since) = self.resumed_at.take() {
            self.accumulated += since.elapsed();
        }
    }

    fn is_running(&self) -> bool {
        self.resumed_at.is_some()
    }

    fn elapsed(&self) -> Duration {
        self.accumulated
            + self
                .resumed_at
                .map(|since| since.elapsed())
                .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    phase: Phase,
    grid: Vec<GridCell>,
    starting_article: String,
    matched_keys: HashSet<String>,
    winning_lines: Vec<usize>,
    click_count: u32,
    stopwatch: Stopwatch,
    article_loading: bool,
    history: Vec<String>,
    current_title: Option<String>,
    current_article: Option<Article>,
    reserve: Vec<String>,
}

impl SessionInner {
    fn matched_flags(&self) -> [bool; GRID_SIZE] {
        let mut flags = [false; GRID_SIZE];
        for cell in &self.grid {
            if cell.matched {
                flags[cell.id] = true;
            }
        }
        flags
    }

    fn snapshot(&self) -> SessionSnapshot {
        let mut matched_titles: Vec<String> = self.matched_keys.iter().cloned().collect();
        matched_titles.sort();
        SessionSnapshot {
            started: self.phase != Phase::NotStarted,
            won: self.phase == Phase::Won,
            phase: self.phase,
            grid: self.grid.clone(),
            starting_article: self.starting_article.clone(),
            matched_titles,
            winning_line_indices: self.winning_lines.clone(),
            click_count: self.click_count,
            elapsed_seconds: self.stopwatch.elapsed().as_secs(),
            timer_running: self.stopwatch.is_running(),
            article_loading: self.article_loading,
            history: self.history.clone(),
            current_title: self.current_title.clone(),
        }
    }

    fn record(&self) -> SessionRecord {
        let elapsed_seconds = self.stopwatch.elapsed().as_secs();
        SessionRecord {
            elapsed_seconds,
            click_count: self.click_count,
            score: elapsed_seconds * u64::from(self.click_count),
            grid: self.grid.clone(),
            history: self.history.clone(),
            winning_lines: self.winning_lines.clone(),
            finished_at: Utc::now(),
        }
    }
}

/// Releases the single-flight latch on every exit path.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The session state machine: composes the redirect resolver, article
/// fetcher, and win detector around a timer/click/history model.
///
/// Methods take `&self`; all mutation goes through a short-lived internal
/// lock that is never held across an await. Exactly one navigation is in
/// flight at a time — rapid clicks beyond the first are dropped, not
/// queued.
pub struct GameEngine {
    resolver: RedirectResolver,
    fetcher: ArticleFetcher,
    state: Mutex<SessionInner>,
    nav_in_flight: AtomicBool,
    /// Bumped by `start_new_game`; in-flight work from a previous game
    /// checks it before applying results and discards stale ones.
    epoch: AtomicU64,
    resolve_deadline: Duration,
    record_tx: Option<mpsc::Sender<SessionRecord>>,
}

impl GameEngine {
    pub fn new(config: &Config) -> Result<Self, GameError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("wikibingo/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let policy = config.retry_policy();
        Ok(Self {
            resolver: RedirectResolver::new(client.clone(), config.api_base.clone(), policy.clone()),
            fetcher: ArticleFetcher::new(client, config.rest_base.clone(), policy),
            state: Mutex::new(SessionInner::default()),
            nav_in_flight: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            resolve_deadline: config.resolve_deadline(),
            record_tx: None,
        })
    }

    /// Attach a channel that receives the finished-session record when a
    /// game is won.
    pub fn with_record_channel(mut self, tx: mpsc::Sender<SessionRecord>) -> Self {
        self.record_tx = Some(tx);
        self
    }

    /// Current session state for rendering. Cheap enough to call per frame.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().snapshot()
    }

    /// Starts a fresh session: draws a bingo set, populates the grid, and
    /// loads the starting article. Any in-flight navigation from a previous
    /// session is invalidated.
    ///
    /// The only hard failure is [`GameError::CatalogUnavailable`].
    pub async fn start_new_game(&self, catalog: &Catalog) -> Result<(), GameError> {
        let set = generator::draw(catalog, &mut rand::thread_rng())?;
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;

        let mut titles = set.titles;
        debug_assert_eq!(titles.len(), SET_SIZE);
        let starting = titles.pop().unwrap_or_default();

        {
            let mut state = self.state();
            *state = SessionInner {
                phase: Phase::Loading,
                grid: titles
                    .into_iter()
                    .enumerate()
                    .map(|(id, article)| GridCell {
                        id,
                        article,
                        matched: false,
                    })
                    .collect(),
                starting_article: starting.clone(),
                article_loading: true,
                reserve: set.reserve,
                ..SessionInner::default()
            };
        }
        tracing::info!(starting = %starting, relaxed = set.relaxed, "New game started");

        // Initial load: content failure escalates to substitution, never to
        // the host.
        let (article, _substituted_for) = self.fetch_or_substitute(&starting, epoch).await;

        let mut state = self.state();
        if self.epoch.load(Ordering::Acquire) != epoch {
            // A newer game superseded this load
            return Ok(());
        }
        state.starting_article = article.title.clone();
        state.current_title = Some(article.title.clone());
        state.history.push(article.title.clone());
        state.current_article = Some(article);
        state.article_loading = false;
        state.stopwatch.resume();
        state.phase = Phase::Active;
        Ok(())
    }

    /// Processes one navigation event (link click or history replay).
    ///
    /// Rejected wholesale when another navigation is in flight or the
    /// session is not `Active`; otherwise the click is counted immediately,
    /// before any network work, regardless of how that work turns out.
    pub async fn register_navigation(&self, title: &str) -> NavOutcome {
        if self
            .nav_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(title = title, "Navigation already in flight, ignoring");
            return NavOutcome::Ignored;
        }
        let _flight = FlightGuard(&self.nav_in_flight);

        let epoch = self.epoch.load(Ordering::Acquire);
        {
            let mut state = self.state();
            match state.phase {
                Phase::Active => {}
                // Won is terminal: no click, timer, or match mutation
                Phase::NotStarted | Phase::Loading | Phase::Won => {
                    return NavOutcome::Ignored;
                }
            }
            state.click_count += 1;
            state.stopwatch.pause();
            state.article_loading = true;
        }

        // Redirect resolution under its own wall-clock ceiling, independent
        // of the retry policy's per-call timeouts.
        let resolution =
            match tokio::time::timeout(self.resolve_deadline, self.resolver.resolve(title)).await {
                Ok(resolution) => resolution,
                Err(_) => {
                    tracing::warn!(
                        title = title,
                        deadline_s = self.resolve_deadline.as_secs(),
                        "Redirect resolution deadline exceeded, using literal title"
                    );
                    Resolution::Fallback(title.to_string())
                }
            };
        let resolved_title = resolution.into_title();

        let (article, substituted_for) = self.fetch_or_substitute(&resolved_title, epoch).await;

        // Comparison keys for the clicked article: literal and canonical
        // forms. When content was substituted the substitute's title is
        // deliberately excluded — the player never chose it.
        let mut clicked_keys: HashSet<String> = HashSet::new();
        clicked_keys.insert(normalize(title));
        clicked_keys.insert(normalize(&resolved_title));
        if substituted_for.is_none() {
            clicked_keys.insert(normalize(&article.title));
        }
        clicked_keys.remove("");

        // Bidirectional check: either side of a comparison may hold the
        // canonical form, so unmatched grid titles are resolved too (cached
        // after the first pass over the grid).
        let unmatched: Vec<(usize, String)> = {
            let state = self.state();
            state
                .grid
                .iter()
                .filter(|cell| !cell.matched)
                .map(|cell| (cell.id, cell.article.clone()))
                .collect()
        };
        let mut newly_matched: Vec<usize> = Vec::new();
        for (id, cell_title) in unmatched {
            if self.cell_matches(&cell_title, &clicked_keys).await {
                newly_matched.push(id);
            }
        }

        // Apply phase: re-check the epoch so a stale response from a
        // superseded session is discarded instead of applied.
        let mut state = self.state();
        if self.epoch.load(Ordering::Acquire) != epoch || state.phase != Phase::Active {
            return NavOutcome::Ignored;
        }

        if let Some(failed) = &substituted_for {
            let failed_key = normalize(failed);
            if let Some(cell) = state
                .grid
                .iter_mut()
                .find(|cell| !cell.matched && normalize(&cell.article) == failed_key)
            {
                tracing::info!(
                    cell = cell.id,
                    from = %cell.article,
                    to = %article.title,
                    "Replacing content-dead grid article with substitute"
                );
                newly_matched.retain(|&id| id != cell.id);
                cell.article = article.title.clone();
            }
        }

        state.article_loading = false;
        state.history.push(article.title.clone());
        state.current_title = Some(article.title.clone());
        state.current_article = Some(article);

        for &id in &newly_matched {
            state.grid[id].matched = true;
            let key = normalize(&state.grid[id].article);
            state.matched_keys.insert(key);
        }

        let lines = detect_wins(&state.matched_flags());
        let won = !lines.is_empty();
        let record = if won {
            state.phase = Phase::Won;
            state.winning_lines = lines;
            state.stopwatch.pause();
            tracing::info!(
                lines = ?state.winning_lines,
                clicks = state.click_count,
                elapsed_s = state.stopwatch.elapsed().as_secs(),
                "Bingo! Session won"
            );
            Some(state.record())
        } else {
            state.stopwatch.resume();
            None
        };
        drop(state);

        if let (Some(record), Some(tx)) = (record, &self.record_tx) {
            if let Err(e) = tx.try_send(record) {
                tracing::warn!(error = %e, "Failed to emit finished-session record");
            }
        }

        NavOutcome::Landed {
            matched_cells: newly_matched,
            won,
        }
    }

    async fn cell_matches(&self, cell_title: &str, clicked_keys: &HashSet<String>) -> bool {
        if clicked_keys.contains(&normalize(cell_title)) {
            return true;
        }
        // Grid-side resolution under the same ceiling as the clicked title,
        // so a slow endpoint cannot stall the whole match pass.
        let resolved = match tokio::time::timeout(
            self.resolve_deadline,
            self.resolver.resolve(cell_title),
        )
        .await
        {
            Ok(resolution) => resolution,
            Err(_) => return false,
        };
        clicked_keys.contains(&normalize(resolved.title()))
    }

    /// Fetches `title`, substituting reserve articles on
    /// [`ContentError::Unavailable`]. Returns the article plus the failed
    /// title when substitution happened, so the caller can patch a dead
    /// grid cell. Never fails: the terminal fallback is an empty body.
    async fn fetch_or_substitute(&self, title: &str, epoch: u64) -> (Article, Option<String>) {
        match self.fetcher.fetch(title).await {
            Ok(article) => return (article, None),
            Err(ContentError::Unavailable) => {}
            Err(e) => {
                tracing::warn!(title = title, error = %e, "Unexpected fetch failure, substituting");
            }
        }

        for _ in 0..MAX_SUBSTITUTION_ATTEMPTS {
            let candidate = {
                let mut state = self.state();
                if self.epoch.load(Ordering::Acquire) != epoch {
                    None
                } else {
                    state.reserve.pop()
                }
            };
            let Some(candidate) = candidate else { break };
            match self.fetcher.fetch(&candidate).await {
                Ok(article) => {
                    tracing::info!(
                        failed = title,
                        substitute = %candidate,
                        "Substituted replacement article for unavailable content"
                    );
                    return (article, Some(title.to_string()));
                }
                Err(e) => {
                    tracing::debug!(candidate = %candidate, error = %e, "Replacement candidate also unavailable");
                }
            }
        }

        tracing::warn!(title = title, "No replacement available, presenting empty content");
        (
            Article {
                title: title.to_string(),
                sanitized_html: String::new(),
            },
            None,
        )
    }

    fn state(&self) -> MutexGuard<'_, SessionInner> {
        self.state.lock().expect("session state mutex poisoned")
    }
}
