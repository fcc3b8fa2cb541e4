use serde::Serialize;

/// Cells per grid (5×5).
pub const GRID_SIZE: usize = 25;

/// Cells per winning line.
pub const LINE_LEN: usize = 5;

/// The twelve fixed winning lines: 5 rows, 5 columns, 2 diagonals.
/// Line indices reported by [`detect_wins`] index into this table.
pub const WINNING_LINES: [[usize; LINE_LEN]; 12] = [
    // Rows
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    // Columns
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    // Diagonals
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

/// One cell of the 5×5 target grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridCell {
    pub id: usize,
    pub article: String,
    pub matched: bool,
}

/// Returns the index of every line whose five cells are all matched.
/// Zero, one, or several lines may be returned for one call.
///
/// ```
/// use wikibingo::game::grid::detect_wins;
///
/// let mut matched = [false; 25];
/// for i in 0..5 {
///     matched[i] = true; // row 0
/// }
/// assert_eq!(detect_wins(&matched), vec![0]);
/// ```
pub fn detect_wins(matched: &[bool; GRID_SIZE]) -> Vec<usize> {
    WINNING_LINES
        .iter()
        .enumerate()
        .filter(|(_, line)| line.iter().all(|&cell| matched[cell]))
        .map(|(index, _)| index)
        .collect()
}
