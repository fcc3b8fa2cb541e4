mod title;

pub use title::{normalize, title_path_segment};
