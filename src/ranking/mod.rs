pub mod ranked_window;

pub use ranked_window::{prior_period_window, top_n, RankWindow};
