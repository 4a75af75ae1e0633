//! Derived views over cached records
//!
//! Every function here is pure: records and a view specification in, a new
//! projection out. Nothing reads the cache or the identity on its own.

mod aggregate;
mod filter;
mod leaderboard;
mod sort;

pub use aggregate::{aggregate, summarize, DashboardSummary, GroupKey, UNSET_BUCKET};
pub use filter::{filter, submissions_of, RecordFilter, SearchField, TextSearch};
pub use leaderboard::{leaderboard, LeaderboardPolicy, RankedUser};
pub use sort::{sort, SortDirection, SortKey, SortSpec, TieBreak};
