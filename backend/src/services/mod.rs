pub mod auth;
pub mod bets;
pub mod challenges;
pub mod clock;
pub mod ledger;
pub mod overall_streak;
pub mod settlement;
pub mod streak;
pub mod time_entries;
pub mod users;
