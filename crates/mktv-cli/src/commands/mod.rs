pub mod catalog;
pub mod comments;
pub mod config;
pub mod history;
pub mod session;
pub mod watch;
pub mod watchlist;
