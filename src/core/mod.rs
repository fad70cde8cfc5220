pub mod attendance;
pub mod auth;
pub mod backup;
pub mod breakfast;
pub mod calculator;
pub mod correction;
pub mod ledger;
pub mod log;
pub mod month;
pub mod users;
