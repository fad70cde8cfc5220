pub mod breakfast;
pub mod corrections;
pub mod db_utils;
pub mod initialize;
pub mod ledger;
pub mod log;
pub mod meals;
pub mod migrate;
pub mod months;
pub mod pool;
pub mod stats;
pub mod users;
