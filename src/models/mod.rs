pub mod balance;
pub mod breakfast;
pub mod category;
pub mod correction;
pub mod meal_record;
pub mod month_settings;
pub mod state;
pub mod transaction;
pub mod user;
