pub mod settlement;
pub mod split;
