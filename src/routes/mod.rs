pub mod analysis;
pub mod audit;
pub mod chat;
