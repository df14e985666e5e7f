mod chat;
mod report;

pub use chat::*;
pub use report::*;
