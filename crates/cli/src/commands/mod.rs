pub mod chat;
pub mod onboard;
pub mod retrieve;
pub mod session;
