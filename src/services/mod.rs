pub mod generator;
pub mod history;
pub mod paginator;
pub mod session;
