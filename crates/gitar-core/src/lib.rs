pub mod config;
pub mod logging;

pub mod dedup;
pub mod listing;
pub mod lock;
pub mod pipeline;
pub mod reference;
pub mod resolver;
pub mod retry;
pub mod storage;
pub mod tools;
