//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod doctor;
mod list;
mod report;
mod search;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use list::run_list;
pub use report::run_report;
pub use search::run_search;
pub use serve::run_serve;
