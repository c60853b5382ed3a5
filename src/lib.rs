pub mod cli;
pub mod compare;
pub mod competition;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod fetch;
pub mod http_client;
pub mod logging;
pub mod pipeline;
pub mod profile;
pub mod search;
pub mod season_table;
pub mod similarity;
pub mod worker;
