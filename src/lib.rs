pub mod accounts;
pub mod api;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod pagination;
pub mod recipes;

#[cfg(test)]
pub mod test_helpers;
