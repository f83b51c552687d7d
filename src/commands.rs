pub mod admin;
pub mod import;
pub mod migrate;
pub mod serve;
