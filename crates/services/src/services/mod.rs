pub mod account;
pub mod authorization;
pub mod comment;
pub mod config;
pub mod contributor;
pub mod error;
pub mod issue;
pub mod membership;
pub mod project;
