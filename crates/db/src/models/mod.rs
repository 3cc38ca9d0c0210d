pub mod comment;
pub mod contributor;
pub mod ids;
pub mod issue;
pub mod project;
pub mod user;
