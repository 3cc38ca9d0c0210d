pub mod deployment;
pub mod error;
pub mod http;
pub mod routes;

#[cfg(test)]
pub mod test_support;

pub use deployment::{Deployment, DeploymentError};
