//! # topnet_iac
//!
//! Deployment descriptor generation: lowers a topology graph into Terraform
//! JSON (`main.tf.json`) for the AWS provider. Generation is pure and
//! deterministic; the same graph always yields the same bytes, and the
//! input graph is never modified.

pub mod error;
pub mod generator;
pub mod images;
pub mod names;
pub mod user_data;

pub use error::{IacError, IacResult};
pub use generator::{generate_terraform, TerraformFile, TerraformGenerator};
