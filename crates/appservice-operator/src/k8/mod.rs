//!
//! # Kubernetes objects derived from AppService
//!
pub mod objects;
