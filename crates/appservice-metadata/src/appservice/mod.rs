mod spec;
mod status;
mod k8;

pub use spec::*;
pub use status::*;
pub use k8::*;

use crate::k8_types::K8Obj;

/// AppService as stored in the cluster
pub type AppServiceObj = K8Obj<AppServiceSpec>;
