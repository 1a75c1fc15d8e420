//!
//! # AppService CRD
//!
//! Binding of the AppService spec to the k8 key value store
//!
use crate::k8_types::{Crd, CrdNames, DefaultHeader, Spec, Status};
use crate::{GROUP, V1};

use super::AppServiceSpec;
use super::AppServiceStatus;

pub const APPSERVICE_API: Crd = Crd {
    group: GROUP,
    version: V1,
    names: CrdNames {
        kind: "AppService",
        plural: "appservices",
        singular: "appservice",
    },
};

impl Spec for AppServiceSpec {
    type Status = AppServiceStatus;
    type Header = DefaultHeader;

    fn metadata() -> &'static Crd {
        &APPSERVICE_API
    }
}

impl Status for AppServiceStatus {}
