mod deployment;
mod service;

pub use deployment::*;
pub use service::*;

use std::collections::HashMap;

use k8_types::InputObjectMeta;

use appservice_metadata::appservice::{AppServiceObj, AppServiceSpec};

pub const APP_LABEL: &str = "app";

/// pod labels and selector of an instance
pub fn app_labels(name: &str) -> HashMap<String, String> {
    let mut labels = HashMap::new();
    labels.insert(APP_LABEL.to_owned(), name.to_owned());
    labels
}

/// metadata shared by derived objects: same name and namespace, controlled by the instance
fn owned_metadata(app: &AppServiceObj) -> InputObjectMeta {
    let metadata = &app.metadata;
    let mut owner_ref = metadata.make_owner_reference::<AppServiceSpec>();
    owner_ref.controller = Some(true);
    owner_ref.block_owner_deletion = true;

    InputObjectMeta {
        name: metadata.name.clone(),
        namespace: metadata.namespace.clone(),
        owner_references: vec![owner_ref],
        ..Default::default()
    }
}
