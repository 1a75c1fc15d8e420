use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// AppService status; the operator records its progress in annotations, not here
#[derive(Deserialize, Serialize, Default, Debug, Clone, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppServiceStatus {}

impl fmt::Display for AppServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:#?}")
    }
}
