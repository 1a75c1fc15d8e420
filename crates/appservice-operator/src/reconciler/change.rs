//!
//! # Change detection
//!
//! The spec applied by the last successful pass is kept as json in an annotation
//! of the instance. Derived objects are stale when it is missing or differs from
//! the current spec.
//!
use appservice_metadata::appservice::{AppServiceObj, AppServiceSpec};

use crate::core::ObjectKey;
use crate::error::ReconcileError;

pub const BASELINE_ANNOTATION: &str = "spec";

/// true if derived objects must be synchronized.
/// both sides are compared in canonical encoding so field order and defaults don't matter
pub fn is_stale(app: &AppServiceObj) -> Result<bool, ReconcileError> {
    let Some(baseline) = app.metadata.annotations.get(BASELINE_ANNOTATION) else {
        return Ok(true);
    };

    let recorded: AppServiceSpec =
        serde_json::from_str(baseline).map_err(|source| ReconcileError::MalformedBaseline {
            key: ObjectKey::from(&app.metadata).to_string(),
            source,
        })?;

    Ok(encode(app, &recorded)? != encode(app, &app.spec)?)
}

/// store current spec as baseline; caller persists the instance
pub fn record_baseline(app: &mut AppServiceObj) -> Result<(), ReconcileError> {
    let baseline = encode(app, &app.spec)?;
    app.metadata
        .annotations
        .insert(BASELINE_ANNOTATION.to_owned(), baseline);
    Ok(())
}

fn encode(app: &AppServiceObj, spec: &AppServiceSpec) -> Result<String, ReconcileError> {
    serde_json::to_string(spec).map_err(|source| ReconcileError::Encode {
        key: ObjectKey::from(&app.metadata).to_string(),
        source,
    })
}
