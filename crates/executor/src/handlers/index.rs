//! Path index handlers.

use bridge_core::ObjectPath;
use tracing::info;

use crate::bridge::Remote;
use crate::convert::convert_result;
use crate::types::Resolution;
use crate::{Error, Output, Result};

/// Handle IndexSubtree command.
pub fn index_subtree(r: &mut Remote<'_>, root: ObjectPath, extend: bool) -> Result<Output> {
    let count = if extend {
        convert_result(r.index.extend(&mut *r.session, &root))?
    } else {
        convert_result(r.index.build(&mut *r.session, &root))?
    };
    info!(target: "bridge::index", root = %root, count, extend, "Indexed subtree");
    Ok(Output::Indexed {
        count,
        entries: r.index.entries_under(&root),
    })
}

/// Handle ResolvePaths command.
///
/// Never fails as a whole: each path reports its own result.
pub fn resolve_paths(r: &mut Remote<'_>, paths: Vec<ObjectPath>) -> Result<Output> {
    let results = r.index.resolve_entries(&mut *r.session, &paths);
    Ok(Output::Resolved(
        paths
            .into_iter()
            .zip(results)
            .map(|(path, result)| match result {
                Ok(entry) => Resolution {
                    path,
                    object_id: Some(entry.object_id),
                    object_type: Some(entry.object_type),
                    error: None,
                },
                Err(e) => Resolution {
                    path,
                    object_id: None,
                    object_type: None,
                    error: Some(Error::from(e)),
                },
            })
            .collect(),
    ))
}
