//! Locations
//!
//! The tree of locations aliases point to

use serde::Serialize;

use crate::aliases::LocationId;

/// Parent ID of the root location
pub const NO_PARENT: LocationId = 0;

/// A single node in the location tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Location ID
    pub id: LocationId,

    /// Parent location ID, [`NO_PARENT`](NO_PARENT) for the root location
    pub parent_id: LocationId,
}
