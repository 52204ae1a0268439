use msync_schemas::{FieldUpdate, RowHandle};
use serde::{Deserialize, Serialize};

/// Field assignments derived from one matched batch row.
///
/// `target` is the handle of the single manifest row the batch key resolved
/// to; writers must apply `update` to that handle and nothing else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeInstruction {
    pub sample_id: String,
    pub target: RowHandle,
    pub update: FieldUpdate,
}

impl MergeInstruction {
    pub fn destination_fields(&self) -> impl Iterator<Item = &str> {
        self.update.fields()
    }
}
