use serde::Serialize;
use utoipa::ToSchema;

use crate::storage::UploadOutcome;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadList {
    pub items: Vec<UploadOutcome>,
}
