use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Role;

/// Session token claims issued by the auth provider.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub exp: usize,
}
