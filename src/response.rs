use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Meta {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub total: Option<i64>,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            total: Some(total),
        }
    }

    pub fn empty() -> Self {
        Self {
            page: None,
            per_page: None,
            total: None,
        }
    }
}

/// Uniform result envelope returned by every action.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            meta,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            meta: None,
        }
    }

    /// Fold an action result into the envelope the presentation layer sees.
    pub fn from_result(result: AppResult<Self>) -> Self {
        match result {
            Ok(resp) => resp,
            Err(err) => {
                err.log();
                Self::failure(err.public_message())
            }
        }
    }
}
