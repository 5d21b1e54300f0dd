use crate::{
    dto::uploads::UploadList,
    error::{AppError, AppResult},
    middleware::auth::Session,
    response::{ApiResponse, Meta},
    state::AppState,
    storage::{self, UploadFile, UploadOutcome},
};

/// Upload a batch of images ahead of a catalog edit. Each file gets its own
/// outcome; one rejected file does not fail the others.
pub async fn upload_images(
    state: &AppState,
    session: &Session,
    files: Vec<UploadFile>,
) -> AppResult<ApiResponse<UploadList>> {
    session.require_admin()?;
    if files.is_empty() {
        return Err(AppError::Validation("files: at least one file is required".into()));
    }

    let mut slots: Vec<Option<UploadOutcome>> = Vec::with_capacity(files.len());
    let mut accepted = Vec::new();
    for file in files {
        match storage::validate_image(&file, state.max_upload_bytes) {
            Ok(()) => {
                slots.push(None);
                accepted.push(file);
            }
            Err(err) => slots.push(Some(UploadOutcome::Failed {
                error: err.public_message(),
            })),
        }
    }

    let stored = if accepted.is_empty() {
        Vec::new()
    } else {
        state.storage.upload(accepted).await?
    };
    let mut stored = stored.into_iter();

    let items: Vec<UploadOutcome> = slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                stored.next().unwrap_or(UploadOutcome::Failed {
                    error: "store returned no result".into(),
                })
            })
        })
        .collect();

    let failed = items
        .iter()
        .filter(|o| matches!(o, UploadOutcome::Failed { .. }))
        .count();
    tracing::info!(total = items.len(), failed, "images uploaded");

    Ok(ApiResponse::success(
        "Upload finished",
        UploadList { items },
        Some(Meta::empty()),
    ))
}
