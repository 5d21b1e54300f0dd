use axum::extract::{Multipart, multipart::Field};
use serde::de::DeserializeOwned;

use crate::{
    error::{AppError, AppResult},
    storage::UploadFile,
};

/// Catalog create/update form: a `data` part holding the JSON payload and an
/// optional `image` file part.
pub struct CatalogForm<T> {
    pub payload: T,
    pub image: Option<UploadFile>,
}

pub async fn read_catalog_form<T: DeserializeOwned>(
    mut multipart: Multipart,
) -> AppResult<CatalogForm<T>> {
    let mut payload: Option<T> = None;
    let mut image: Option<UploadFile> = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Read error: {e}")))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| AppError::Validation(format!("data: {e}")))?;
                payload = Some(parsed);
            }
            Some("image") => {
                let file = read_file(field).await?;
                // browsers send an empty part when no file was picked
                if !file.bytes.is_empty() || !file.file_name.is_empty() {
                    image = Some(file);
                }
            }
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| AppError::Validation("data: field is required".into()))?;
    Ok(CatalogForm { payload, image })
}

/// Every `files` part of a bulk upload.
pub async fn read_files(mut multipart: Multipart) -> AppResult<Vec<UploadFile>> {
    let mut files = Vec::new();
    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().map(str::to_string);
        if matches!(name.as_deref(), Some("files") | Some("file")) {
            files.push(read_file(field).await?);
        }
    }
    Ok(files)
}

async fn next_field(multipart: &mut Multipart) -> AppResult<Option<Field<'_>>> {
    multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))
}

async fn read_file(field: Field<'_>) -> AppResult<UploadFile> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Read error: {e}")))?
        .to_vec();
    Ok(UploadFile {
        file_name,
        content_type,
        bytes,
    })
}
