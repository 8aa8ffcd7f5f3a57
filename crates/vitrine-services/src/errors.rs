//! Translation of backend errors into the application taxonomy.

use vitrine_core::AppError;
use vitrine_db::DbError;
use vitrine_storage::StorageError;

pub(crate) fn upload_failed(err: StorageError) -> AppError {
    AppError::UploadFailed(err.to_string())
}

pub(crate) fn blob_delete_failed(err: StorageError) -> AppError {
    AppError::DeleteFailed(err.to_string())
}

pub(crate) fn metadata_write_failed(err: DbError) -> AppError {
    AppError::MetadataWriteFailed(err.to_string())
}

pub(crate) fn query_failed(err: DbError) -> AppError {
    AppError::QueryFailed(err.to_string())
}

pub(crate) fn document_delete_failed(err: DbError) -> AppError {
    AppError::DeleteFailed(err.to_string())
}

pub(crate) fn update_failed(err: DbError) -> AppError {
    match err {
        DbError::NotFound { collection, id } => {
            AppError::NotFound(format!("{}/{}", collection, id))
        }
        other => AppError::UpdateFailed(other.to_string()),
    }
}
