use culicidae_core::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Failed to encode row for table '{table}': {message}")]
    Encode { table: String, message: String },

    #[error("Failed to decode row '{key}' in table '{table}': {message}")]
    Decode {
        table: String,
        key: String,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Database(err.into_string())
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Encode { .. } | StorageError::Decode { .. } => {
                CatalogError::Serialization(err.to_string())
            }
            other => CatalogError::StoreUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use culicidae_core::ErrorKind;

    #[test]
    fn test_storage_error_mapping() {
        let missing: CatalogError = StorageError::TableNotFound("regions".into()).into();
        assert_eq!(missing.kind(), ErrorKind::StoreUnavailable);
        assert!(missing.is_retryable());

        let decode: CatalogError = StorageError::Decode {
            table: "species".into(),
            key: "aedes-aegypti".into(),
            message: "invalid marker".into(),
        }
        .into();
        assert!(matches!(decode, CatalogError::Serialization(_)));
        assert!(decode.to_string().contains("aedes-aegypti"));
    }
}
