//! Integration tests for error types

#[cfg(test)]
mod tests {
    use lockyard_errors::*;

    #[test]
    fn test_error_conversion() {
        let lock_err = LockError::unsatisfiable("printer busy");
        let err: Error = lock_err.into();
        assert!(matches!(err, Error::Lock(_)));
    }

    #[test]
    fn test_unknown_resource_display_lists_names() {
        let err = LockError::UnknownResource {
            names: vec!["gpu-1".into(), "gpu-2".into()],
        };
        assert_eq!(err.to_string(), "unknown resources: gpu-1, gpu-2");
    }

    #[test]
    fn test_queueable_outcomes() {
        assert!(LockError::unsatisfiable("x").is_queueable());
        assert!(LockError::UnknownResource { names: vec![] }.is_queueable());
        assert!(!LockError::ReservationConflict {
            resource: "r".into(),
            holder: "alice".into(),
        }
        .is_queueable());
    }

    #[test]
    fn test_user_codes_propagate() {
        let err: Error = LockError::ResourceInUse {
            resource: "printer".into(),
        }
        .into();
        assert_eq!(err.user_code(), Some("lock.resource_in_use"));
        assert!(err.is_retryable());
        assert!(err.user_hint().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::IoError { .. }));

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let with_path = StorageError::from_io_with_path(&io_err, std::path::Path::new("/r.json"));
        assert!(matches!(with_path, StorageError::PermissionDenied { .. }));
    }
}
