//! Tests for error types.

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::path::Path;

    #[test]
    fn test_error_display() {
        let err = Error::config("scan_threads cannot be 0");
        assert_eq!(
            err.to_string(),
            "configuration error: scan_threads cannot be 0"
        );
    }

    #[test]
    fn test_invalid_root_display() {
        let err = Error::InvalidRoot(PathBuf::from("/no/such/dir"));
        assert_eq!(
            err.to_string(),
            "invalid root '/no/such/dir': not an existing directory"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::InvalidRoot(PathBuf::from("/x")).is_fatal());
        assert!(Error::config("bad").is_fatal());
        assert!(!Error::from(ScanError::InvalidTimeFilter("xyz".to_string())).is_fatal());
        assert!(!Error::from(StorageError::read(Path::new("/c.json"), "eof")).is_fatal());
    }

    #[test]
    fn test_storage_error_conversion() {
        let storage_err = StorageError::write(Path::new("/cache/dir_cache.json"), "disk full");
        let err: Error = storage_err.into();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_scan_error_conversion() {
        let scan_err = ScanError::broken_link(Path::new("/media/link.mkv"), "not found");
        let err: Error = scan_err.into();
        assert!(matches!(err, Error::Scan(_)));
    }

    #[test]
    fn test_subtitle_error_conversion() {
        let sub_err = SubtitleError::unparseable(Path::new("/media/.mkv"), "no stem");
        let err: Error = sub_err.into();
        assert!(matches!(err, Error::Subtitle(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_storage_error_read() {
        let err = StorageError::read(Path::new("/c/scan_cache.json"), "expected value");
        assert_eq!(
            err.to_string(),
            "failed to read cache '/c/scan_cache.json': expected value"
        );
    }

    #[test]
    fn test_storage_error_malformed_record() {
        let err = StorageError::MalformedRecord {
            key: "/m/a.mkv".to_string(),
            reason: "missing field `size`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "malformed record for '/m/a.mkv': missing field `size`"
        );
    }

    #[test]
    fn test_scan_error_directory_access() {
        let err = ScanError::directory_access(Path::new("/m/locked"), "permission denied");
        assert_eq!(
            err.to_string(),
            "cannot read directory '/m/locked': permission denied"
        );
    }

    #[test]
    fn test_scan_error_cycle() {
        let err = ScanError::SymlinkCycle {
            path: "/m/loop".to_string(),
            target: "/m".to_string(),
        };
        assert_eq!(err.to_string(), "symlink cycle at '/m/loop' (target '/m')");
    }

    #[test]
    fn test_invalid_time_filter() {
        let err = ScanError::InvalidTimeFilter("xyz".to_string());
        assert!(err.to_string().starts_with("invalid time filter 'xyz'"));
    }

    #[test]
    fn test_subtitle_error_provider() {
        let err = SubtitleError::Provider {
            provider: "podnapisi".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(err.to_string(), "provider 'podnapisi' failed: timeout");
    }

    #[test]
    fn test_error_internal() {
        let err = Error::internal("scan task panicked");
        assert_eq!(err.to_string(), "internal error: scan task panicked");
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<i32> {
            Err(Error::config("inner error"))
        }

        fn outer() -> Result<i32> {
            let _ = inner()?;
            Ok(0)
        }

        let result = outer();
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "configuration error: inner error"
        );
    }
}
