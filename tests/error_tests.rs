//! Error handling tests.
//!
//! These cover display formatting, the recoverable/fatal split the pipeline
//! relies on, and the conversions from library errors.

use repricer::error::{CatalogError, CatalogResult};
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

fn all_variants() -> Vec<CatalogError> {
    vec![
        CatalogError::InputNotFound {
            path: PathBuf::from("in.pdf"),
        },
        CatalogError::DocumentOpenFailed {
            path: PathBuf::from("in.pdf"),
            reason: "bad xref".to_string(),
        },
        CatalogError::DocumentSaveFailed {
            path: PathBuf::from("out.pdf"),
            reason: "read-only".to_string(),
        },
        CatalogError::PriceUnparsable {
            text: "R$ ,".to_string(),
        },
        CatalogError::ColorSampleFailed {
            reason: "empty clip".to_string(),
        },
        CatalogError::ImageInsertFailed {
            reason: "decode".to_string(),
        },
        CatalogError::PipelineFatal {
            stage: "page processing".to_string(),
            message: "boom".to_string(),
        },
        CatalogError::Io {
            path: PathBuf::from("x"),
            source: io::Error::new(io::ErrorKind::Other, "io"),
        },
        CatalogError::TextExtraction {
            path: PathBuf::from("x.pdf"),
            reason: "no text".to_string(),
        },
        CatalogError::InvalidInput {
            parameter: "price_markup".to_string(),
            reason: "NaN".to_string(),
        },
        CatalogError::Backend {
            backend: "MuPDF".to_string(),
            message: "oops".to_string(),
        },
    ]
}

/// Tests user-facing messages.
mod display {
    use super::*;

    #[test]
    fn test_input_not_found_display() {
        let err = CatalogError::InputNotFound {
            path: PathBuf::from("/catalogs/summer.pdf"),
        };
        assert_eq!(err.to_string(), "Input file not found: '/catalogs/summer.pdf'");
    }

    #[test]
    fn test_open_and_save_failures_name_the_file() {
        let open = CatalogError::DocumentOpenFailed {
            path: PathBuf::from("in.pdf"),
            reason: "not a PDF".to_string(),
        };
        assert!(open.to_string().contains("in.pdf"));
        assert!(open.to_string().contains("not a PDF"));

        let save = CatalogError::DocumentSaveFailed {
            path: PathBuf::from("out.pdf"),
            reason: "disk full".to_string(),
        };
        assert!(save.to_string().contains("Failed to save"));
        assert!(save.to_string().contains("disk full"));
    }

    #[test]
    fn test_pipeline_fatal_names_stage() {
        let err = CatalogError::PipelineFatal {
            stage: "cover page".to_string(),
            message: "no font".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Catalog processing failed during cover page: no font"
        );
    }

    #[test]
    fn test_price_with_unicode() {
        let err = CatalogError::PriceUnparsable {
            text: "R$ dez reais, promoção".to_string(),
        };
        assert!(err.to_string().contains("promoção"));
    }

    #[test]
    fn test_all_errors_have_nonempty_display() {
        for err in all_variants() {
            assert!(!err.to_string().is_empty(), "{:?}", err);
        }
    }
}

/// Tests the split between absorbed and job-ending failures.
mod classification {
    use super::*;

    #[test]
    fn test_only_per_occurrence_errors_are_recoverable() {
        let recoverable: Vec<bool> = all_variants().iter().map(|e| e.is_recoverable()).collect();
        assert_eq!(
            recoverable,
            vec![false, false, false, true, true, true, false, false, false, false, false]
        );
    }

    #[test]
    fn test_fatal_wraps_library_errors() {
        let err = CatalogError::fatal(
            "intro page",
            CatalogError::Backend {
                backend: "lopdf".to_string(),
                message: "missing object".to_string(),
            },
        );
        match err {
            CatalogError::PipelineFatal { stage, message } => {
                assert_eq!(stage, "intro page");
                assert_eq!(message, "lopdf backend error: missing object");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_fatal_keeps_job_level_errors() {
        let kept = [
            CatalogError::InputNotFound {
                path: PathBuf::from("a.pdf"),
            },
            CatalogError::DocumentOpenFailed {
                path: PathBuf::from("a.pdf"),
                reason: String::new(),
            },
            CatalogError::DocumentSaveFailed {
                path: PathBuf::from("b.pdf"),
                reason: String::new(),
            },
            CatalogError::PipelineFatal {
                stage: "finalization".to_string(),
                message: "x".to_string(),
            },
        ];
        for err in kept {
            let before = err.to_string();
            let after = CatalogError::fatal("page processing", err);
            assert_eq!(after.to_string(), before);
        }
    }
}

/// Tests conversions and the source chain.
mod conversions {
    use super::*;

    #[test]
    fn test_from_io_error() {
        let err: CatalogError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        match err {
            CatalogError::Backend { backend, message } => {
                assert_eq!(backend, "std::io");
                assert!(message.contains("denied"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("price_markup = = 1").unwrap_err();
        let err: CatalogError = toml_err.into();
        assert!(matches!(
            err,
            CatalogError::InvalidInput { ref parameter, .. } if parameter == "plan"
        ));
    }

    #[test]
    fn test_from_image_error_is_recoverable() {
        let image_err = image::load_from_memory(b"not an image").unwrap_err();
        let err: CatalogError = image_err.into();
        assert!(matches!(err, CatalogError::ImageInsertFailed { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_io_error_source_chain() {
        let err = CatalogError::Io {
            path: PathBuf::from("plan.toml"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        let source = err.source().expect("io source");
        assert_eq!(source.to_string(), "gone");
    }

    #[test]
    fn test_errors_without_source_return_none() {
        let err = CatalogError::PriceUnparsable {
            text: "abc".to_string(),
        };
        assert!(err.source().is_none());
    }

    #[test]
    fn test_propagation_with_question_mark() {
        fn read_plan() -> CatalogResult<String> {
            let text = std::fs::read_to_string("/nonexistent/plan.toml")?;
            Ok(text)
        }
        assert!(matches!(read_plan(), Err(CatalogError::Backend { .. })));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<CatalogError>();
    }
}
