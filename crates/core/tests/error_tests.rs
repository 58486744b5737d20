// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use billing_summary_core::errors::CoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn api_shows_status_code() {
        let err = CoreError::Api {
            status: 403,
            message: "Forbidden".into(),
        };
        assert_eq!(err.to_string(), "list-invoices failed: 403");
    }

    #[test]
    fn api_reason_is_kept_for_logging() {
        let err = CoreError::Api {
            status: 503,
            message: "Service Unavailable".into(),
        };

        let CoreError::Api { status, message } = &err else {
            panic!("expected Api");
        };
        assert_eq!((*status, message.as_str()), (503, "Service Unavailable"));
        assert!(!err.to_string().contains("Service Unavailable"));
        assert!(format!("{err:?}").contains("Service Unavailable"));
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection reset".into());
        assert_eq!(err.to_string(), "Network error: connection reset");
    }

    #[test]
    fn deserialization() {
        let err = CoreError::Deserialization("missing field".into());
        assert_eq!(err.to_string(), "Deserialization error: missing field");
    }

    #[test]
    fn invalid_invoice() {
        let err = CoreError::InvalidInvoice("unparseable date".into());
        assert_eq!(err.to_string(), "Invalid invoice: unparseable date");
    }

    #[test]
    fn anchor_not_found() {
        assert_eq!(
            CoreError::AnchorNotFound.to_string(),
            "Invoices card not found on page"
        );
    }

    #[test]
    fn dom() {
        let err = CoreError::Dom("cycle".into());
        assert_eq!(err.to_string(), "DOM error: cycle");
    }

    #[test]
    fn config() {
        let err = CoreError::Config("panel_id must not be empty".into());
        assert_eq!(err.to_string(), "Configuration error: panel_id must not be empty");
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod conversions {
    use super::*;

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CoreError = json_err.into();
        assert!(matches!(err, CoreError::Deserialization(_)));
    }

    #[test]
    fn question_mark_converts_json_errors() {
        fn parse(s: &str) -> Result<serde_json::Value, CoreError> {
            Ok(serde_json::from_str(s)?)
        }
        assert!(matches!(parse("[1,"), Err(CoreError::Deserialization(_))));
        assert!(parse("[1]").is_ok());
    }
}

// ── Trait impls ─────────────────────────────────────────────────────

#[test]
fn is_std_error_and_send_sync() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
    assert_error::<CoreError>();
}
