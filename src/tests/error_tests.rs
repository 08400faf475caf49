#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashMap;
    use std::fmt;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;

    use crate::crud::CrudError;
    use crate::error::{validation, AppError, OptionExt};

    /// Driver error carrying only a code, as the database would report it.
    #[derive(Debug)]
    struct CodedError(&'static str);

    impl fmt::Display for CodedError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "database error {}", self.0)
        }
    }

    impl std::error::Error for CodedError {}

    impl sqlx::error::DatabaseError for CodedError {
        fn message(&self) -> &str {
            self.0
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn coded(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(CodedError(code)))
    }

    async fn body_json(error: AppError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let error = AppError::BadRequest("Invalid input".to_string());
        assert_eq!(format!("{}", error), "Bad request: Invalid input");

        let error = AppError::Conflict("users conflicts".to_string());
        assert_eq!(format!("{}", error), "Conflict: users conflicts");

        let error = AppError::ValidationError { field: "name".into(), message: "empty".into() };
        assert_eq!(format!("{}", error), "Validation error on field 'name': empty");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).into_response().status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::ServiceUnavailable("x".into()).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Database("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_crud_conflict_maps_to_409() {
        let err = CrudError::IntegrityConflict {
            context: "users".into(),
            source: sqlx::Error::Protocol("UNIQUE constraint failed".into()),
        };
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Conflict(ref msg) if msg.contains("users conflicts")));
    }

    #[test]
    fn test_crud_invalid_column_maps_to_internal() {
        let err = CrudError::InvalidColumn { table: "users", column: "email".into() };
        let app_err: AppError = err.into();
        assert!(matches!(app_err, AppError::Internal(_)));
    }

    #[test]
    fn test_crud_failure_maps_to_database_error() {
        let app_err: AppError = CrudError::from(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(app_err, AppError::Database(_)));
    }

    #[test]
    fn test_from_sqlx_error() {
        assert!(matches!(AppError::from(sqlx::Error::PoolTimedOut), AppError::ServiceUnavailable(_)));
        assert!(matches!(AppError::from(sqlx::Error::PoolClosed), AppError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_non_database_errors_are_not_integrity_violations() {
        assert!(!crate::crud::is_integrity_violation(&sqlx::Error::RowNotFound));
        assert!(!crate::crud::is_integrity_violation(&sqlx::Error::Protocol("23505".into())));
    }

    #[test]
    fn test_integrity_violation_codes() {
        // SQLite extended codes carry SQLITE_CONSTRAINT in the low byte
        assert!(crate::crud::is_integrity_violation(&coded("2067")));
        assert!(crate::crud::is_integrity_violation(&coded("19")));
        assert!(!crate::crud::is_integrity_violation(&coded("1")));

        // SQLSTATE class 23 on PostgreSQL
        assert!(crate::crud::is_integrity_violation(&coded("23505")));
        assert!(crate::crud::is_integrity_violation(&coded("23P01")));
        // 22035 has 19 in its low byte but is a data exception, not a constraint
        assert!(!crate::crud::is_integrity_violation(&coded("22035")));
        assert!(!crate::crud::is_integrity_violation(&coded("40001")));
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let (status, body) = body_json(AppError::Conflict("users conflicts".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["message"], "users conflicts");
        assert_eq!(body["status"], 409);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) = body_json(AppError::Internal(anyhow::anyhow!("secret"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "An internal server error occurred");
        assert!(body["error"]["details"]["error_id"].is_string());
        assert!(!body.to_string().contains("secret"));
    }

    #[test]
    fn test_option_ext() {
        assert_eq!(Some(1).ok_or_not_found("User").unwrap(), 1);
        let err = None::<i32>.ok_or_not_found("User").unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "User not found"));
    }

    #[test]
    fn test_form_field_validation() {
        let mut form = HashMap::new();
        form.insert("name".to_string(), "  alice ".to_string());
        form.insert("blank".to_string(), "   ".to_string());

        assert_eq!(validation::required_field(&form, "name").unwrap(), "alice");
        assert!(matches!(
            validation::required_field(&form, "blank"),
            Err(AppError::ValidationError { .. })
        ));
        assert!(validation::required_field(&form, "missing").is_err());

        assert_eq!(validation::optional_field(&form, "name"), Some("alice"));
        assert_eq!(validation::optional_field(&form, "blank"), None);

        assert!(validation::validate_text("ok", "name").is_ok());
        assert!(validation::validate_text("nul\0", "name").is_err());
    }
}
