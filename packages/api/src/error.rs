use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use produce_scale::ClassifyError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ERROR_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportPolicy {
    Ignore,
    Report,
}

/// Error returned by every handler, rendered as a JSON envelope
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    public_code: &'static str,
    public_message: String,
    report_policy: ReportPolicy,
}

impl ApiError {
    fn new(
        status: StatusCode,
        public_code: &'static str,
        public_message: impl Into<String>,
        report_policy: ReportPolicy,
    ) -> Self {
        Self {
            status,
            public_code,
            public_message: public_message.into(),
            report_policy,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.public_code
    }

    pub fn message(&self) -> &str {
        &self.public_message
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, ReportPolicy::Ignore)
    }

    pub fn payload_too_large(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Payload too large: {}", msg);
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "PAYLOAD_TOO_LARGE",
            msg,
            ReportPolicy::Ignore,
        )
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::debug!("Not found: {}", msg);
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", msg, ReportPolicy::Ignore)
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Too many requests: {}", msg);
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "TOO_MANY_REQUESTS",
            msg,
            ReportPolicy::Ignore,
        )
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Service unavailable: {}", msg);
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            msg,
            ReportPolicy::Ignore,
        )
    }

    /// Logged with its error id when rendered
    pub fn gateway_timeout(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            "TIMEOUT",
            msg,
            ReportPolicy::Report,
        )
    }

    /// Logged with its error id when rendered
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            msg,
            ReportPolicy::Report,
        )
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.public_code = code;
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorEnvelope<'a> {
            success: bool,
            error: ErrorBody<'a>,
        }

        #[derive(Serialize)]
        struct ErrorBody<'a> {
            code: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<&'a str>,
            message: &'a str,
        }

        let error_id = (self.report_policy == ReportPolicy::Report)
            .then(|| format!("err-{}", NEXT_ERROR_ID.fetch_add(1, Ordering::Relaxed)));

        if let Some(id) = error_id.as_deref() {
            tracing::error!(
                error_id = id,
                status = self.status.as_u16(),
                code = self.public_code,
                "{}",
                self.public_message
            );
        }

        let mut response = (
            self.status,
            Json(ErrorEnvelope {
                success: false,
                error: ErrorBody {
                    code: self.public_code,
                    id: error_id.as_deref(),
                    message: &self.public_message,
                },
            }),
        )
            .into_response();

        if let Some(id) = error_id.as_deref()
            && let Ok(v) = HeaderValue::from_str(id)
        {
            response.headers_mut().insert("x-error-id", v);
        }
        if self.status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert("retry-after", HeaderValue::from_static("5"));
        }

        response
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::NotReady => {
                Self::service_unavailable("Model or data not loaded").with_code("NOT_READY")
            }
            ClassifyError::InvalidImage(msg) => {
                Self::internal(format!("Error processing image: {}", msg))
                    .with_code("INVALID_IMAGE")
            }
            ClassifyError::Inference(e) => {
                Self::internal(format!("Error processing image: {}", e)).with_code("INFERENCE_ERROR")
            }
            err @ ClassifyError::NoScores { .. } => {
                Self::internal(format!("Error processing image: {}", err))
                    .with_code("INFERENCE_ERROR")
            }
            err @ ClassifyError::IndexOutOfRange { .. } => {
                Self::internal(format!("Error processing image: {}", err))
                    .with_code("LABEL_MISMATCH")
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => Self::payload_too_large(err.body_text()),
            status if status.is_server_error() => {
                Self::internal(format!("Failed to read upload: {}", err.body_text()))
            }
            _ => Self::bad_request(format!("Malformed multipart body: {}", err.body_text())),
        }
    }
}

impl std::error::Error for ApiError {}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.public_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_errors_map_to_statuses() {
        let cases = [
            (ClassifyError::NotReady, StatusCode::SERVICE_UNAVAILABLE),
            (
                ClassifyError::InvalidImage("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ClassifyError::NoScores { len: 0 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ClassifyError::Inference(produce_scale::InferenceError::new("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ClassifyError::IndexOutOfRange {
                    index: 9,
                    labels: 3,
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn reported_errors_carry_an_id_header() {
        let response = ApiError::internal("kaputt").into_response();
        assert!(response.headers().contains_key("x-error-id"));

        let response = ApiError::bad_request("nope").into_response();
        assert!(!response.headers().contains_key("x-error-id"));
    }

    /// Counts error-level events seen while the guard is active
    #[derive(Clone, Default)]
    struct ErrorEvents(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn reported_errors_are_logged_once() {
        use tracing_subscriber::layer::SubscriberExt;

        let events = ErrorEvents::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());

        tracing::subscriber::with_default(subscriber, || {
            let timeout = ApiError::gateway_timeout("slow");
            let internal = ApiError::internal("kaputt");
            assert_eq!(events.0.load(Ordering::SeqCst), 0);

            let _ = timeout.into_response();
            let _ = internal.into_response();
        });

        assert_eq!(events.0.load(Ordering::SeqCst), 2);
    }
}
