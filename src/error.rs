// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- App Error

/// 서비스 전역 오류 타입
/// 입찰 엔진과 주문 처리의 모든 검증 실패를 다섯 가지 종류로 구분한다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 참조한 엔티티가 존재하지 않음
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    /// 호출자에게 권한이 없음 (역할 또는 소유권)
    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    /// 현재 라이프사이클 상태에서 허용되지 않는 연산
    #[error("{message}")]
    InvalidState { code: &'static str, message: String },

    /// 규칙을 위반한 입력 (예: 입찰 금액이 너무 낮음)
    #[error("{message}")]
    InvalidArgument { code: &'static str, message: String },

    /// 유일성 위반 또는 낙관적 동시성 충돌
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// 인증 실패 (토큰 없음, 만료, 검증 실패)
    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    /// 저장소 계층 오류
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl AppError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(code: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    /// 오류 코드 조회 (테스트 및 로깅용)
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { code, .. }
            | Self::Forbidden { code, .. }
            | Self::InvalidState { code, .. }
            | Self::InvalidArgument { code, .. }
            | Self::Conflict { code, .. }
            | Self::Unauthorized { code, .. } => code,
            Self::Store(_) => "STORE_ERROR",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::InvalidState { .. } | Self::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 오류를 HTTP 응답으로 변환
/// 본문 형식: {"error": 메시지, "code": 코드}
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 저장소 오류는 내부 정보를 숨기고 로그로만 남긴다
        if let Self::Store(ref e) = self {
            error!("{:<12} --> 저장소 오류: {:?}", "Error", e);
            return (
                status,
                Json(serde_json::json!({
                    "error": "내부 서버 오류가 발생했습니다.",
                    "code": "STORE_ERROR"
                })),
            )
                .into_response();
        }

        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

// endregion: --- App Error
