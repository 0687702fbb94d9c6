/// JWT 인증 미들웨어
/// Bearer 토큰을 검증하고 호출자 신원(사용자 id, 역할)을 핸들러에 전달한다.
/// 토큰 발급(로그인, 비밀번호 검증)은 외부 협력자의 몫이며,
/// 운영 도구와 테스트를 위한 발급 헬퍼만 제공한다.
// region:    --- Imports
use crate::error::AppError;
use crate::handlers::AppState;
use crate::users::User;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Keys & Claims

/// JWT 서명/검증 키
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// 환경 변수 JWT_SECRET에서 키 생성
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        Self::new(secret.as_bytes())
    }
}

/// 토큰 클레임
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: String,
    pub email: String,
    pub exp: usize,
}

/// 토큰 발급 헬퍼 (유효기간 7일)
pub fn issue_token(
    keys: &JwtKeys,
    user_id: i64,
    role: &str,
    email: &str,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        email: email.to_string(),
        exp: (Utc::now() + Duration::days(7)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|_| AppError::unauthorized("TOKEN_ISSUE_FAILED", "토큰 발급에 실패했습니다."))
}

// endregion: --- Keys & Claims

// region:    --- Auth Extractor

/// 인증된 호출자
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    /// 관리자 권한 확인
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role != "admin" {
            return Err(AppError::forbidden(
                "ADMIN_ONLY",
                "관리자 권한이 필요합니다.",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (db_manager, keys) = state;

        // Bearer 토큰 추출
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::unauthorized("NO_TOKEN", "인증 토큰이 없습니다.")
            })?;

        // 토큰 검증
        let data = decode::<Claims>(token, &keys.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::unauthorized("TOKEN_EXPIRED", "토큰이 만료되었습니다.")
                }
                _ => AppError::unauthorized("INVALID_TOKEN", "유효하지 않은 토큰입니다."),
            },
        )?;

        // 사용자가 여전히 존재하고 활성 상태인지 확인
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(data.claims.sub)
            .fetch_optional(db_manager.pool())
            .await?
            .ok_or_else(|| {
                AppError::unauthorized("USER_NOT_FOUND", "계정을 찾을 수 없습니다.")
            })?;

        if !user.is_active {
            return Err(AppError::unauthorized(
                "USER_DEACTIVATED",
                "비활성화된 계정입니다.",
            ));
        }

        // 역할은 토큰이 아닌 현재 사용자 행을 기준으로 한다
        Ok(AuthUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        })
    }
}

// endregion: --- Auth Extractor

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips() {
        let keys = JwtKeys::new(b"test-secret");
        let token = issue_token(&keys, 7, "buyer", "buyer@example.com").unwrap();

        let data = decode::<Claims>(&token, &keys.decoding, &Validation::default()).unwrap();
        assert_eq!(data.claims.sub, 7);
        assert_eq!(data.claims.role, "buyer");
        assert_eq!(data.claims.email, "buyer@example.com");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let keys = JwtKeys::new(b"test-secret");
        let other = JwtKeys::new(b"other-secret");
        let token = issue_token(&other, 7, "buyer", "buyer@example.com").unwrap();

        assert!(decode::<Claims>(&token, &keys.decoding, &Validation::default()).is_err());
    }

    #[test]
    fn admin_guard() {
        let admin = AuthUser {
            id: 1,
            name: "관리자".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
        };
        assert!(admin.require_admin().is_ok());

        let buyer = AuthUser {
            role: "buyer".to_string(),
            ..admin
        };
        assert_eq!(buyer.require_admin().unwrap_err().code(), "ADMIN_ONLY");
    }
}

// endregion: --- Tests
