/// 사용자 모델 및 관리자 전용 사용자 관리
// region:    --- Imports
use crate::database::DatabaseManager;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Model

/// 역할 허용 목록
pub const ROLES: &[&str] = &["buyer", "seller", "admin"];

/// 사용자 모델
/// 경매/주문/입찰에서는 id로만 참조되는 불투명 엔티티다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub profile: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// 사용자 수정 요청 (관리자 전용)
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

// endregion: --- Model

// region:    --- Admin Operations

/// 모든 사용자 조회
pub async fn get_all_users(db_manager: &DatabaseManager) -> Result<Vec<User>, AppError> {
    info!("{:<12} --> 모든 사용자 조회", "Users");
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
        .fetch_all(db_manager.pool())
        .await?;
    Ok(users)
}

/// 사용자 조회
pub async fn get_user(db_manager: &DatabaseManager, user_id: i64) -> Result<User, AppError> {
    info!("{:<12} --> 사용자 조회 id: {}", "Users", user_id);
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db_manager.pool())
        .await?
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "사용자를 찾을 수 없습니다."))
}

/// 사용자 수정 (이름, 역할, 활성 여부)
pub async fn update_user(
    db_manager: &DatabaseManager,
    user_id: i64,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    info!("{:<12} --> 사용자 수정 id: {}", "Users", user_id);

    if let Some(role) = req.role.as_deref() {
        if !ROLES.contains(&role) {
            return Err(AppError::invalid_argument(
                "INVALID_ROLE",
                "유효하지 않은 역할입니다.",
            ));
        }
    }

    sqlx::query_as::<_, User>(
        "UPDATE users
         SET name = COALESCE($1, name),
             role = COALESCE($2, role),
             is_active = COALESCE($3, is_active)
         WHERE id = $4
         RETURNING *",
    )
    .bind(&req.name)
    .bind(&req.role)
    .bind(req.is_active)
    .bind(user_id)
    .fetch_optional(db_manager.pool())
    .await?
    .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "사용자를 찾을 수 없습니다."))
}

/// 사용자 삭제
pub async fn delete_user(db_manager: &DatabaseManager, user_id: i64) -> Result<(), AppError> {
    info!("{:<12} --> 사용자 삭제 id: {}", "Users", user_id);
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db_manager.pool())
        .await;

    let result = match result {
        Ok(r) => r,
        // 경매/주문이 참조 중인 사용자는 삭제 대신 비활성화해야 한다
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
            return Err(AppError::conflict(
                "USER_REFERENCED",
                "경매 또는 주문이 참조하는 사용자는 삭제할 수 없습니다.",
            ));
        }
        Err(e) => return Err(e.into()),
    };

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(
            "USER_NOT_FOUND",
            "사용자를 찾을 수 없습니다.",
        ));
    }
    Ok(())
}

// endregion: --- Admin Operations
