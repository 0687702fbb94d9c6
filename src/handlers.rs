/// HTTP 핸들러 계층
/// 요청 본문 검증과 응답 변환만 담당하고, 비즈니스 규칙은
/// bidding/orders 커맨드 모듈에 위임한다.
// region:    --- Imports
use crate::auth::{AuthUser, JwtKeys};
use crate::bidding::commands::{handle_place_bid, resolve_auction_end, PlaceBidCommand};
use crate::bidding::model::{Auction, AuctionStatus, CATEGORIES, CONDITIONS, GRADES, UNITS};
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::orders::commands::{create_order_from_win, CreateOrderCommand};
use crate::orders::model::ShippingAddress;
use crate::query;
use crate::query::handlers::ListAuctionsParams;
use crate::store::PgStore;
use crate::users;
use crate::users::UpdateUserRequest;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- App State

/// 라우터 공유 상태: 데이터베이스 매니저와 JWT 키
pub type AppState = (Arc<DatabaseManager>, Arc<JwtKeys>);

// endregion: --- App State

// region:    --- Request DTOs

/// 경매 생성/수정 요청
#[derive(Debug, Deserialize)]
pub struct AuctionRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub quantity: i32,
    pub unit: String,
    pub grade: String,
    pub condition: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub starting_bid: i64,
    pub reserve_price: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: DateTime<Utc>,
    pub status: Option<String>,
    pub auto_extend: Option<bool>,
    pub auto_extend_minutes: Option<i32>,
    pub shipping_included: Option<bool>,
    pub shipping_cost: Option<i64>,
    pub shipping_estimated_days: Option<i32>,
}

/// 입찰 요청 본문
#[derive(Debug, Deserialize)]
pub struct PlaceBidRequest {
    pub amount: i64,
}

/// 주문 생성 요청 본문
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub auction_id: i64,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    pub contact_number: Option<String>,
}

/// 대시보드 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: Option<String>,
}

/// 경매 요청 본문 검증
fn validate_auction_request(req: &AuctionRequest) -> Result<(), AppError> {
    // 길이 제한은 문자 수 기준 (한글 제목이 바이트 수로 잘리지 않도록)
    let title_len = req.title.trim().chars().count();
    if title_len < 5 || title_len > 100 {
        return Err(AppError::invalid_argument(
            "INVALID_TITLE",
            "제목은 5자 이상 100자 이하이어야 합니다.",
        ));
    }
    let description_len = req.description.trim().chars().count();
    if description_len < 10 || description_len > 1000 {
        return Err(AppError::invalid_argument(
            "INVALID_DESCRIPTION",
            "설명은 10자 이상 1000자 이하이어야 합니다.",
        ));
    }
    if !CATEGORIES.contains(&req.category.as_str()) {
        return Err(AppError::invalid_argument(
            "INVALID_CATEGORY",
            "유효하지 않은 카테고리입니다.",
        ));
    }
    if req.location.trim().is_empty() {
        return Err(AppError::invalid_argument(
            "INVALID_LOCATION",
            "위치는 필수입니다.",
        ));
    }
    if req.starting_bid < 0 {
        return Err(AppError::invalid_argument(
            "INVALID_STARTING_BID",
            "시작가는 0 이상이어야 합니다.",
        ));
    }
    if req.reserve_price.is_some_and(|r| r < 0) {
        return Err(AppError::invalid_argument(
            "INVALID_RESERVE_PRICE",
            "최소 보장가는 0 이상이어야 합니다.",
        ));
    }
    if req.quantity < 1 {
        return Err(AppError::invalid_argument(
            "INVALID_QUANTITY",
            "수량은 1 이상이어야 합니다.",
        ));
    }
    if !UNITS.contains(&req.unit.as_str()) {
        return Err(AppError::invalid_argument(
            "INVALID_UNIT",
            "유효하지 않은 단위입니다.",
        ));
    }
    if !GRADES.contains(&req.grade.as_str()) {
        return Err(AppError::invalid_argument(
            "INVALID_GRADE",
            "유효하지 않은 등급입니다.",
        ));
    }
    if !CONDITIONS.contains(&req.condition.as_str()) {
        return Err(AppError::invalid_argument(
            "INVALID_CONDITION",
            "유효하지 않은 상태 값입니다.",
        ));
    }
    if req.end_time <= Utc::now() {
        return Err(AppError::invalid_argument(
            "INVALID_END_TIME",
            "마감 시각은 미래여야 합니다.",
        ));
    }
    if let Some(status) = req.status.as_deref() {
        // ended는 종료 확정 경로로만 도달한다
        match AuctionStatus::parse(status) {
            None | Some(AuctionStatus::Ended) => {
                return Err(AppError::invalid_argument(
                    "INVALID_STATUS",
                    "직접 설정할 수 없는 상태입니다.",
                ));
            }
            Some(_) => {}
        }
    }
    if req.auto_extend_minutes.is_some_and(|m| m < 1) {
        return Err(AppError::invalid_argument(
            "INVALID_AUTO_EXTEND",
            "자동 연장 시간은 1분 이상이어야 합니다.",
        ));
    }
    Ok(())
}

// endregion: --- Request DTOs

// region:    --- Auction Handlers

/// 경매 목록 조회 (공개)
pub async fn handle_list_auctions(
    State((db_manager, _)): State<AppState>,
    Query(params): Query<ListAuctionsParams>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 경매 목록 조회", "Handler");
    let page = query::handlers::list_auctions(&db_manager, params).await?;
    Ok(Json(page))
}

/// 경매 상세 조회 (공개)
pub async fn handle_get_auction(
    State((db_manager, _)): State<AppState>,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 경매 상세 조회 id: {}", "Handler", auction_id);
    let detail = query::handlers::get_auction_detail(&db_manager, auction_id).await?;
    Ok(Json(detail))
}

/// 경매 생성
pub async fn handle_create_auction(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Json(req): Json<AuctionRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 경매 생성 요청 seller: {}", "Handler", caller.id);
    validate_auction_request(&req)?;

    let now = Utc::now();
    let auction = sqlx::query_as::<_, Auction>(
        "INSERT INTO auctions (title, description, category, location, images, quantity, unit,
                               grade, condition, tags, starting_bid, current_bid, reserve_price,
                               is_reserve_met, seller_id, status, start_time, end_time, bid_count,
                               auto_extend, auto_extend_minutes, shipping_included, shipping_cost,
                               shipping_estimated_days, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 0, $12, FALSE, $13, $14, $15, $16,
                 0, $17, $18, $19, $20, $21, $22, $22)
         RETURNING *",
    )
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(&req.category)
    .bind(&req.location)
    .bind(&req.images)
    .bind(req.quantity)
    .bind(&req.unit)
    .bind(&req.grade)
    .bind(&req.condition)
    .bind(&req.tags)
    .bind(req.starting_bid)
    .bind(req.reserve_price)
    .bind(caller.id)
    .bind(req.status.as_deref().unwrap_or(AuctionStatus::Draft.as_str()))
    .bind(req.start_time.unwrap_or(now))
    .bind(req.end_time)
    .bind(req.auto_extend.unwrap_or(true))
    .bind(req.auto_extend_minutes.unwrap_or(5))
    .bind(req.shipping_included.unwrap_or(false))
    .bind(req.shipping_cost.unwrap_or(0))
    .bind(req.shipping_estimated_days.unwrap_or(7))
    .bind(now)
    .fetch_one(db_manager.pool())
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "경매가 생성되었습니다.",
            "auction": auction
        })),
    ))
}

/// 소유권 확인: 판매자 본인 또는 관리자
fn authorize_owner(auction: &Auction, caller: &AuthUser) -> Result<(), AppError> {
    if auction.seller_id != caller.id && caller.role != "admin" {
        return Err(AppError::forbidden(
            "NOT_OWNER",
            "이 경매를 변경할 권한이 없습니다.",
        ));
    }
    Ok(())
}

/// 입찰이 붙은 경매는 변경/삭제할 수 없다
fn reject_if_has_bids(auction: &Auction) -> Result<(), AppError> {
    if auction.bid_count > 0 {
        return Err(AppError::invalid_state(
            "HAS_BIDS",
            "입찰이 있는 경매는 변경할 수 없습니다.",
        ));
    }
    Ok(())
}

/// 경매 수정 (입찰 전까지만)
pub async fn handle_update_auction(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(auction_id): Path<i64>,
    Json(req): Json<AuctionRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 경매 수정 요청 id: {}", "Handler", auction_id);

    let store = PgStore::new(db_manager.get_pool());
    let auction = crate::store::AuctionStore::load_auction(&store, auction_id)
        .await?
        .ok_or_else(|| AppError::not_found("AUCTION_NOT_FOUND", "경매를 찾을 수 없습니다."))?;

    authorize_owner(&auction, &caller)?;
    reject_if_has_bids(&auction)?;
    validate_auction_request(&req)?;

    let updated = sqlx::query_as::<_, Auction>(
        "UPDATE auctions
         SET title = $1, description = $2, category = $3, location = $4, images = $5,
             quantity = $6, unit = $7, grade = $8, condition = $9, tags = $10,
             starting_bid = $11, reserve_price = $12, status = COALESCE($13, status),
             start_time = COALESCE($14, start_time), end_time = $15,
             auto_extend = COALESCE($16, auto_extend),
             auto_extend_minutes = COALESCE($17, auto_extend_minutes),
             shipping_included = COALESCE($18, shipping_included),
             shipping_cost = COALESCE($19, shipping_cost),
             shipping_estimated_days = COALESCE($20, shipping_estimated_days),
             updated_at = $21
         WHERE id = $22
         RETURNING *",
    )
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(&req.category)
    .bind(&req.location)
    .bind(&req.images)
    .bind(req.quantity)
    .bind(&req.unit)
    .bind(&req.grade)
    .bind(&req.condition)
    .bind(&req.tags)
    .bind(req.starting_bid)
    .bind(req.reserve_price)
    .bind(req.status)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.auto_extend)
    .bind(req.auto_extend_minutes)
    .bind(req.shipping_included)
    .bind(req.shipping_cost)
    .bind(req.shipping_estimated_days)
    .bind(Utc::now())
    .bind(auction_id)
    .fetch_one(db_manager.pool())
    .await?;

    Ok(Json(serde_json::json!({
        "message": "경매가 수정되었습니다.",
        "auction": updated
    })))
}

/// 경매 삭제 (입찰 전까지만)
pub async fn handle_delete_auction(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 경매 삭제 요청 id: {}", "Handler", auction_id);

    let store = PgStore::new(db_manager.get_pool());
    let auction = crate::store::AuctionStore::load_auction(&store, auction_id)
        .await?
        .ok_or_else(|| AppError::not_found("AUCTION_NOT_FOUND", "경매를 찾을 수 없습니다."))?;

    authorize_owner(&auction, &caller)?;
    reject_if_has_bids(&auction)?;

    sqlx::query("DELETE FROM auctions WHERE id = $1")
        .bind(auction_id)
        .execute(db_manager.pool())
        .await?;

    Ok(Json(serde_json::json!({ "message": "경매가 삭제되었습니다." })))
}

// endregion: --- Auction Handlers

// region:    --- Bidding Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(auction_id): Path<i64>,
    Json(req): Json<PlaceBidRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(
        "{:<12} --> 입찰 요청 처리 시작: 경매 {}, 입찰자 {}, 금액 {}",
        "Handler", auction_id, caller.id, req.amount
    );

    let store = PgStore::new(db_manager.get_pool());
    let cmd = PlaceBidCommand {
        auction_id,
        bidder_id: caller.id,
        bidder_role: caller.role.clone(),
        bid_amount: req.amount,
    };

    let auction = handle_place_bid(cmd, &store).await?;

    Ok(Json(serde_json::json!({
        "message": "입찰이 성공적으로 처리되었습니다.",
        "auction": auction
    })))
}

/// 경매 종료 확정 (운영자 훅, 마감 전에는 변경 없음)
pub async fn handle_resolve_auction(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(auction_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    info!("{:<12} --> 종료 확정 요청 id: {}", "Handler", auction_id);
    caller.require_admin()?;

    let store = PgStore::new(db_manager.get_pool());
    let auction = resolve_auction_end(auction_id, &store).await?;

    Ok(Json(serde_json::json!({
        "message": "종료 확정 처리되었습니다.",
        "auction": auction
    })))
}

// endregion: --- Bidding Handlers

// region:    --- Dashboard Handlers

/// 판매자 대시보드: 내가 올린 경매
pub async fn handle_my_auctions(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, AppError> {
    let auctions =
        query::handlers::get_user_auctions(&db_manager, caller.id, filter.status).await?;
    Ok(Json(auctions))
}

/// 구매자 대시보드: 내가 입찰한 경매
pub async fn handle_my_bids(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Query(filter): Query<StatusFilter>,
) -> Result<impl IntoResponse, AppError> {
    let auctions =
        query::handlers::get_user_bid_auctions(&db_manager, caller.id, filter.status).await?;
    Ok(Json(auctions))
}

// endregion: --- Dashboard Handlers

// region:    --- Order Handlers

/// 낙찰 주문 생성
pub async fn handle_create_order(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!(
        "{:<12} --> 주문 생성 요청: 경매 {}, 구매자 {}",
        "Handler", req.auction_id, caller.id
    );

    let store = PgStore::new(db_manager.get_pool());
    let cmd = CreateOrderCommand {
        auction_id: req.auction_id,
        buyer_id: caller.id,
        shipping_address: req.shipping_address,
        contact_number: req.contact_number,
    };

    let order = create_order_from_win(cmd, &store).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "주문이 생성되었습니다.",
            "order": order
        })),
    ))
}

/// 구매자 본인 주문 조회
pub async fn handle_my_orders(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = query::handlers::get_buyer_orders(&db_manager, caller.id).await?;
    Ok(Json(orders))
}

/// 판매자 수주 조회
pub async fn handle_seller_orders(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = query::handlers::get_seller_orders(&db_manager, caller.id).await?;
    Ok(Json(orders))
}

// endregion: --- Order Handlers

// region:    --- Admin User Handlers

/// 모든 사용자 조회 (관리자)
pub async fn handle_list_users(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin()?;
    let users = users::get_all_users(&db_manager).await?;
    Ok(Json(users))
}

/// 사용자 조회 (관리자)
pub async fn handle_get_user(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin()?;
    let user = users::get_user(&db_manager, user_id).await?;
    Ok(Json(user))
}

/// 사용자 수정 (관리자)
pub async fn handle_update_user(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin()?;
    let user = users::update_user(&db_manager, user_id, req).await?;
    Ok(Json(serde_json::json!({
        "message": "사용자가 수정되었습니다.",
        "user": user
    })))
}

/// 사용자 삭제 (관리자)
pub async fn handle_delete_user(
    State((db_manager, _)): State<AppState>,
    caller: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin()?;
    users::delete_user(&db_manager, user_id).await?;
    Ok(Json(serde_json::json!({ "message": "사용자가 삭제되었습니다." })))
}

// endregion: --- Admin User Handlers

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    /// 검증을 통과하는 기본 요청
    fn valid_request() -> AuctionRequest {
        AuctionRequest {
            title: "팔레트 단위 전자제품 재고".to_string(),
            description: "반품 재고 일괄 판매, 상세 내역 첨부".to_string(),
            category: "Electronics".to_string(),
            location: "부산".to_string(),
            images: vec![],
            quantity: 10,
            unit: "pallets".to_string(),
            grade: "B".to_string(),
            condition: "Good".to_string(),
            tags: vec![],
            starting_bid: 100,
            reserve_price: None,
            start_time: None,
            end_time: Utc::now() + Duration::hours(2),
            status: None,
            auto_extend: None,
            auto_extend_minutes: None,
            shipping_included: None,
            shipping_cost: None,
            shipping_estimated_days: None,
        }
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        // 한글 40자 = 120바이트, 100자 제한 안이어야 한다
        let mut req = valid_request();
        req.title = "가".repeat(40);
        assert!(validate_auction_request(&req).is_ok());

        // 101자는 거부
        req.title = "가".repeat(101);
        let err = validate_auction_request(&req).unwrap_err();
        assert_eq!(err.code(), "INVALID_TITLE");

        // 설명도 동일하게 문자 수 기준
        let mut req = valid_request();
        req.description = "판".repeat(1000);
        assert!(validate_auction_request(&req).is_ok());
        req.description = "판".repeat(1001);
        assert_eq!(
            validate_auction_request(&req).unwrap_err().code(),
            "INVALID_DESCRIPTION"
        );
    }

    #[test]
    fn status_must_be_known_and_settable() {
        let mut req = valid_request();
        for status in ["draft", "active", "paused", "cancelled"] {
            req.status = Some(status.to_string());
            assert!(validate_auction_request(&req).is_ok(), "status {}", status);
        }

        // ended는 직접 설정할 수 없고, 미지의 값도 거부된다
        for status in ["ended", "archived", ""] {
            req.status = Some(status.to_string());
            assert_eq!(
                validate_auction_request(&req).unwrap_err().code(),
                "INVALID_STATUS",
                "status {}",
                status
            );
        }
    }
}

// endregion: --- Tests
