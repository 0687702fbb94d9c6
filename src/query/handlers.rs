/// 읽기 전용 조회 계층
/// 참조 엔티티(판매자, 입찰자, 구매자)의 표시용 조인은 모두 여기서 수행한다.
/// 입찰 엔진은 id만 다루며 조회 계층이 화면용 뷰를 조립한다.
// region:    --- Imports
use super::queries;
use crate::bidding::model::{Auction, Bid};
use crate::database::DatabaseManager;
use crate::error::AppError;
use crate::orders::model::Order;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

// endregion: --- Imports

// region:    --- Read Models

/// 판매자 요약이 조인된 경매
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AuctionWithSeller {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub auction: Auction,
    pub seller_name: String,
    pub seller_email: String,
}

/// 입찰자 요약이 조인된 입찰
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BidWithBidder {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub bid: Bid,
    pub bidder_name: String,
    pub bidder_email: String,
}

/// 경매 상세 뷰
#[derive(Debug, Serialize)]
pub struct AuctionDetail {
    #[serde(flatten)]
    pub auction: AuctionWithSeller,
    pub bids: Vec<BidWithBidder>,
}

/// 경매/상대방 요약이 조인된 주문
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderWithContext {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub order: Order,
    pub auction_title: String,
    pub auction_location: String,
    pub auction_end_time: DateTime<Utc>,
    pub counterpart_name: String,
    pub counterpart_email: String,
}

/// 목록 조회 파라미터
#[derive(Debug, Deserialize)]
pub struct ListAuctionsParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// 페이지 정보
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
}

/// 경매 목록 응답
#[derive(Debug, Serialize)]
pub struct AuctionPage {
    pub auctions: Vec<AuctionWithSeller>,
    pub pagination: Pagination,
}

// endregion: --- Read Models

// region:    --- Query Handlers

// 정렬 가능한 컬럼 허용 목록
const SORTABLE_COLUMNS: &[&str] = &[
    "end_time",
    "start_time",
    "created_at",
    "current_bid",
    "bid_count",
    "title",
];

/// 목록 필터 적용 (목록/카운트 쿼리에 동일하게 사용)
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, params: &ListAuctionsParams) {
    // 기본 상태 필터는 active
    let status = params.status.clone().unwrap_or_else(|| "active".to_string());
    if !status.is_empty() {
        qb.push(" AND a.status = ").push_bind(status);
    }

    if let Some(category) = params.category.clone() {
        if category != "All" && !category.is_empty() {
            qb.push(" AND a.category = ").push_bind(category);
        }
    }

    if let Some(search) = params.search.clone() {
        if !search.is_empty() {
            let pattern = format!("%{}%", search);
            qb.push(" AND (a.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// 경매 목록 조회 (필터, 정렬, 페이지네이션)
pub async fn list_auctions(
    db_manager: &DatabaseManager,
    params: ListAuctionsParams,
) -> Result<AuctionPage, AppError> {
    info!("{:<12} --> 경매 목록 조회: {:?}", "Query", params);

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    // 정렬 컬럼은 허용 목록에서만 선택 (기본: 마감 임박 순)
    let sort_by = params
        .sort_by
        .as_deref()
        .filter(|c| SORTABLE_COLUMNS.contains(c))
        .unwrap_or("end_time");
    let sort_order = match params.sort_order.as_deref() {
        Some("desc") => "DESC",
        _ => "ASC",
    };

    let mut count_qb: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM auctions a WHERE TRUE");
    push_filters(&mut count_qb, &params);
    let total: i64 = count_qb
        .build_query_scalar()
        .fetch_one(db_manager.pool())
        .await?;

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT a.*, u.name AS seller_name, u.email AS seller_email
         FROM auctions a
         JOIN users u ON u.id = a.seller_id
         WHERE TRUE",
    );
    push_filters(&mut qb, &params);
    qb.push(format!(" ORDER BY a.{} {}", sort_by, sort_order));
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);

    let auctions = qb
        .build_query_as::<AuctionWithSeller>()
        .fetch_all(db_manager.pool())
        .await?;

    Ok(AuctionPage {
        auctions,
        pagination: Pagination {
            current: page,
            pages: (total + limit - 1) / limit,
            total,
        },
    })
}

/// 경매 상세 조회 (판매자 및 입찰 이력 조인)
pub async fn get_auction_detail(
    db_manager: &DatabaseManager,
    auction_id: i64,
) -> Result<AuctionDetail, AppError> {
    info!("{:<12} --> 경매 상세 조회 id: {}", "Query", auction_id);

    let auction =
        sqlx::query_as::<_, AuctionWithSeller>(queries::GET_AUCTION_WITH_SELLER)
            .bind(auction_id)
            .fetch_optional(db_manager.pool())
            .await?
            .ok_or_else(|| {
                AppError::not_found("AUCTION_NOT_FOUND", "경매를 찾을 수 없습니다.")
            })?;

    let bids = sqlx::query_as::<_, BidWithBidder>(queries::GET_AUCTION_BIDS)
        .bind(auction_id)
        .fetch_all(db_manager.pool())
        .await?;

    Ok(AuctionDetail { auction, bids })
}

/// 판매자 본인 경매 조회
pub async fn get_user_auctions(
    db_manager: &DatabaseManager,
    seller_id: i64,
    status: Option<String>,
) -> Result<Vec<AuctionWithSeller>, AppError> {
    info!("{:<12} --> 내 경매 조회 seller: {}", "Query", seller_id);
    let auctions = sqlx::query_as::<_, AuctionWithSeller>(queries::GET_USER_AUCTIONS)
        .bind(seller_id)
        .bind(status)
        .fetch_all(db_manager.pool())
        .await?;
    Ok(auctions)
}

/// 구매자가 입찰한 경매 조회
pub async fn get_user_bid_auctions(
    db_manager: &DatabaseManager,
    bidder_id: i64,
    status: Option<String>,
) -> Result<Vec<AuctionWithSeller>, AppError> {
    info!("{:<12} --> 내 입찰 경매 조회 bidder: {}", "Query", bidder_id);
    let auctions = sqlx::query_as::<_, AuctionWithSeller>(queries::GET_USER_BID_AUCTIONS)
        .bind(bidder_id)
        .bind(status)
        .fetch_all(db_manager.pool())
        .await?;
    Ok(auctions)
}

/// 구매자 본인 주문 조회
pub async fn get_buyer_orders(
    db_manager: &DatabaseManager,
    buyer_id: i64,
) -> Result<Vec<OrderWithContext>, AppError> {
    info!("{:<12} --> 내 주문 조회 buyer: {}", "Query", buyer_id);
    let orders = sqlx::query_as::<_, OrderWithContext>(queries::GET_BUYER_ORDERS)
        .bind(buyer_id)
        .fetch_all(db_manager.pool())
        .await?;
    Ok(orders)
}

/// 판매자 수주 조회
pub async fn get_seller_orders(
    db_manager: &DatabaseManager,
    seller_id: i64,
) -> Result<Vec<OrderWithContext>, AppError> {
    info!("{:<12} --> 수주 조회 seller: {}", "Query", seller_id);
    let orders = sqlx::query_as::<_, OrderWithContext>(queries::GET_SELLER_ORDERS)
        .bind(seller_id)
        .fetch_all(db_manager.pool())
        .await?;
    Ok(orders)
}

// endregion: --- Query Handlers
