// region:    --- Imports
use crate::bidding::model::{Auction, AuctionStatus, Bid};
use crate::error::AppError;
use crate::orders::model::{Order, ShippingAddress};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- Write Models

/// 저장소에 추가할 신규 입찰
#[derive(Debug, Clone)]
pub struct NewBid {
    pub bidder_id: i64,
    pub bid_amount: i64,
    pub bid_time: DateTime<Utc>,
}

/// 입찰 수락 시 경매 행에 적용할 변경 사항
#[derive(Debug, Clone)]
pub struct BidUpdate {
    pub current_bid: i64,
    pub is_reserve_met: bool,
    pub end_time: DateTime<Utc>,
}

/// 저장소에 추가할 신규 주문
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub auction_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub amount: i64,
    pub contact_number: Option<String>,
    pub shipping_address: ShippingAddress,
}

// endregion: --- Write Models

// region:    --- Store Traits

/// 경매 저장소 트레이트
/// 입찰 엔진이 의존하는 쓰기 연산의 경계. 모든 쓰기는 조건부(CAS)로,
/// 기대한 이전 상태와 다르면 None을 반환하여 재시도를 유도한다.
#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// 경매 조회
    async fn load_auction(&self, auction_id: i64) -> Result<Option<Auction>, AppError>;

    /// 최고(=가장 최근) 입찰 조회
    async fn highest_bid(&self, auction_id: i64) -> Result<Option<Bid>, AppError>;

    /// 입찰 적용: current_bid가 expected와 일치하고 상태가 active일 때만
    /// 입찰 추가와 경매 갱신을 한 트랜잭션으로 수행한다.
    /// CAS 충돌 시 None을 반환한다.
    async fn apply_bid(
        &self,
        auction_id: i64,
        expected_current_bid: i64,
        bid: NewBid,
        update: BidUpdate,
    ) -> Result<Option<Auction>, AppError>;

    /// 경매 종료 처리: 상태가 active이고 current_bid가 expected와 일치할 때만
    /// ended로 전환하고 낙찰자를 기록한다. 이미 종료되었거나 낙찰자를 읽은 뒤
    /// 새 입찰이 반영된 경우(CAS 충돌) None을 반환한다.
    async fn mark_ended(
        &self,
        auction_id: i64,
        expected_current_bid: i64,
        winner_id: Option<i64>,
    ) -> Result<Option<Auction>, AppError>;
}

/// 주문 저장소 트레이트
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// 경매에 연결된 주문 조회
    async fn find_order_by_auction(&self, auction_id: i64) -> Result<Option<Order>, AppError>;

    /// 주문 생성. auction_id 유일성 위반은 Conflict로 변환된다.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, AppError>;
}

// endregion: --- Store Traits

// region:    --- Postgres Store

/// Postgres 저장소 구현체
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuctionStore for PgStore {
    async fn load_auction(&self, auction_id: i64) -> Result<Option<Auction>, AppError> {
        let auction = sqlx::query_as::<_, Auction>("SELECT * FROM auctions WHERE id = $1")
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(auction)
    }

    async fn highest_bid(&self, auction_id: i64) -> Result<Option<Bid>, AppError> {
        // 입찰 금액은 엄격히 증가하므로 최고 입찰 = 마지막 입찰
        let bid = sqlx::query_as::<_, Bid>(
            "SELECT * FROM bids WHERE auction_id = $1 ORDER BY bid_amount DESC LIMIT 1",
        )
        .bind(auction_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(bid)
    }

    async fn apply_bid(
        &self,
        auction_id: i64,
        expected_current_bid: i64,
        bid: NewBid,
        update: BidUpdate,
    ) -> Result<Option<Auction>, AppError> {
        let mut tx = self.pool.begin().await?;

        // 조건부 갱신: 기대한 현재가와 일치하는 활성 경매만
        let updated = sqlx::query_as::<_, Auction>(
            "UPDATE auctions
             SET current_bid = $1, bid_count = bid_count + 1,
                 is_reserve_met = $2, end_time = $3, updated_at = $4
             WHERE id = $5 AND current_bid = $6 AND status = $7
             RETURNING *",
        )
        .bind(update.current_bid)
        .bind(update.is_reserve_met)
        .bind(update.end_time)
        .bind(bid.bid_time)
        .bind(auction_id)
        .bind(expected_current_bid)
        .bind(AuctionStatus::Active.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(auction) = updated else {
            // CAS 충돌: 다른 입찰이 먼저 반영됨
            tx.rollback().await?;
            return Ok(None);
        };

        // 입찰 기록 추가
        sqlx::query(
            "INSERT INTO bids (auction_id, bidder_id, bid_amount, bid_time)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(auction_id)
        .bind(bid.bidder_id)
        .bind(bid.bid_amount)
        .bind(bid.bid_time)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(auction))
    }

    async fn mark_ended(
        &self,
        auction_id: i64,
        expected_current_bid: i64,
        winner_id: Option<i64>,
    ) -> Result<Option<Auction>, AppError> {
        // current_bid CAS: 낙찰자 판정 이후 커밋된 입찰이 있으면 전환하지 않는다
        let updated = sqlx::query_as::<_, Auction>(
            "UPDATE auctions
             SET status = $1, winner_id = $2, updated_at = $3
             WHERE id = $4 AND status = $5 AND current_bid = $6
             RETURNING *",
        )
        .bind(AuctionStatus::Ended.as_str())
        .bind(winner_id)
        .bind(Utc::now())
        .bind(auction_id)
        .bind(AuctionStatus::Active.as_str())
        .bind(expected_current_bid)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(updated)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn find_order_by_auction(&self, auction_id: i64) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE auction_id = $1")
            .bind(auction_id)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(order)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, AppError> {
        let now = Utc::now();
        let result = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (auction_id, buyer_id, seller_id, amount, contact_number, status,
                                 shipping_street, shipping_city, shipping_state,
                                 shipping_zip_code, shipping_country, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7, $8, $9, $10, $11, $11)
             RETURNING *",
        )
        .bind(order.auction_id)
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(order.amount)
        .bind(&order.contact_number)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.zip_code)
        .bind(&order.shipping_address.country)
        .bind(now)
        .fetch_one(&*self.pool)
        .await;

        match result {
            Ok(order) => Ok(order),
            // 유일성 제약 위반은 중복 주문 시도
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::conflict(
                "ORDER_EXISTS",
                "이미 이 경매에 대한 주문이 존재합니다.",
            )),
            Err(e) => Err(e.into()),
        }
    }
}

// endregion: --- Postgres Store

// region:    --- Memory Store (test)

/// 테스트용 인메모리 저장소
/// Postgres 구현체와 동일한 CAS 의미론을 Mutex 한 개로 재현한다.
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryState {
        auctions: HashMap<i64, Auction>,
        bids: Vec<Bid>,
        orders: Vec<Order>,
        next_bid_id: i64,
        next_order_id: i64,
    }

    #[derive(Default)]
    pub struct MemoryStore {
        state: Mutex<MemoryState>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_auction(&self, auction: Auction) {
            self.state.lock().unwrap().auctions.insert(auction.id, auction);
        }

        pub fn auction(&self, id: i64) -> Option<Auction> {
            self.state.lock().unwrap().auctions.get(&id).cloned()
        }

        pub fn bids_for(&self, auction_id: i64) -> Vec<Bid> {
            self.state
                .lock()
                .unwrap()
                .bids
                .iter()
                .filter(|b| b.auction_id == auction_id)
                .cloned()
                .collect()
        }

        pub fn orders_for(&self, auction_id: i64) -> Vec<Order> {
            self.state
                .lock()
                .unwrap()
                .orders
                .iter()
                .filter(|o| o.auction_id == auction_id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl AuctionStore for MemoryStore {
        async fn load_auction(&self, auction_id: i64) -> Result<Option<Auction>, AppError> {
            Ok(self.state.lock().unwrap().auctions.get(&auction_id).cloned())
        }

        async fn highest_bid(&self, auction_id: i64) -> Result<Option<Bid>, AppError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .bids
                .iter()
                .filter(|b| b.auction_id == auction_id)
                .max_by_key(|b| b.bid_amount)
                .cloned())
        }

        async fn apply_bid(
            &self,
            auction_id: i64,
            expected_current_bid: i64,
            bid: NewBid,
            update: BidUpdate,
        ) -> Result<Option<Auction>, AppError> {
            let mut state = self.state.lock().unwrap();

            let conflict = {
                let Some(auction) = state.auctions.get(&auction_id) else {
                    return Ok(None);
                };
                auction.current_bid != expected_current_bid
                    || auction.status != AuctionStatus::Active.as_str()
            };
            if conflict {
                return Ok(None);
            }

            state.next_bid_id += 1;
            let bid_row = Bid {
                id: state.next_bid_id,
                auction_id,
                bidder_id: bid.bidder_id,
                bid_amount: bid.bid_amount,
                bid_time: bid.bid_time,
            };
            state.bids.push(bid_row);

            let auction = state.auctions.get_mut(&auction_id).unwrap();
            auction.current_bid = update.current_bid;
            auction.bid_count += 1;
            auction.is_reserve_met = update.is_reserve_met;
            auction.end_time = update.end_time;
            auction.updated_at = bid.bid_time;
            Ok(Some(auction.clone()))
        }

        async fn mark_ended(
            &self,
            auction_id: i64,
            expected_current_bid: i64,
            winner_id: Option<i64>,
        ) -> Result<Option<Auction>, AppError> {
            let mut state = self.state.lock().unwrap();
            let Some(auction) = state.auctions.get_mut(&auction_id) else {
                return Ok(None);
            };
            if auction.status != AuctionStatus::Active.as_str()
                || auction.current_bid != expected_current_bid
            {
                return Ok(None);
            }
            auction.status = AuctionStatus::Ended.as_str().to_string();
            auction.winner_id = winner_id;
            Ok(Some(auction.clone()))
        }
    }

    #[async_trait]
    impl OrderStore for MemoryStore {
        async fn find_order_by_auction(&self, auction_id: i64) -> Result<Option<Order>, AppError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .orders
                .iter()
                .find(|o| o.auction_id == auction_id)
                .cloned())
        }

        async fn insert_order(&self, order: NewOrder) -> Result<Order, AppError> {
            let mut state = self.state.lock().unwrap();

            // auction_id 유일성 제약 재현
            if state.orders.iter().any(|o| o.auction_id == order.auction_id) {
                return Err(AppError::conflict(
                    "ORDER_EXISTS",
                    "이미 이 경매에 대한 주문이 존재합니다.",
                ));
            }

            state.next_order_id += 1;
            let now = Utc::now();
            let row = Order {
                id: state.next_order_id,
                auction_id: order.auction_id,
                buyer_id: order.buyer_id,
                seller_id: order.seller_id,
                amount: order.amount,
                contact_number: order.contact_number,
                status: "pending".to_string(),
                shipping_street: order.shipping_address.street,
                shipping_city: order.shipping_address.city,
                shipping_state: order.shipping_address.state,
                shipping_zip_code: order.shipping_address.zip_code,
                shipping_country: order.shipping_address.country,
                created_at: now,
                updated_at: now,
            };
            state.orders.push(row.clone());
            Ok(row)
        }
    }
}

// endregion: --- Memory Store (test)
