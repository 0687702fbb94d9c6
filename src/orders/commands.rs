/// 주문 관련 커맨드 처리
/// 낙찰자가 종료된 경매에 대해 배송 주문을 생성한다.
// region:    --- Imports
use crate::bidding::commands::resolve_auction_end;
use crate::bidding::model::AuctionStatus;
use crate::error::AppError;
use crate::orders::model::{Order, ShippingAddress};
use crate::store::{AuctionStore, NewOrder, OrderStore};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Commands

/// 낙찰 주문 생성 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateOrderCommand {
    pub auction_id: i64,
    pub buyer_id: i64,
    pub shipping_address: ShippingAddress,
    pub contact_number: Option<String>,
}

/// 낙찰 주문 생성
/// 종료 판정은 resolve_auction_end 한 경로로만 이루어진다
/// (주문 생성이 지연된 종료 확정의 백스톱 역할을 한다).
/// 중복 주문은 저장소의 auction_id 유일성 제약이 최종 방어선이며 Conflict로 표면화된다.
pub async fn create_order_from_win(
    cmd: CreateOrderCommand,
    store: &(impl AuctionStore + OrderStore),
) -> Result<Order, AppError> {
    info!("{:<12} --> 낙찰 주문 생성 시작: {:?}", "Command", cmd);

    // 종료 확정 (멱등, 마감 전이면 상태 변경 없음)
    let auction = resolve_auction_end(cmd.auction_id, store).await?;

    if auction.status != AuctionStatus::Ended.as_str() {
        return Err(AppError::invalid_state(
            "NOT_ENDED",
            "경매가 아직 종료되지 않았습니다.",
        ));
    }

    // 낙찰자 본인만 주문할 수 있다
    match auction.winner_id {
        Some(winner) if winner == cmd.buyer_id => {}
        _ => {
            return Err(AppError::forbidden(
                "NOT_WINNER",
                "낙찰자만 주문을 생성할 수 있습니다.",
            ));
        }
    }

    let order = store
        .insert_order(NewOrder {
            auction_id: auction.id,
            buyer_id: cmd.buyer_id,
            seller_id: auction.seller_id,
            amount: auction.current_bid,
            contact_number: cmd.contact_number,
            shipping_address: cmd.shipping_address,
        })
        .await?;

    info!(
        "{:<12} --> 주문 생성 완료: 주문 {} (경매 {}, 금액 {})",
        "Command", order.id, order.auction_id, order.amount
    );
    Ok(order)
}

// endregion: --- Commands

// region:    --- Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::commands::{handle_place_bid, PlaceBidCommand};
    use crate::bidding::model::Auction;
    use crate::store::memory::MemoryStore;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn ended_auction_with_bids() -> (MemoryStore, Auction) {
        let store = MemoryStore::new();
        let now = Utc::now();
        let auction = Auction {
            id: 1,
            title: "혼합 등급 섬유 롯트".to_string(),
            description: "박스 단위 일괄".to_string(),
            category: "Textiles".to_string(),
            location: "대구".to_string(),
            images: vec![],
            quantity: 40,
            unit: "boxes".to_string(),
            grade: "Mixed".to_string(),
            condition: "Fair".to_string(),
            tags: vec![],
            starting_bid: 100,
            current_bid: 0,
            reserve_price: None,
            is_reserve_met: false,
            seller_id: 1,
            winner_id: None,
            status: "active".to_string(),
            start_time: now - Duration::hours(2),
            end_time: now + Duration::milliseconds(50),
            bid_count: 0,
            auto_extend: false,
            auto_extend_minutes: 5,
            shipping_included: false,
            shipping_cost: 0,
            shipping_estimated_days: 7,
            created_at: now,
            updated_at: now,
        };
        store.put_auction(auction.clone());
        (store, auction)
    }

    fn order_cmd(auction_id: i64, buyer_id: i64) -> CreateOrderCommand {
        CreateOrderCommand {
            auction_id,
            buyer_id,
            shipping_address: ShippingAddress {
                street: Some("테헤란로 123".to_string()),
                city: Some("서울".to_string()),
                state: None,
                zip_code: Some("06234".to_string()),
                country: Some("KR".to_string()),
            },
            contact_number: Some("010-0000-0000".to_string()),
        }
    }

    async fn bid(store: &MemoryStore, bidder_id: i64, amount: i64) {
        handle_place_bid(
            PlaceBidCommand {
                auction_id: 1,
                bidder_id,
                bidder_role: "buyer".to_string(),
                bid_amount: amount,
            },
            store,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn winner_creates_order_with_final_amount() {
        let (store, _) = ended_auction_with_bids();
        bid(&store, 2, 150).await;
        bid(&store, 3, 200).await;
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        // 차순위 입찰자(2)는 거부된다
        let err = create_order_from_win(order_cmd(1, 2), &store).await.unwrap_err();
        assert_eq!(err.code(), "NOT_WINNER");

        // 낙찰자(3)는 최종가로 주문을 생성한다
        let order = create_order_from_win(order_cmd(1, 3), &store).await.unwrap();
        assert_eq!(order.amount, 200);
        assert_eq!(order.buyer_id, 3);
        assert_eq!(order.seller_id, 1);
        assert_eq!(order.status, "pending");
    }

    #[tokio::test]
    async fn order_before_auction_end_is_premature() {
        let store = MemoryStore::new();
        let (_, mut auction) = ended_auction_with_bids();
        auction.end_time = Utc::now() + Duration::hours(1);
        store.put_auction(auction);
        bid(&store, 2, 150).await;

        let err = create_order_from_win(order_cmd(1, 2), &store).await.unwrap_err();
        assert_eq!(err.code(), "NOT_ENDED");
    }

    #[tokio::test]
    async fn order_on_unknown_auction_is_not_found() {
        let store = MemoryStore::new();
        let err = create_order_from_win(order_cmd(42, 2), &store).await.unwrap_err();
        assert_eq!(err.code(), "AUCTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn ended_auction_without_bids_has_no_winner_to_order() {
        let (store, _) = ended_auction_with_bids();
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        let err = create_order_from_win(order_cmd(1, 2), &store).await.unwrap_err();
        assert_eq!(err.code(), "NOT_WINNER");
    }

    /// 동일 낙찰자의 중복 요청도 주문은 정확히 하나만 생성된다
    #[tokio::test]
    async fn at_most_one_order_per_auction() {
        let (store, _) = ended_auction_with_bids();
        bid(&store, 3, 200).await;
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        let store = Arc::new(store);
        let s1 = Arc::clone(&store);
        let s2 = Arc::clone(&store);
        let a = tokio::spawn(async move { create_order_from_win(order_cmd(1, 3), &*s1).await });
        let b = tokio::spawn(async move { create_order_from_win(order_cmd(1, 3), &*s2).await });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let ok_count = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok_count, 1);
        for r in &results {
            if let Err(e) = r {
                assert_eq!(e.code(), "ORDER_EXISTS");
            }
        }
        assert_eq!(store.orders_for(1).len(), 1);
    }

    /// 주문 생성이 지연된 종료 확정의 백스톱으로 동작한다
    #[tokio::test]
    async fn order_creation_resolves_ended_auction_lazily() {
        let (store, _) = ended_auction_with_bids();
        bid(&store, 3, 200).await;
        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        // 스케줄러가 아직 돌지 않아 상태는 active, 마감은 지났다
        assert_eq!(store.auction(1).unwrap().status, "active");

        let order = create_order_from_win(order_cmd(1, 3), &store).await.unwrap();
        assert_eq!(order.amount, 200);

        // 주문 생성 경로가 종료 확정까지 수행했다
        let auction = store.auction(1).unwrap();
        assert_eq!(auction.status, "ended");
        assert_eq!(auction.winner_id, Some(3));
    }
}

// endregion: --- Tests
