/// 입찰 관련 커맨드 처리
/// 1. 입찰 (검증 → 조건부 반영, 낙관적 동시성 재시도)
/// 2. 경매 종료 확정 (낙찰자 결정, 멱등)
// region:    --- Imports
use crate::bidding::model::{Auction, AuctionStatus};
use crate::error::AppError;
use crate::store::{AuctionStore, BidUpdate, NewBid};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bidder_role: String,
    pub bid_amount: i64,
}

// 최대 재시도 횟수: 충돌 시 새 상태로 전체 검증을 다시 수행한다
const MAX_RETRIES: i32 = 100;

/// 입찰 검증
/// 실패 순서 고정: 역할 → 경매 상태 → 마감 시각 → 금액 → 판매자 자기 입찰.
/// 어떤 검증 실패도 상태를 변경하지 않는다.
pub fn validate_bid(
    auction: &Auction,
    cmd: &PlaceBidCommand,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if cmd.bidder_role != "buyer" {
        return Err(AppError::forbidden(
            "ONLY_BUYERS",
            "구매자만 입찰할 수 있습니다.",
        ));
    }

    if auction.status != AuctionStatus::Active.as_str() {
        return Err(AppError::invalid_state(
            "NOT_ACTIVE",
            "경매가 활성 상태가 아닙니다.",
        ));
    }

    if auction.end_time <= now {
        return Err(AppError::invalid_state(
            "ALREADY_ENDED",
            "경매가 이미 종료되었습니다.",
        ));
    }

    if cmd.bid_amount <= auction.current_bid {
        return Err(AppError::invalid_argument(
            "LOW_BID",
            "입찰 금액이 현재 가격보다 높아야 합니다.",
        ));
    }

    // 첫 입찰도 시작가 이상이어야 한다 (current_bid는 0에서 시작)
    if cmd.bid_amount < auction.starting_bid {
        return Err(AppError::invalid_argument(
            "BELOW_STARTING_BID",
            "입찰 금액이 시작가보다 낮습니다.",
        ));
    }

    if cmd.bidder_id == auction.seller_id {
        return Err(AppError::forbidden(
            "SELLER_BID",
            "판매자는 자신의 경매에 입찰할 수 없습니다.",
        ));
    }

    Ok(())
}

/// 입찰 수락 시 경매 행에 적용할 변경 사항 계산
/// 최소 보장가 충족 플래그는 단조적이다 (한번 true면 유지).
/// 자동 연장: 마감까지 남은 시간이 연장 창 이하이면 마감을 now + 창으로 민다.
pub fn bid_transition(auction: &Auction, amount: i64, now: DateTime<Utc>) -> BidUpdate {
    let is_reserve_met = auction.is_reserve_met
        || auction
            .reserve_price
            .map_or(false, |reserve| amount >= reserve);

    let end_time = if auction.auto_extend {
        let window = Duration::minutes(i64::from(auction.auto_extend_minutes));
        if auction.end_time - now <= window {
            now + window
        } else {
            auction.end_time
        }
    } else {
        auction.end_time
    };

    BidUpdate {
        current_bid: amount,
        is_reserve_met,
        end_time,
    }
}

/// 1. 입찰
/// 읽기-검증-쓰기를 한 단위로 수행한다. 조건부 갱신이 실패하면
/// (다른 입찰이 먼저 반영된 경우) 새 상태를 읽어 전체 검증을 다시 한다.
pub async fn handle_place_bid(
    cmd: PlaceBidCommand,
    store: &impl AuctionStore,
) -> Result<Auction, AppError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    let mut retries = 0;

    while retries < MAX_RETRIES {
        // 현재 경매 상태 조회
        let auction = store
            .load_auction(cmd.auction_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("AUCTION_NOT_FOUND", "경매를 찾을 수 없습니다.")
            })?;

        let now = Utc::now();

        // 검증 (실패 시 어떤 변경도 없음)
        validate_bid(&auction, &cmd, now)?;

        // 전이 계산 후 조건부 반영
        let update = bid_transition(&auction, cmd.bid_amount, now);
        let bid = NewBid {
            bidder_id: cmd.bidder_id,
            bid_amount: cmd.bid_amount,
            bid_time: now,
        };

        match store
            .apply_bid(auction.id, auction.current_bid, bid, update)
            .await?
        {
            Some(updated) => {
                info!(
                    "{:<12} --> 입찰 성공: 경매 {} 현재가 {}",
                    "Command", updated.id, updated.current_bid
                );
                return Ok(updated);
            }
            None => {
                // 낙관적 갱신 충돌: 다른 입찰이 먼저 반영됨, 재시도
                warn!(
                    "{:<12} --> 낙관적 갱신 충돌: 재시도 ({}/{})",
                    "Command",
                    retries + 1,
                    MAX_RETRIES
                );
                retries += 1;
                continue;
            }
        }
    }

    Err(AppError::conflict(
        "MAX_RETRIES_EXCEEDED",
        "동시 입찰 충돌로 처리하지 못했습니다. 다시 시도해 주세요.",
    ))
}

/// 2. 경매 종료 확정
/// "종료됨" 판정의 유일한 경로. 스케줄러와 주문 생성이 모두 이 함수를 호출한다.
/// - 이미 ended면 그대로 반환 (멱등)
/// - active이고 마감이 지났으면 ended로 전환, 낙찰자 = 마지막(최고) 입찰자
/// - 그 외에는 변경 없이 현재 상태 반환
/// 낙찰자 판정과 전환은 current_bid CAS로 묶인다: 판정 이후 커밋된 입찰이
/// 있으면 전환이 거부되고 새 상태를 읽어 처음부터 다시 판정한다.
pub async fn resolve_auction_end(
    auction_id: i64,
    store: &impl AuctionStore,
) -> Result<Auction, AppError> {
    let mut retries = 0;

    while retries < MAX_RETRIES {
        let auction = store
            .load_auction(auction_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("AUCTION_NOT_FOUND", "경매를 찾을 수 없습니다.")
            })?;

        let now = Utc::now();

        if auction.status == AuctionStatus::Ended.as_str() {
            return Ok(auction);
        }

        if auction.status != AuctionStatus::Active.as_str() || auction.end_time > now {
            return Ok(auction);
        }

        let winner_id = store.highest_bid(auction_id).await?.map(|b| b.bidder_id);

        match store
            .mark_ended(auction_id, auction.current_bid, winner_id)
            .await?
        {
            Some(ended) => {
                info!(
                    "{:<12} --> 경매 {} 종료 확정, 낙찰자: {:?}",
                    "Command", ended.id, ended.winner_id
                );
                return Ok(ended);
            }
            None => {
                // 다른 호출자가 먼저 종료했거나 판정 이후 입찰이 커밋됨: 다시 읽는다
                warn!(
                    "{:<12} --> 종료 확정 충돌: 재시도 ({}/{})",
                    "Command",
                    retries + 1,
                    MAX_RETRIES
                );
                retries += 1;
            }
        }
    }

    Err(AppError::conflict(
        "MAX_RETRIES_EXCEEDED",
        "동시 입찰 충돌로 처리하지 못했습니다. 다시 시도해 주세요.",
    ))
}

// endregion: --- Commands

// region:    --- Tests


// endregion: --- Tests
