/// 경매 종료 스케줄러
/// 마감이 지난 활성 경매를 주기적으로 찾아 종료 확정 경로(resolve_auction_end)로
/// 넘긴다. 종료 판정 로직은 여기서 재정의하지 않는다.
// region:    --- Imports
use crate::bidding::commands::resolve_auction_end;
use crate::bidding::model::AuctionStatus;
use crate::store::PgStore;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error};

// endregion: --- Imports

// region:    --- Auction Scheduler

/// 경매 종료 스케줄러
pub struct AuctionScheduler {
    pool: Arc<PgPool>,
}

impl AuctionScheduler {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// 스케줄러 시작 (1초 주기)
    pub async fn start(&self) {
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Err(e) = Self::sweep_expired_auctions(&pool).await {
                    error!(
                        "{:<12} --> 경매 종료 스윕 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
            }
        });
    }

    /// 마감이 지난 활성 경매를 종료 확정한다
    async fn sweep_expired_auctions(pool: &Arc<PgPool>) -> Result<(), crate::error::AppError> {
        let expired: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM auctions WHERE status = $1 AND end_time <= $2",
        )
        .bind(AuctionStatus::Active.as_str())
        .bind(Utc::now())
        .fetch_all(&**pool)
        .await?;

        if expired.is_empty() {
            return Ok(());
        }

        let store = PgStore::new(Arc::clone(pool));
        for auction_id in expired {
            let ended = resolve_auction_end(auction_id, &store).await?;
            debug!(
                "{:<12} --> 경매 {} 종료, 낙찰자: {:?}",
                "Scheduler", ended.id, ended.winner_id
            );
        }

        Ok(())
    }
}

// endregion: --- Auction Scheduler
