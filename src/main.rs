// region:    --- Imports
use crate::auth::JwtKeys;
use crate::database::DatabaseManager;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Modules
mod auth;
mod bidding;
mod database;
mod error;
mod handlers;
mod orders;
mod query;
mod scheduler;
mod store;
mod users;

// endregion: --- Modules

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // JWT 키 로드
    let jwt_keys = Arc::new(JwtKeys::from_env());

    // 경매 종료 스케줄러 시작
    let auction_scheduler = scheduler::AuctionScheduler::new(db_manager.get_pool());
    auction_scheduler.start().await;

    // SPA 클라이언트를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route(
            "/auctions",
            get(handlers::handle_list_auctions).post(handlers::handle_create_auction),
        )
        .route("/auctions/user/my-auctions", get(handlers::handle_my_auctions))
        .route("/auctions/user/my-bids", get(handlers::handle_my_bids))
        .route(
            "/auctions/:id",
            get(handlers::handle_get_auction)
                .put(handlers::handle_update_auction)
                .delete(handlers::handle_delete_auction),
        )
        .route("/auctions/:id/bid", post(handlers::handle_bid))
        .route("/auctions/:id/resolve", post(handlers::handle_resolve_auction))
        .route("/orders", post(handlers::handle_create_order))
        .route("/orders/my", get(handlers::handle_my_orders))
        .route("/orders/seller", get(handlers::handle_seller_orders))
        .route("/users", get(handlers::handle_list_users))
        .route(
            "/users/:id",
            get(handlers::handle_get_user)
                .put(handlers::handle_update_user)
                .delete(handlers::handle_delete_user),
        )
        .layer(cors)
        .with_state((db_manager, jwt_keys));

    // 리스너 생성(로컬 호스트의 3000번 포트를 사용)
    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
