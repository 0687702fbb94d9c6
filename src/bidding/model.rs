// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Auction Status

/// 경매 라이프사이클 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Draft,
    Active,
    Paused,
    Ended,
    Cancelled,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Draft => "draft",
            AuctionStatus::Active => "active",
            AuctionStatus::Paused => "paused",
            AuctionStatus::Ended => "ended",
            AuctionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(AuctionStatus::Draft),
            "active" => Some(AuctionStatus::Active),
            "paused" => Some(AuctionStatus::Paused),
            "ended" => Some(AuctionStatus::Ended),
            "cancelled" => Some(AuctionStatus::Cancelled),
            _ => None,
        }
    }
}

// endregion: --- Auction Status

// region:    --- Permitted Values

/// 카테고리 허용 목록
pub const CATEGORIES: &[&str] = &[
    "Electronics",
    "Textiles",
    "Food & Beverage",
    "Industrial",
    "Furniture",
    "Automotive",
];

/// 수량 단위 허용 목록
pub const UNITS: &[&str] = &["pieces", "boxes", "pallets", "kg", "lbs", "units"];

/// 등급 허용 목록
pub const GRADES: &[&str] = &["A", "B", "C", "D", "Mixed"];

/// 상태(컨디션) 허용 목록
pub const CONDITIONS: &[&str] = &["New", "Like New", "Good", "Fair", "Poor"];

// endregion: --- Permitted Values

// region:    --- Models

/// 경매(로트) 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub images: Vec<String>,
    pub quantity: i32,
    pub unit: String,
    pub grade: String,
    pub condition: String,
    pub tags: Vec<String>,
    pub starting_bid: i64,
    pub current_bid: i64,
    pub reserve_price: Option<i64>,
    pub is_reserve_met: bool,
    pub seller_id: i64,
    pub winner_id: Option<i64>,
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub bid_count: i32,
    pub auto_extend: bool,
    pub auto_extend_minutes: i32,
    pub shipping_included: bool,
    pub shipping_cost: i64,
    pub shipping_estimated_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 입찰 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub bidder_id: i64,
    pub bid_amount: i64,
    pub bid_time: DateTime<Utc>,
}

// endregion: --- Models
