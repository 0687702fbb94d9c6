/// 경매 상세 조회 (판매자 조인 포함)
pub const GET_AUCTION_WITH_SELLER: &str = r#"
    SELECT a.*, u.name AS seller_name, u.email AS seller_email
    FROM auctions a
    JOIN users u ON u.id = a.seller_id
    WHERE a.id = $1
"#;

/// 경매 입찰 이력 조회 (입찰자 조인, 표시용 금액 내림차순)
pub const GET_AUCTION_BIDS: &str = r#"
    SELECT b.*, u.name AS bidder_name, u.email AS bidder_email
    FROM bids b
    JOIN users u ON u.id = b.bidder_id
    WHERE b.auction_id = $1
    ORDER BY b.bid_amount DESC
"#;

/// 판매자 본인 경매 조회 (상태 필터는 선택)
pub const GET_USER_AUCTIONS: &str = r#"
    SELECT a.*, u.name AS seller_name, u.email AS seller_email
    FROM auctions a
    JOIN users u ON u.id = a.seller_id
    WHERE a.seller_id = $1 AND ($2::text IS NULL OR a.status = $2)
    ORDER BY a.created_at DESC
"#;

/// 구매자가 입찰한 경매 조회 (상태 필터는 선택)
pub const GET_USER_BID_AUCTIONS: &str = r#"
    SELECT a.*, u.name AS seller_name, u.email AS seller_email
    FROM auctions a
    JOIN users u ON u.id = a.seller_id
    WHERE ($2::text IS NULL OR a.status = $2)
      AND EXISTS (SELECT 1 FROM bids b WHERE b.auction_id = a.id AND b.bidder_id = $1)
    ORDER BY a.updated_at DESC
"#;

/// 구매자 본인 주문 조회 (경매 요약과 판매자 조인)
pub const GET_BUYER_ORDERS: &str = r#"
    SELECT o.*, a.title AS auction_title, a.location AS auction_location,
           a.end_time AS auction_end_time,
           u.name AS counterpart_name, u.email AS counterpart_email
    FROM orders o
    JOIN auctions a ON a.id = o.auction_id
    JOIN users u ON u.id = o.seller_id
    WHERE o.buyer_id = $1
    ORDER BY o.created_at DESC
"#;

/// 판매자 수주 조회 (경매 요약과 구매자 조인)
pub const GET_SELLER_ORDERS: &str = r#"
    SELECT o.*, a.title AS auction_title, a.location AS auction_location,
           a.end_time AS auction_end_time,
           u.name AS counterpart_name, u.email AS counterpart_email
    FROM orders o
    JOIN auctions a ON a.id = o.auction_id
    JOIN users u ON u.id = o.buyer_id
    WHERE o.seller_id = $1
    ORDER BY o.created_at DESC
"#;
