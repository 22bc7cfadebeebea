pub mod cart_service;
pub mod catalog_service;
pub mod coupon_service;
pub mod order_service;
pub mod side_effects;
