pub mod actor;
pub mod cart;
pub mod coupon;
pub mod errors;
pub mod notification;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod product;
