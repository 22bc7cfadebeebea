use uuid::Uuid;

use super::order::{Order, OrderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderPlaced,
    OrderStatusChanged,
    OrderCancelled,
}

/// Message addressed to a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn order_placed(order: &Order) -> Self {
        Self {
            user_id: order.user_id,
            order_id: order.id,
            kind: NotificationKind::OrderPlaced,
            title: "Order received".to_string(),
            message: format!(
                "Your order {} totalling {} has been received.",
                order.id, order.prices.total_price
            ),
        }
    }

    pub fn status_changed(order: &Order) -> Self {
        let kind = if order.status == OrderStatus::Cancelled {
            NotificationKind::OrderCancelled
        } else {
            NotificationKind::OrderStatusChanged
        };
        Self {
            user_id: order.user_id,
            order_id: order.id,
            kind,
            title: format!("Order {}", order.status),
            message: format!("Your order {} is now {}.", order.id, order.status),
        }
    }
}
