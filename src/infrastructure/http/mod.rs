pub mod dto;
pub mod notification_gateway;

pub use notification_gateway::{HttpNotificationGateway, NotificationEndpoints};
