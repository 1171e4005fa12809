pub mod notification_gateway;
pub mod session_provider;
pub mod task_spawner;
pub mod time_service;

pub use notification_gateway::NotificationGateway;
pub use session_provider::SessionProvider;
pub use task_spawner::TaskSpawner;
pub use time_service::TimeService;
