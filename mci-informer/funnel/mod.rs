pub use self::item::FunnelItem;
pub use self::queue::{EventFunnel, FunnelError, FunnelStats};
pub use self::rate_limit::RateLimit;

mod item;
mod queue;
mod rate_limit;
