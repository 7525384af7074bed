pub use self::controller::{
    EventHandler, FunnelSink, HandlerRegistry, InformerError, InformerSettings, InformerState, MultiClusterInformer,
    ProcessOutcome, ResourceSpec, SourceSpec, WatchTarget, expand_targets,
};
pub use self::core::*;
pub use self::funnel::{EventFunnel, FunnelError, FunnelItem, FunnelStats, RateLimit};
pub use self::provider::{EventSink, ProviderError, SourceCache, Watch, WatchProvider, WatchRequest};
pub use self::store::AggregatedStore;

mod controller;
mod core;
mod funnel;
mod provider;
mod store;

#[cfg(test)]
mod testing;
