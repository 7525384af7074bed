pub use self::handler::{EventHandler, HandlerRegistry};
pub use self::informer::{InformerError, InformerSettings, MultiClusterInformer, ProcessOutcome};
pub use self::sink::FunnelSink;
pub use self::state::InformerState;
pub use self::watch_set::{ResourceSpec, SourceSpec, WatchTarget, expand_targets};

mod handler;
mod informer;
mod sink;
mod state;
mod watch_set;
