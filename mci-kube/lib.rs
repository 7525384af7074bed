pub use self::client::{ClientError, KubernetesClient, get_dynamic_api};
pub use self::provider::{KubeWatchProvider, connect_all};
pub use self::registry::{DiscoveryList, KindRegistry, convert_to_vector};

mod client;
mod provider;
mod registry;
mod stream_backoff;
mod watcher;
