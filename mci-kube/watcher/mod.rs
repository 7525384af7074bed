pub use self::cache::ObjectCache;
pub use self::processor::EventsProcessor;
pub use self::watch::watch;

mod backoff;
mod cache;
mod processor;
mod utils;
mod watch;
