//! Filter state synchronization
//!
//! - `state` - filter/sort/page state and its edit operations
//! - `codec` - shareable query-string encoding of that state
//! - `fetcher` - page sources (HTTP client or in-process registry)
//! - `driver` - debounced background task keeping results in step with state

pub mod codec;
pub mod driver;
pub mod fetcher;
pub mod state;

pub use codec::CodecError;
pub use driver::{FilterSync, RequestToken, SyncClosed, SyncHandle, SyncSnapshot};
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use state::{FilterState, Mutation};
