//! Upstream API clients.
//!
//! One module per upstream, all funneling their HTTP through the shared
//! [`FetchContext`](crate::net::FetchContext):
//!
//! - [`anime`] - Primary anime catalog REST API (feeds, letter listings,
//!   search, detail, episode lookups)
//! - [`comics`] - Comics catalog REST API (rankings, search, unlimited
//!   listing, detail, chapters, pages)
//! - [`metadata`] - GraphQL metadata service (title matching, trending,
//!   cover enhancement)
//! - [`infoapi`] - Secondary info API (search-then-info two-step lookup)

pub mod anime;
pub mod comics;
pub mod infoapi;
pub mod metadata;

pub use anime::AnimeApi;
pub use comics::ComicsApi;
pub use infoapi::InfoApi;
pub use metadata::MetadataApi;
