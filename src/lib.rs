//! A small Rust client for Heliophysics API (HAPI) servers.
//!
//! A [`Server`] binds one base URL and exposes the four HAPI endpoints:
//! `capabilities`, `catalog`, `info` and `data`. JSON responses are checked
//! against the HAPI status envelope; `data` is requested as CSV and returned
//! as a [`TimeSeries`].
//!
//! A server that cannot be reached, answers with an error status or does not
//! speak HAPI yields `Ok(None)`. Errors are reserved for caller mistakes (a
//! malformed base URL, unknown parameter names, unparseable times), payloads
//! missing required fields, and timeouts.
//!
//! Metadata responses are memoized per session in [`RequestCaches`]; sessions
//! can share one cache set through [`Server::with_caches`].
//!
//! ## Quick start
//! - Pass the server URL to [`Server::new`], or configure it via `HAPI_URL` or a
//!   `.hapirc` file and call [`Server::from_env`].
//!
//! ```no_run
//! use hapi_client::{Result, Server};
//!
//! fn main() -> Result<()> {
//!     let server = Server::new("https://cdaweb.gsfc.nasa.gov/hapi")?;
//!     let Some(catalog) = server.fetch_catalog()? else {
//!         return Ok(());
//!     };
//!     let dataset = &catalog[0];
//!     if let Some(info) = dataset.description()? {
//!         println!("{info}");
//!     }
//!     let table = server.fetch_data(
//!         &dataset.id,
//!         "2020-01-01T00:00:00Z",
//!         "2020-01-01T00:10:00Z",
//!         None,
//!     )?;
//!     if let Some(table) = table {
//!         println!("{table}");
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod cache;
mod config;
mod data;
mod error;
mod gateway;
mod model;
pub mod parsers;
pub mod pretty;
mod server;
mod status;
mod time;
mod timeseries;
mod transport;
mod util;

pub use cache::{InfoKey, Memoized, RequestCaches};
pub use config::{DEFAULT_TIMEOUT, ServerConfig};
pub use data::{
    CachedDataRequest, DEFAULT_MAX_IN_FLIGHT, DataFetch, DataRequest, DirectFetch,
    SplitDataRequest, default_chain,
};
pub use error::{Error, Result};
pub use gateway::{Endpoint, get_from_endpoint};
pub use model::{Capabilities, Catalog, Dataset, DatasetInfo, Parameter, ParameterType};
pub use server::Server;
pub use status::{HapiStatus, is_ok, parse_status};
pub use time::ToUtc;
pub use timeseries::{Cell, TimeSeries};
pub use transport::{HttpReply, HttpTransport, Transport};
