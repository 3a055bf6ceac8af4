use std::fmt;
use std::sync::Arc;

use crate::cache::{InfoKey, Memoized, RequestCaches};
use crate::config::{ServerConfig, load_config};
use crate::data::{DataFetch, DataRequest, default_chain};
use crate::error::{Error, Result};
use crate::gateway::{Endpoint, get_from_endpoint};
use crate::model::{
    Capabilities, Catalog, DatasetInfo, Parameter, ParameterType, catalog_from_payload,
};
use crate::parsers::json_response;
use crate::time::ToUtc;
use crate::timeseries::TimeSeries;
use crate::transport::{HttpTransport, Transport};

/// What a [`Dataset`](crate::Dataset) needs to fetch its own description.
#[derive(Clone)]
pub(crate) struct InfoSource {
    base_url: String,
    transport: Arc<dyn Transport>,
    cache: Arc<Memoized<InfoKey, Arc<DatasetInfo>>>,
}

impl InfoSource {
    pub(crate) fn fetch(&self, id: &str) -> Result<Option<Arc<DatasetInfo>>> {
        fetch_info(self.transport.as_ref(), &self.cache, &self.base_url, id)
    }
}

fn fetch_info(
    transport: &dyn Transport,
    cache: &Memoized<InfoKey, Arc<DatasetInfo>>,
    base_url: &str,
    id: &str,
) -> Result<Option<Arc<DatasetInfo>>> {
    cache.get_or_fetch((base_url.to_string(), id.to_string()), |(url, id)| {
        let query = [("id", id.clone())];
        match get_from_endpoint(transport, url, Endpoint::Info, &query, json_response)? {
            Some(payload) => Ok(Some(Arc::new(DatasetInfo::from_payload(payload)?))),
            None => Ok(None),
        }
    })
}

/// A HAPI server session.
///
/// Every request goes to the bound base URL. Metadata responses are memoized
/// in the session's [`RequestCaches`], which may be shared with other sessions
/// through [`Server::with_caches`] and outlive them.
///
/// ```no_run
/// use hapi_client::Server;
///
/// let server = Server::new("https://cdaweb.gsfc.nasa.gov/hapi")?;
/// if let Some(catalog) = server.fetch_catalog()? {
///     for dataset in catalog.iter().take(5) {
///         println!("{dataset}");
///     }
/// }
/// # Ok::<(), hapi_client::Error>(())
/// ```
pub struct Server {
    url: String,
    transport: Arc<dyn Transport>,
    caches: Arc<RequestCaches>,
    data: Box<dyn DataFetch>,
}

impl Server {
    /// Binds `url` with the default timeout and TLS settings.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::from_config(ServerConfig::new(url))
    }

    /// Reads the URL and settings from `HAPI_*` variables or a `.hapirc` file.
    pub fn from_env() -> Result<Self> {
        Self::from_config(load_config(None)?)
    }

    pub fn from_config(config: ServerConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout, config.verify, config.progress)?;
        Ok(Self::with_transport(config.url, Arc::new(transport)))
    }

    pub fn with_transport(url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let url = url.into();
        tracing::debug!(%url, "opening HAPI session");
        Self {
            data: Box::new(default_chain(Arc::clone(&transport))),
            url,
            transport,
            caches: Arc::new(RequestCaches::new()),
        }
    }

    /// Replaces the session's caches, e.g. with [`RequestCaches::shared`].
    pub fn with_caches(mut self, caches: Arc<RequestCaches>) -> Self {
        self.caches = caches;
        self
    }

    /// Replaces the data fetch chain.
    pub fn with_data_fetch(mut self, data: Box<dyn DataFetch>) -> Self {
        self.data = data;
        self
    }

    /// Runs `f` against a session bound to `url`, closing it afterwards.
    pub fn session<R>(url: impl Into<String>, f: impl FnOnce(&Server) -> Result<R>) -> Result<R> {
        let server = Server::new(url)?;
        f(&server)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn caches(&self) -> &Arc<RequestCaches> {
        &self.caches
    }

    pub fn clear_caches(&self) {
        self.caches.clear_all();
    }

    fn info_source(&self) -> InfoSource {
        InfoSource {
            base_url: self.url.clone(),
            transport: Arc::clone(&self.transport),
            cache: Arc::clone(self.caches.info()),
        }
    }

    pub fn fetch_capabilities(&self) -> Result<Option<Arc<Capabilities>>> {
        let transport = self.transport.as_ref();
        self.caches
            .capabilities()
            .get_or_fetch(self.url.clone(), |url| {
                match get_from_endpoint(transport, url, Endpoint::Capabilities, &[], json_response)? {
                    Some(payload) => Ok(Some(Arc::new(Capabilities::from_payload(payload)?))),
                    None => Ok(None),
                }
            })
    }

    pub fn fetch_catalog(&self) -> Result<Option<Arc<Catalog>>> {
        let transport = self.transport.as_ref();
        let source = self.info_source();
        self.caches.catalog().get_or_fetch(self.url.clone(), |url| {
            match get_from_endpoint(transport, url, Endpoint::Catalog, &[], json_response)? {
                Some(payload) => Ok(Some(Arc::new(catalog_from_payload(payload, &source)?))),
                None => Ok(None),
            }
        })
    }

    pub fn fetch_info(&self, id: &str) -> Result<Option<Arc<DatasetInfo>>> {
        fetch_info(self.transport.as_ref(), self.caches.info(), &self.url, id)
    }

    /// Fetches `[start, stop)` of dataset `id`.
    ///
    /// With `parameters` set, every name must belong to the dataset; an unknown
    /// name is an error raised before the data request is sent. An empty list
    /// selects every parameter, like `None`. Columns of the returned table are
    /// labelled and typed in dataset order when the dataset's info is available.
    pub fn fetch_data(
        &self,
        id: &str,
        start: impl ToUtc,
        stop: impl ToUtc,
        parameters: Option<&[&str]>,
    ) -> Result<Option<TimeSeries>> {
        let start = start.utc()?;
        let stop = stop.utc()?;

        let (info, selected) = match parameters.filter(|names| !names.is_empty()) {
            Some(requested) => {
                let Some(info) = self.fetch_info(id)? else {
                    tracing::debug!(dataset = id, "no info, skipping data request");
                    return Ok(None);
                };
                let selected = select_parameters(id, &info, requested)?;
                (Some(info), selected)
            }
            None => (None, Vec::new()),
        };

        let request = DataRequest {
            base_url: self.url.clone(),
            dataset: id.to_string(),
            start,
            stop,
            parameters: selected,
        };

        let Some(mut table) = self.data.fetch(&request)? else {
            return Ok(None);
        };

        let info = match info {
            Some(info) => Some(info),
            None => self.fetch_info(id).unwrap_or_else(|e| {
                tracing::warn!(dataset = id, error = %e, "no info to label data columns");
                None
            }),
        };
        match info {
            Some(info) => describe_columns(&mut table, &info, &request.parameters),
            None => table.read_numbers(|_| true),
        }
        Ok(Some(table))
    }
}

// Requested names in dataset order.
fn select_parameters(id: &str, info: &DatasetInfo, requested: &[&str]) -> Result<Vec<String>> {
    let unknown: Vec<String> = requested
        .iter()
        .filter(|name| info.parameter(name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !unknown.is_empty() {
        return Err(Error::UnknownParameters {
            dataset: id.to_string(),
            unknown,
        });
    }

    Ok(info
        .parameter_names()
        .filter(|name| requested.contains(name))
        .map(str::to_string)
        .collect())
}

// Labels and types the data columns of `table`. An empty `selected` means all parameters.
fn describe_columns(table: &mut TimeSeries, info: &DatasetInfo, selected: &[String]) {
    let columns: Vec<(String, bool)> = info
        .parameters
        .values()
        .filter(|p| !p.is_time())
        .filter(|p| selected.is_empty() || selected.contains(&p.name))
        .flat_map(|p| {
            let numeric = is_numeric(p);
            p.column_names().into_iter().map(move |name| (name, numeric))
        })
        .collect();

    if columns.len() != table.width() {
        tracing::debug!(
            dataset_columns = columns.len(),
            width = table.width(),
            "column count does not match parameters"
        );
        table.read_numbers(|_| true);
        return;
    }
    table.read_numbers(|i| columns[i].1);
    table.label_columns(columns.into_iter().map(|(name, _)| name).collect());
}

fn is_numeric(p: &Parameter) -> bool {
    !matches!(p.kind, ParameterType::String | ParameterType::IsoTime)
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("url", &self.url)
            .field("transport", &self.transport)
            .field("data", &self.data)
            .finish()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        tracing::debug!(url = %self.url, "closing HAPI session");
    }
}
