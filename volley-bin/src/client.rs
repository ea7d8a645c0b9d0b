use std::sync::Arc;

use anyhow::{Context, Result};
use http::HeaderMap;
use volley_lib::{Client, ClientBuilder, Paginated, RequestExecutor, SingleRequest};

use crate::options::{Config, HeaderMapExt};

/// Creates a client according to the command-line config
pub(crate) fn create(cfg: &Config) -> Result<Client> {
    let headers = HeaderMap::from_header_pairs(&cfg.header)?;
    let rate_limit = cfg.rate_limit();

    ClientBuilder::builder()
        .executor(executor(cfg))
        .requests_per_period(rate_limit.requests_per_period)
        .period(rate_limit.period)
        .max_connections(cfg.max_connections)
        .timeout(cfg.timeout)
        .user_agent(cfg.user_agent.clone())
        .custom_headers(headers)
        .build()
        .client()
        .context("Failed to create request client")
}

/// `--paginate` switches from one call per descriptor to following links
fn executor(cfg: &Config) -> Arc<dyn RequestExecutor> {
    let Some(field) = &cfg.paginate else {
        return Arc::new(SingleRequest);
    };

    let builder = Paginated::builder().next_field(field.clone());
    match cfg.max_pages {
        Some(max_pages) => Arc::new(builder.max_pages(max_pages).build()),
        None => Arc::new(builder.build()),
    }
}
