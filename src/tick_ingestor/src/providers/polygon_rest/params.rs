use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};

use crate::models::window::TimeFilter;

/// Ordered query string for one request.
pub type QueryParams = IndexMap<String, String>;

/// Query key carrying the API key.
pub const API_KEY_PARAM: &str = "apiKey";

/// Ticks are always requested oldest first.
const ORDER_ASC: &str = "asc";

/// Parameters for the first page of a fetch: time filter, ascending order,
/// page-size limit and credentials.
pub fn initial_params(filter: &TimeFilter, limit: u32, api_key: &SecretString) -> QueryParams {
    let mut params = QueryParams::new();
    for (k, v) in filter.query_pairs() {
        params.insert(k.to_string(), v);
    }
    params.insert("order".into(), ORDER_ASC.into());
    params.insert("limit".into(), limit.to_string());
    params.insert(API_KEY_PARAM.into(), api_key.expose_secret().to_string());
    params
}

/// Parameters sent alongside a continuation URL. The cursor embedded in the
/// URL already encodes the filter and ordering, so only limit and credentials remain.
pub fn continuation_params(limit: u32, api_key: &SecretString) -> QueryParams {
    let mut params = QueryParams::new();
    params.insert("limit".into(), limit.to_string());
    params.insert(API_KEY_PARAM.into(), api_key.expose_secret().to_string());
    params
}
