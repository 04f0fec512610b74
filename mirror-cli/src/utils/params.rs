use reqwest::header::{HeaderName, HeaderValue};
use tracing::{debug, error};

use crate::error::AppError;

/// Parses a list of `key=value` strings into key-value pairs.
///
/// Each string is split at the first `=`, so values may themselves contain
/// `=`. Keys and values are trimmed.
///
/// # Errors
///
/// Returns `AppError::InvalidInput` if any entry has no `=` or an empty key.
pub fn parse_params(params: &[String]) -> Result<Vec<(String, String)>, AppError> {
    debug!("Parsing {} parameters", params.len());

    params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .map(|(key, value)| (key.trim(), value.trim()))
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| {
                    error!("Invalid param format: {param}");
                    AppError::InvalidInput(format!("Invalid param format: {param}"))
                })
        })
        .collect()
}

/// Parses `Name=value` strings into typed HTTP headers.
pub fn parse_headers(params: &[String]) -> Result<Vec<(HeaderName, HeaderValue)>, AppError> {
    parse_params(params)?
        .into_iter()
        .map(|(key, value)| {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| AppError::InvalidInput(format!("Invalid header name '{key}': {e}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| AppError::InvalidInput(format!("Invalid value for header '{key}': {e}")))?;
            debug!(header = %name, "Added request header");
            Ok((name, value))
        })
        .collect()
}
