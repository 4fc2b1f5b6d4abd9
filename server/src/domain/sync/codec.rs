//! Shareable query-string form of a [`FilterState`]
//!
//! `filter=<base64url(json tree)>&sort=name:asc,age:desc&page=2&size=25`
//!
//! The filter tree travels as unpadded URL-safe base64 so the string survives
//! copy/paste without percent-encoding. Unknown parameters are ignored.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::Url;
use thiserror::Error;

use super::state::FilterState;
use crate::core::constants::{DEFAULT_PAGE_SIZE, MAX_FILTER_JSON_SIZE};
use crate::domain::query::{FilterNode, SortDirection, SortSpec};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed query string: {0}")]
    Malformed(String),

    #[error("Invalid filter encoding: {0}")]
    Filter(String),

    #[error("Invalid sort item '{0}'")]
    Sort(String),

    #[error("Invalid value for '{param}': {value}")]
    Number { param: &'static str, value: String },
}

pub fn encode_sort(sort: &[SortSpec]) -> String {
    sort.iter()
        .map(|s| format!("{}:{}", s.field, s.direction.as_str()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn decode_sort(raw: &str) -> Result<Vec<SortSpec>, CodecError> {
    let mut specs = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (field, direction) = match item.split_once(':') {
            Some((field, dir)) => (
                field,
                SortDirection::parse(dir).ok_or_else(|| CodecError::Sort(item.to_string()))?,
            ),
            None => (item, SortDirection::Asc),
        };
        if field.is_empty() {
            return Err(CodecError::Sort(item.to_string()));
        }
        specs.push(SortSpec {
            field: field.to_string(),
            direction,
        });
    }
    Ok(specs)
}

fn encode_filter(node: &FilterNode) -> Result<String, CodecError> {
    let json = serde_json::to_vec(node).map_err(|e| CodecError::Filter(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_filter(raw: &str) -> Result<FilterNode, CodecError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim_end_matches('='))
        .map_err(|e| CodecError::Filter(e.to_string()))?;
    if bytes.len() > MAX_FILTER_JSON_SIZE {
        return Err(CodecError::Filter(format!(
            "decoded filter exceeds {} bytes",
            MAX_FILTER_JSON_SIZE
        )));
    }
    serde_json::from_slice(&bytes).map_err(|e| CodecError::Filter(e.to_string()))
}

fn parse_number(param: &'static str, value: &str) -> Result<u32, CodecError> {
    value
        .parse::<u32>()
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| CodecError::Number {
            param,
            value: value.to_string(),
        })
}

impl FilterState {
    /// Encode this state; page and size are always present
    pub fn to_query_string(&self) -> Result<String, CodecError> {
        let mut parts = Vec::with_capacity(4);
        if let Some(node) = self.filter() {
            parts.push(format!("filter={}", encode_filter(node)?));
        }
        if self.has_sorting() {
            parts.push(format!("sort={}", encode_sort(self.sort())));
        }
        parts.push(format!("page={}", self.page()));
        parts.push(format!("size={}", self.page_size()));
        Ok(parts.join("&"))
    }

    /// Decode a state; a leading `?` is accepted and percent-escapes are decoded
    pub fn from_query_string(query: &str) -> Result<Self, CodecError> {
        let query = query.trim().trim_start_matches('?');
        let url = Url::parse(&format!("http://state.invalid/?{}", query))
            .map_err(|e| CodecError::Malformed(e.to_string()))?;

        let mut filter = None;
        let mut sort = Vec::new();
        let mut page = 1;
        let mut size = DEFAULT_PAGE_SIZE;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "filter" if !value.is_empty() => filter = Some(decode_filter(&value)?),
                "sort" => sort = decode_sort(&value)?,
                "page" => page = parse_number("page", &value)?,
                "size" => size = parse_number("size", &value)?,
                _ => {}
            }
        }
        Ok(FilterState::from_parts(filter, sort, page, size))
    }
}
