//! Typed records for the remote API's JSON responses
//!
//! Every field the platform may omit is optional and defaulted here, so a
//! missing counter reads as `0` instead of failing the whole lookup.

use serde::Deserialize;

use super::FetchError;

/// Common `{code, message, data}` envelope
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap `data`, turning a non-zero code into a [`FetchError::RemoteApi`].
    pub fn into_data(self) -> Result<T, FetchError> {
        if self.code != 0 {
            return Err(FetchError::RemoteApi {
                code: self.code,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| FetchError::Malformed("response has no data".to_string()))
    }
}

/// `data` of the video view lookup
#[derive(Debug, Default, Deserialize)]
pub struct VideoView {
    pub aid: Option<u64>,
    pub cid: Option<u64>,
    pub title: Option<String>,
    #[serde(default)]
    pub stat: VideoStat,
}

/// Counters inside the view lookup
#[derive(Debug, Default, Deserialize)]
pub struct VideoStat {
    pub view: Option<i64>,
    pub like: Option<i64>,
    pub coin: Option<i64>,
    pub favorite: Option<i64>,
    pub share: Option<i64>,
}

impl VideoStat {
    pub fn count(value: Option<i64>) -> u64 {
        value.map_or(0, |v| u64::try_from(v).unwrap_or(0))
    }
}

/// `data` of the online viewer lookup
#[derive(Debug, Default, Deserialize)]
pub struct OnlineTotal {
    pub total: Option<OnlineCount>,
}

/// The platform reports viewers either as a number or as display text
/// such as `"1000+"` or `"1.2万+"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OnlineCount {
    Number(i64),
    Text(String),
}

impl OnlineCount {
    pub fn value(&self) -> u64 {
        match self {
            OnlineCount::Number(n) => u64::try_from(*n).unwrap_or(0),
            OnlineCount::Text(text) => parse_display_count(text),
        }
    }
}

fn parse_display_count(text: &str) -> u64 {
    let text = text.trim();
    let numeric_len = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, rest) = text.split_at(numeric_len);

    let Ok(number) = number.parse::<f64>() else {
        return 0;
    };
    let multiplier = if rest.starts_with('万') { 10_000.0 } else { 1.0 };
    (number * multiplier).round().max(0.0) as u64
}
