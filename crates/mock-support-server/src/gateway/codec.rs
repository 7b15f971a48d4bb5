//! Request/response marshaling for the REST gateway.
//!
//! The inbound marshaler comes from the request's `Content-Type`: protobuf
//! for `application/x-protobuf`, JSON for everything else. The outbound one
//! comes from the first recognized `Accept` media type and falls back to the
//! inbound marshaler.
//!
//! JSON follows the proto3 mapping through prost-reflect: lowerCamelCase
//! names on output, either spelling accepted on input, 64-bit integers as
//! strings, timestamps as RFC 3339, unpopulated fields emitted, unknown
//! fields discarded.

use crate::domain::error::{ApiError, ApiResult};
use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use prost::Message;
use prost_reflect::{DeserializeOptions, DynamicMessage, ReflectMessage, SerializeOptions};
use tracing::error;

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marshaler {
    Json,
    Protobuf,
}

/// Marshalers for one gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marshalers {
    pub inbound: Marshaler,
    pub outbound: Marshaler,
}

impl Marshalers {
    /// Choose the marshalers for a request.
    pub fn for_request(headers: &HeaderMap) -> Self {
        let inbound =
            Marshaler::from_header(headers, header::CONTENT_TYPE).unwrap_or(Marshaler::Json);
        let outbound = Marshaler::from_header(headers, header::ACCEPT).unwrap_or(inbound);
        Self { inbound, outbound }
    }
}

impl Marshaler {
    fn from_media_type(media_type: &str) -> Option<Self> {
        let mime = media_type.split(';').next().unwrap_or_default().trim();
        if mime.eq_ignore_ascii_case(PROTOBUF_CONTENT_TYPE) {
            Some(Marshaler::Protobuf)
        } else if mime.eq_ignore_ascii_case(JSON_CONTENT_TYPE) {
            Some(Marshaler::Json)
        } else {
            None
        }
    }

    /// First recognized media type across all values of `name`.
    fn from_header(headers: &HeaderMap, name: HeaderName) -> Option<Self> {
        headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .find_map(Self::from_media_type)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Marshaler::Json => JSON_CONTENT_TYPE,
            Marshaler::Protobuf => PROTOBUF_CONTENT_TYPE,
        }
    }

    /// Decode a request body. An empty JSON body decodes to the default message.
    pub fn decode<T>(&self, body: &[u8]) -> ApiResult<T>
    where
        T: ReflectMessage + Default,
    {
        match self {
            Marshaler::Json => {
                if body.iter().all(u8::is_ascii_whitespace) {
                    return Ok(T::default());
                }
                let invalid = |e: &dyn std::fmt::Display| ApiError::invalid_argument(e.to_string());
                let descriptor = T::default().descriptor();
                let options = DeserializeOptions::new().deny_unknown_fields(false);
                let mut de = serde_json::Deserializer::from_slice(body);
                let dynamic =
                    DynamicMessage::deserialize_with_options(descriptor, &mut de, &options)
                        .map_err(|e| invalid(&e))?;
                de.end().map_err(|e| invalid(&e))?;
                dynamic.transcode_to::<T>().map_err(|e| invalid(&e))
            }
            Marshaler::Protobuf => {
                T::decode(body).map_err(|e| ApiError::invalid_argument(e.to_string()))
            }
        }
    }

    /// Encode a response message.
    pub fn encode<M>(&self, message: &M) -> ApiResult<Vec<u8>>
    where
        M: ReflectMessage,
    {
        match self {
            Marshaler::Json => {
                let mut ser = serde_json::Serializer::new(Vec::new());
                let options = SerializeOptions::new().skip_default_fields(false);
                message
                    .transcode_to_dynamic()
                    .serialize_with_options(&mut ser, &options)
                    .map_err(|e| {
                        error!(error = %e, "failed to marshal json response");
                        ApiError::internal(e.to_string())
                    })?;
                Ok(ser.into_inner())
            }
            Marshaler::Protobuf => Ok(message.encode_to_vec()),
        }
    }

    /// Encode `message` into a complete HTTP response.
    pub fn respond<M>(&self, message: &M) -> Response
    where
        M: ReflectMessage,
    {
        match self.encode(message) {
            Ok(body) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type()))],
                body,
            )
                .into_response(),
            Err(e) => e.into_response(),
        }
    }
}
