//! Wire envelopes carried over the shared channel.
//!
//! Every outbound request and inbound reply carries the correlation triple
//! `{name, context, subjectId}`. Frames are JSON text tagged by `type`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::events::EventType;
use crate::ids::{ContextId, ModelName, RequestId};

/// HTTP-like verb the host uses to route a request.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestType {
    Get,
    Post,
    Put,
    Delete,
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// The identity used to match a reply to its originating request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub name: ModelName,
    pub context: ContextId,
    pub subject_id: RequestId,
}

impl std::fmt::Display for Correlation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.name, self.context, self.subject_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub name: ModelName,
    pub context: ContextId,
    pub subject_id: RequestId,
    /// Wall-clock milliseconds. Diagnostics only.
    pub timestamp: i64,
    #[serde(default)]
    pub payload: Value,
    pub urn: String,
    pub request_type: RequestType,
}

impl RequestEnvelope {
    pub fn correlation(&self) -> Correlation {
        Correlation {
            name: self.name.clone(),
            context: self.context.clone(),
            subject_id: self.subject_id.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub name: ModelName,
    pub context: ContextId,
    pub subject_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Successful reply echoing the request's correlation.
    pub fn data(request: &RequestEnvelope, data: Value) -> Self {
        Self {
            name: request.name.clone(),
            context: request.context.clone(),
            subject_id: request.subject_id.clone(),
            data: Some(data),
            error: None,
        }
    }

    /// Failed reply echoing the request's correlation.
    pub fn error(request: &RequestEnvelope, message: impl Into<String>) -> Self {
        Self {
            name: request.name.clone(),
            context: request.context.clone(),
            subject_id: request.subject_id.clone(),
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn correlation(&self) -> Correlation {
        Correlation {
            name: self.name.clone(),
            context: self.context.clone(),
            subject_id: self.subject_id.clone(),
        }
    }

    pub fn matches(&self, correlation: &Correlation) -> bool {
        self.name == correlation.name
            && self.context == correlation.context
            && self.subject_id == correlation.subject_id
    }
}

/// A single message on the shared channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelFrame {
    #[serde(rename = "data-load")]
    Load(RequestEnvelope),
    #[serde(rename = "data-loaded")]
    Loaded(ResponseEnvelope),
}

impl ChannelFrame {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// The channel this frame travels on. Matches the serialized `type` tag.
    pub fn event(&self) -> EventType {
        match self {
            Self::Load(_) => EventType::DataLoad,
            Self::Loaded(_) => EventType::DataLoaded,
        }
    }

    pub fn correlation(&self) -> Correlation {
        match self {
            Self::Load(req) => req.correlation(),
            Self::Loaded(resp) => resp.correlation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> RequestEnvelope {
        RequestEnvelope {
            name: ModelName::from_raw("journal"),
            context: ContextId::from_raw("C1"),
            subject_id: RequestId::from_raw("g1"),
            timestamp: 1_700_000_000_000,
            payload: json!({}),
            urn: "/journal/me".into(),
            request_type: RequestType::Get,
        }
    }

    #[test]
    fn request_wire_format_is_camel_case() {
        let frame = ChannelFrame::Load(request());
        let json: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "data-load");
        assert_eq!(json["subjectId"], "g1");
        assert_eq!(json["requestType"], "GET");
        assert_eq!(json["urn"], "/journal/me");
    }

    #[test]
    fn frame_tag_follows_event_type() {
        let frames = [
            ChannelFrame::Load(request()),
            ChannelFrame::Loaded(ResponseEnvelope::error(&request(), "boom")),
        ];
        for frame in frames {
            let json: Value = serde_json::from_str(&frame.encode().unwrap()).unwrap();
            assert_eq!(json["type"], frame.event().as_str());
            assert!(frame.event().is_channel());
        }
    }

    #[test]
    fn response_omits_absent_fields() {
        let resp = ResponseEnvelope::data(&request(), json!([{"id": 1}]));
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["data"][0]["id"], 1);
    }

    #[test]
    fn decode_loaded_frame_from_host() {
        let raw = concat!(
            r#"{"type":"data-loaded","name":"journal","context":"C1","#,
            r#""subjectId":"g1","error":"nope"}"#,
        );
        let frame = ChannelFrame::decode(raw).unwrap();
        match frame {
            ChannelFrame::Loaded(resp) => {
                assert_eq!(resp.error.as_deref(), Some("nope"));
                assert!(resp.data.is_none());
                assert!(resp.matches(&request().correlation()));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn matches_requires_full_triple() {
        let req = request();
        let mut resp = ResponseEnvelope::data(&req, json!(null));
        assert!(resp.matches(&req.correlation()));

        resp.context = ContextId::from_raw("C2");
        assert!(!resp.matches(&req.correlation()));
    }
}
