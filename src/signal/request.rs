//! Signal wire types: a request/response pair keyed by a fresh uuid per
//! request (spec.md §3, Signal request/response).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub uid: Uuid,
    pub action: String,
    pub payload: Value,
}

impl Request {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self {
            uid: Uuid::new_v4(),
            action: action.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub uid: Uuid,
    pub success: bool,
    pub payload: Value,
}

impl Response {
    pub fn success(request: &Request, payload: Value) -> Self {
        Self {
            uid: request.uid,
            success: true,
            payload,
        }
    }

    pub fn failure(request: &Request, payload: Value) -> Self {
        Self {
            uid: request.uid,
            success: false,
            payload,
        }
    }
}
