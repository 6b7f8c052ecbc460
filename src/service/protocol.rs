use serde::{Serialize, Deserialize};

// Request bodies
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub image_data: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub image_data: String,
    pub username: String,
}

// Server reply, shared by both endpoints
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ServerResponse {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl ServerResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

pub const CSRF_HEADER: &str = "X-CSRFToken";
