use serde::Deserialize;

/// Acknowledgment response for lifecycle requests
#[derive(Debug, Deserialize)]
pub struct AckResponse {
    /// Whether the bridge accepted the request.
    pub success: bool,
    /// Error description if the request was rejected.
    pub error: Option<String>,
}

/// Profile lookup response
#[derive(Debug, Deserialize)]
pub struct ProfileResponse {
    /// Profile picture URL, if the account has one.
    pub picture: Option<String>,
    /// Display name the account advertises.
    #[serde(rename = "pushName")]
    pub push_name: Option<String>,
}

/// QR pairing code response
#[derive(Debug, Deserialize)]
pub struct QrResponse {
    /// Base64-encoded QR image, absent when the channel is already paired.
    pub qr: Option<String>,
}

/// Profile data returned to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInfo {
    /// Profile picture URL
    pub picture: Option<String>,
    /// Advertised display name
    pub push_name: Option<String>,
}

impl From<ProfileResponse> for ProfileInfo {
    fn from(resp: ProfileResponse) -> Self {
        Self {
            picture: resp.picture,
            push_name: resp.push_name,
        }
    }
}
