use serde::{Deserialize, Serialize};

/// Form-encoded request body for the Twilio Messages API. Twilio expects
/// `application/x-www-form-urlencoded` rather than JSON.
#[derive(Debug, Clone, Serialize)]
pub struct TwilioSendMessageRequest {
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "Body")]
    pub body: String,
}

/// Response from the Twilio Messages API.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioApiResponse {
    pub sid: Option<String>,
    pub status: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_message_request_serializes_form_encoded() {
        let req = TwilioSendMessageRequest {
            to: "+15559876543".into(),
            from: "+15551234567".into(),
            body: "Hello!".into(),
        };
        let encoded = serde_urlencoded::to_string(&req).unwrap();
        assert!(encoded.contains("To=%2B15559876543"));
        assert!(encoded.contains("From=%2B15551234567"));
    }

    #[test]
    fn api_response_deserializes_success() {
        let json = r#"{"sid":"SM123","status":"queued","error_code":null,"error_message":null}"#;
        let resp: TwilioApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.sid.as_deref(), Some("SM123"));
        assert!(resp.error_code.is_none());
    }

    #[test]
    fn api_response_deserializes_error() {
        let json = r#"{"sid":null,"status":null,"error_code":21211,"error_message":"Invalid 'To' Phone Number"}"#;
        let resp: TwilioApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.error_code, Some(21211));
    }
}
