//! Request body encoding and response body decoding.

use serde::de::DeserializeOwned;

use super::request::{ContentType, HttpRequest};
use crate::error::{ClassifiedError, ErrorCatalog, ErrorCode};

/// Encodes the request body according to its content type.
///
/// A request without a body yields an empty payload and never reaches an
/// encoder.
pub fn encode_body(request: &HttpRequest, catalog: &ErrorCatalog) -> Result<Vec<u8>, ClassifiedError> {
    let Some(body) = request.body() else {
        return Ok(Vec::new());
    };

    match request.content_type() {
        ContentType::Json => body.to_json().map_err(|e| {
            catalog
                .wrap(ErrorCode::JsonSerializationError, e)
                .with_param("request", request.render())
        }),
        ContentType::FormUrlEncoded => body.to_form().map(String::into_bytes).map_err(|e| {
            catalog
                .wrap(ErrorCode::FormSerializationError, e)
                .with_param("request", request.render())
        }),
    }
}

/// Decodes a successful response body into `T`.
pub fn decode_json<T: DeserializeOwned>(
    body: &[u8],
    request: &HttpRequest,
    catalog: &ErrorCatalog,
) -> Result<T, ClassifiedError> {
    serde_json::from_slice(body).map_err(|e| {
        catalog
            .wrap(ErrorCode::JsonDeserializationError, e)
            .with_param("response", String::from_utf8_lossy(body))
            .with_param("request", request.render())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize, Serializer};

    /// A body whose serialization always fails.
    #[derive(Debug)]
    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("value cannot be serialized"))
        }
    }

    #[derive(Debug, Serialize)]
    struct Charge {
        amount: i64,
        currency: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct ChargeResult {
        id: String,
        status: String,
    }

    fn charge() -> Charge {
        Charge {
            amount: 100,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_no_body_encodes_to_empty_payload() {
        let catalog = ErrorCatalog::default();
        for content_type in [ContentType::Json, ContentType::FormUrlEncoded] {
            let request = HttpRequest::new("http://x", "GET").with_content_type(content_type);
            assert!(encode_body(&request, &catalog).unwrap().is_empty());
        }
    }

    #[test]
    fn test_json_body() {
        let request = HttpRequest::new("http://x", "POST").with_body(charge());
        let payload = encode_body(&request, &ErrorCatalog::default()).unwrap();
        assert_eq!(payload, br#"{"amount":100,"currency":"USD"}"#);
    }

    #[test]
    fn test_form_body() {
        let request = HttpRequest::new("http://x", "POST")
            .with_body(charge())
            .with_content_type(ContentType::FormUrlEncoded);
        let payload = encode_body(&request, &ErrorCatalog::default()).unwrap();
        assert_eq!(payload, b"amount=100&currency=USD");
    }

    #[test]
    fn test_form_body_escapes_values() {
        let request = HttpRequest::new("http://x", "POST")
            .with_body(Charge {
                amount: 5,
                currency: "a b&c".to_string(),
            })
            .with_content_type(ContentType::FormUrlEncoded);
        let payload = encode_body(&request, &ErrorCatalog::default()).unwrap();
        let payload = String::from_utf8(payload).unwrap();
        assert!(payload.starts_with("amount=5&currency=a"));
        assert!(!payload.contains("a b&c"));
    }

    #[test]
    fn test_json_serialization_failure_is_classified() {
        let request = HttpRequest::new("http://api.example.com/charge", "POST")
            .with_body(Unserializable);
        let err = encode_body(&request, &ErrorCatalog::default()).unwrap_err();

        assert_eq!(err.code(), ErrorCode::JsonSerializationError);
        assert!(err.message().contains("value cannot be serialized"));
        let rendered = err.param("request").unwrap();
        assert!(rendered.contains("http://api.example.com/charge"));
        assert!(rendered.contains("Unserializable"));
    }

    #[test]
    fn test_form_serialization_failure_is_classified() {
        let request = HttpRequest::new("http://x", "POST")
            .with_body(Unserializable)
            .with_content_type(ContentType::FormUrlEncoded);
        let err = encode_body(&request, &ErrorCatalog::default()).unwrap_err();

        assert_eq!(err.code(), ErrorCode::FormSerializationError);
        assert!(err.param("request").is_some());
    }

    #[test]
    fn test_decode_json_is_idempotent() {
        let request = HttpRequest::new("http://x", "GET");
        let body = br#"{"id":"tx_1","status":"ok"}"#;
        let catalog = ErrorCatalog::default();

        let first: ChargeResult = decode_json(body, &request, &catalog).unwrap();
        let second: ChargeResult = decode_json(body, &request, &catalog).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            ChargeResult {
                id: "tx_1".to_string(),
                status: "ok".to_string()
            }
        );
    }

    #[test]
    fn test_decode_failure_carries_response_and_request() {
        let request = HttpRequest::new("http://api.example.com/charge", "POST");
        let err = decode_json::<ChargeResult>(b"not json", &request, &ErrorCatalog::default())
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::JsonDeserializationError);
        assert_eq!(err.param("response"), Some("not json"));
        assert!(err.param("request").unwrap().contains("api.example.com"));
        assert!(err.find_source::<serde_json::Error>().is_some());
    }
}
