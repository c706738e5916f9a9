//! Request routing for the scoring endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::http::{Request, Response};
use super::service::InferenceService;

/// Path of the single scoring endpoint.
pub const PREDICT_PATH: &str = "/predict";

/// Why a scoring request body was rejected.
#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("features must be an array of numbers: {0}")]
    Features(serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub prediction: u8,
    pub probability: f64,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Dispatch a parsed request.
pub fn handle(service: &InferenceService, request: &Request) -> Response {
    if request.path != PREDICT_PATH {
        tracing::debug!("No route for {} {}", request.method, request.path);
        return Response::empty(404);
    }
    if request.method != "POST" {
        return Response::empty(405);
    }
    match parse_features(&request.body) {
        Ok(features) => {
            let score = service.predict(&features);
            tracing::debug!(
                "Scored {} features: probability {:.4}",
                features.len(),
                score.probability()
            );
            Response::json(
                200,
                &PredictResponse {
                    prediction: score.prediction(),
                    probability: score.probability(),
                    status: "success".to_string(),
                },
            )
        }
        Err(err) => bad_request(&err),
    }
}

/// Response for a request that failed validation.
pub fn bad_request(err: &dyn std::fmt::Display) -> Response {
    tracing::warn!("Rejected scoring request: {err}");
    Response::json(
        400,
        &ErrorResponse {
            error: err.to_string(),
        },
    )
}

/// Extract the `features` array; an absent field counts as an empty vector.
pub fn parse_features(body: &[u8]) -> Result<Vec<f64>, RequestValidationError> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Object(mut fields) = value else {
        return Err(RequestValidationError::NotAnObject);
    };
    match fields.remove("features") {
        None => Ok(Vec::new()),
        Some(features) => {
            Vec::<f64>::deserialize(features).map_err(RequestValidationError::Features)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::logreg::{LogRegModel, sigmoid};

    fn service() -> InferenceService {
        InferenceService::new(LogRegModel {
            coefficients: vec![1.0, -2.0],
            intercept: 0.5,
            feature_names: vec!["a".into(), "b".into()],
        })
    }

    fn post(path: &str, body: &str) -> Request {
        Request {
            method: "POST".into(),
            path: path.into(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(response: &Response) -> T {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[test]
    fn scores_well_formed_request() {
        let response = handle(&service(), &post("/predict", r#"{"features":[1, 0.25]}"#));
        assert_eq!(response.status, 200);
        let body: PredictResponse = decode(&response);
        assert_eq!(body.status, "success");
        assert_eq!(body.probability, sigmoid(0.5 + 1.0 + -2.0 * 0.25));
        assert_eq!(body.prediction, 1);
    }

    #[test]
    fn wrong_length_returns_neutral_success() {
        let response = handle(&service(), &post("/predict", r#"{"features":[1, 2, 3]}"#));
        assert_eq!(response.status, 200);
        let body: PredictResponse = decode(&response);
        assert_eq!(body.probability, 0.5);
        assert_eq!(body.prediction, 1);
    }

    #[test]
    fn overflowing_features_still_return_a_probability() {
        let response = handle(
            &service(),
            &post("/predict", r#"{"features":[1e308, -1e308]}"#),
        );
        assert_eq!(response.status, 200);
        let body: serde_json::Value = decode(&response);
        assert_eq!(body["probability"].as_f64(), Some(0.5));
        assert_eq!(body["prediction"], 1);
    }

    #[test]
    fn absent_features_degrade_like_empty_vector() {
        let response = handle(&service(), &post("/predict", "{}"));
        assert_eq!(response.status, 200);
        assert_eq!(decode::<PredictResponse>(&response).probability, 0.5);
    }

    #[test]
    fn malformed_bodies_are_client_errors() {
        for body in [
            "not json",
            "[1, 2]",
            r#"{"features": "1,2"}"#,
            r#"{"features": [1, "x"]}"#,
            r#"{"features": null}"#,
        ] {
            let response = handle(&service(), &post("/predict", body));
            assert_eq!(response.status, 400, "body {body}");
            let error: ErrorResponse = decode(&response);
            assert!(!error.error.is_empty());
        }
    }

    #[test]
    fn unknown_path_is_empty_not_found() {
        let response = handle(&service(), &post("/score", r#"{"features":[1, 2]}"#));
        assert_eq!(response, Response::empty(404));
    }

    #[test]
    fn non_post_predict_is_method_not_allowed() {
        let mut request = post("/predict", "");
        request.method = "GET".into();
        assert_eq!(handle(&service(), &request).status, 405);
    }
}
