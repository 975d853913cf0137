//! Vercel serverless function adapter module
//!
//! Converts between `vercel_runtime` requests/responses and the router's
//! framework-neutral types.

use crate::router::{RelayRequest, RelayResponse, client_identity};
use vercel_runtime::{Body, Error, Request, Response, StatusCode};

/// Converts a function request.
///
/// Vercel overwrites `X-Forwarded-For` with the connecting address, so its
/// first entry stands in for the peer. The remaining forwarding headers are
/// only read when `trust_proxy_headers` is set.
#[must_use]
pub fn to_relay_request(
    req: &Request,
    trust_proxy_headers: bool,
) -> RelayRequest {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    RelayRequest {
        method: req.method().as_str().to_string(),
        path: req.uri().path().to_string(),
        client_id: function_client_id(header, trust_proxy_headers),
        body: req.body().to_vec(),
    }
}

fn function_client_id(
    header: impl Fn(&str) -> Option<String>,
    trust_proxy_headers: bool,
) -> String {
    let peer = header("X-Forwarded-For")
        .and_then(|value| value.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty());

    client_identity(header, peer, trust_proxy_headers)
}

/// Builds the function response, leaving the body empty when there is nothing to send.
///
/// # Errors
///
/// Returns an error if the status code or a header is invalid.
pub fn to_vercel_response(response: RelayResponse) -> Result<Response<Body>, Error> {
    let mut builder = Response::builder().status(StatusCode::from_u16(response.status_code)?);
    for (name, value) in &response.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }

    let body = if response.body.is_empty() {
        Body::Empty
    } else {
        response.body.into()
    };

    Ok(builder.body(body)?)
}
