use std::collections::BTreeMap;

use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde_json::{Map, Value as JsonValue};
use url::Url;

use super::traits::{ClientResult, RestMethod};
use super::ClientError;
use crate::reconcile::ApiResponse;
use crate::utils::config::ServerConfig;

const AUTH_HEADER: &str = "x-auth-token";

/// Authenticated connection to one CSM server, shared by the session,
/// hardware and system clients.
pub struct RestClient {
    http: HttpClient,
    base_url: Url,
    token: String,
    language: String,
}

impl RestClient {
    pub async fn connect(config: &ServerConfig) -> ClientResult<Self> {
        let mut builder = HttpClient::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.call_properties.verify);

        if let Some(path) = &config.call_properties.cert {
            let pem = std::fs::read(path).map_err(|source| ClientError::Certificate {
                path: path.display().to_string(),
                source,
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        let http = builder.build()?;
        let base_url = config.base_url()?;
        let language = config.call_properties.language.clone();

        info!("Requesting API token from {}", config);
        let token = Self::login(&http, &base_url, &language, config).await?;

        Ok(Self {
            http,
            base_url,
            token,
            language,
        })
    }

    async fn login(
        http: &HttpClient,
        base_url: &Url,
        language: &str,
        config: &ServerConfig,
    ) -> ClientResult<String> {
        let url = endpoint(base_url, &["system", "tokens"])?;
        let response = http
            .post(url)
            .header(ACCEPT_LANGUAGE, language)
            .form(&[
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await?;

        let body = decode_body(response).await?;
        body.get("token")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::Authentication {
                host: config.hostname.clone(),
                reason: body
                    .get("msgTranslated")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("no token in response")
                    .to_string(),
            })
    }

    /// Headers replace anything already set on `request`, including the
    /// Content-Type chosen by `.form()`.
    async fn send(
        &self,
        request: RequestBuilder,
        overrides: Option<&BTreeMap<String, String>>,
    ) -> ClientResult<JsonValue> {
        let headers = request_headers(&self.token, &self.language, overrides)?;
        let response = request.headers(headers).send().await?;
        decode_body(response).await
    }

    /// Read-only lookup; the body is handed back untouched.
    pub async fn query(&self, segments: &[&str], params: &[(&str, String)]) -> ClientResult<JsonValue> {
        let url = endpoint(&self.base_url, segments)?;
        debug!("GET {}", url);
        self.send(self.http.get(url).query(params), None).await
    }

    /// Mutating call; the body must carry a message code.
    pub async fn command(
        &self,
        method: Method,
        segments: &[&str],
        form: &[(&str, String)],
    ) -> ClientResult<ApiResponse> {
        let url = endpoint(&self.base_url, segments)?;
        debug!("{} {}", method, url);
        let body = self.send(self.http.request(method, url).form(form), None).await?;
        ApiResponse::from_json(body)
    }

    pub async fn raw(
        &self,
        method: RestMethod,
        path_resource: &str,
        data: Option<&Map<String, JsonValue>>,
        headers: Option<&BTreeMap<String, String>>,
    ) -> ClientResult<JsonValue> {
        let url = raw_endpoint(&self.base_url, path_resource)?;
        debug!("{} {} (raw)", method, url);

        let mut request = self.http.request(method.into(), url);
        if let Some(data) = data {
            let fields = form_fields(data);
            request = match method {
                RestMethod::Get => request.query(&fields),
                _ => request.form(&fields),
            };
        }

        self.send(request, headers).await
    }
}

impl From<RestMethod> for Method {
    fn from(method: RestMethod) -> Self {
        match method {
            RestMethod::Get => Method::GET,
            RestMethod::Put => Method::PUT,
            RestMethod::Post => Method::POST,
            RestMethod::Delete => Method::DELETE,
        }
    }
}

/// Appends percent-encoded path segments to the `/CSM/web/` base.
pub(crate) fn endpoint(base_url: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidEndpoint(base_url.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Appends a caller-supplied resource to the base as written, so query
/// strings and already-encoded segments pass through.
pub(crate) fn raw_endpoint(base_url: &Url, path_resource: &str) -> ClientResult<Url> {
    let relative = path_resource.trim_start_matches('/');
    if relative.is_empty() {
        return Err(ClientError::InvalidEndpoint(path_resource.to_string()));
    }
    Ok(base_url.join(relative)?)
}

/// Token and language first; caller headers replace them by name.
pub(crate) fn request_headers(
    token: &str,
    language: &str,
    overrides: Option<&BTreeMap<String, String>>,
) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_static(AUTH_HEADER), header_value(token)?);
    headers.insert(ACCEPT_LANGUAGE, header_value(language)?);

    for (name, value) in overrides.into_iter().flatten() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::InvalidHeader(name.clone()))?;
        headers.insert(name, header_value(value)?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| ClientError::InvalidHeader(value.to_string()))
}

/// The server expects form encoding; strings go over the wire unquoted.
pub(crate) fn form_fields(data: &Map<String, JsonValue>) -> Vec<(String, String)> {
    data.iter()
        .map(|(key, value)| {
            let value = match value {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

async fn decode_body(response: Response) -> ClientResult<JsonValue> {
    let status = response.status();
    let text = response.text().await?;

    if text.trim().is_empty() {
        return if status.is_success() {
            Ok(JsonValue::Null)
        } else {
            Err(ClientError::UnexpectedBody {
                status: status.as_u16(),
                body: text,
            })
        };
    }

    serde_json::from_str(&text).map_err(|_| ClientError::UnexpectedBody {
        status: status.as_u16(),
        body: text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://csm.example.com:9559/CSM/web/").unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let url = endpoint(&base(), &["sessions", "short"]).unwrap();
        assert_eq!(url.as_str(), "https://csm.example.com:9559/CSM/web/sessions/short");
    }

    #[test]
    fn test_endpoint_encodes_names() {
        let url = endpoint(&base(), &["sessions", "my session"]).unwrap();
        assert_eq!(url.path(), "/CSM/web/sessions/my%20session");
    }

    #[test]
    fn test_endpoint_keeps_volume_group_in_one_segment() {
        let url = endpoint(&base(), &["sessions", "a/b"]).unwrap();
        assert_eq!(url.path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_raw_endpoint_keeps_query_string() {
        let url = raw_endpoint(&base(), "system/logevents?count=5").unwrap();
        assert_eq!(url.as_str(), "https://csm.example.com:9559/CSM/web/system/logevents?count=5");
    }

    #[test]
    fn test_raw_endpoint_keeps_encoded_segments() {
        let url = raw_endpoint(&base(), "/sessions/my%20session").unwrap();
        assert_eq!(url.path(), "/CSM/web/sessions/my%20session");
    }

    #[test]
    fn test_raw_endpoint_rejects_empty_resource() {
        assert!(matches!(
            raw_endpoint(&base(), "/"),
            Err(ClientError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_request_headers_defaults() {
        let headers = request_headers("tok", "en-US", None).unwrap();
        assert_eq!(headers["x-auth-token"], "tok");
        assert_eq!(headers[ACCEPT_LANGUAGE], "en-US");
    }

    #[test]
    fn test_caller_headers_replace_defaults() {
        let overrides = BTreeMap::from([
            ("Accept-Language".to_string(), "de-DE".to_string()),
            ("Content-Type".to_string(), "application/x-www-form-urlencoded".to_string()),
        ]);
        let headers = request_headers("tok", "en-US", Some(&overrides)).unwrap();

        let request = HttpClient::new()
            .post(raw_endpoint(&base(), "storagedevices/4").unwrap())
            .form(&[("location", "New York")])
            .headers(headers)
            .build()
            .unwrap();

        let sent = request.headers();
        assert_eq!(sent.get_all(ACCEPT_LANGUAGE).iter().count(), 1);
        assert_eq!(sent[ACCEPT_LANGUAGE], "de-DE");
        assert_eq!(sent.get_all(reqwest::header::CONTENT_TYPE).iter().count(), 1);
        assert_eq!(sent.get_all("x-auth-token").iter().count(), 1);
    }

    #[test]
    fn test_invalid_header_name() {
        let overrides = BTreeMap::from([("bad header".to_string(), "x".to_string())]);
        assert!(matches!(
            request_headers("tok", "en-US", Some(&overrides)),
            Err(ClientError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_form_fields_unquote_strings() {
        let data = json!({"location": "New York", "port": 1750, "secure": true});
        let mut fields = form_fields(data.as_object().unwrap());
        fields.sort();

        assert_eq!(
            fields,
            vec![
                ("location".to_string(), "New York".to_string()),
                ("port".to_string(), "1750".to_string()),
                ("secure".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_rest_method_mapping() {
        assert_eq!(Method::from(RestMethod::Delete), Method::DELETE);
        assert!(RestMethod::Put.is_mutating());
        assert!(!RestMethod::Get.is_mutating());
    }
}
