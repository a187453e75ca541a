use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single upstream request. Built by the sources, executed by an `HttpProvider`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Printed in logs and errors in place of the url, for urls that carry credentials.
    pub label: Option<String>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { method: HttpMethod::Get, url: url.into(), headers: Vec::new(), body: None, label: None }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self { method: HttpMethod::Post, url: url.into(), headers: Vec::new(), body: Some(body), label: None }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {}", token))
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// What to print for this request.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.url)
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor of the following page, absent on the last page.
    pub next: Option<String>,
}

/// Returns true for JSON bodies carrying no data (`null`, `[]`, `{}`).
pub fn is_empty_body(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("https://api.example.com/v2/items").bearer("secret");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.headers, vec![("Authorization".to_string(), "Bearer secret".to_string())]);
        assert!(req.body.is_none());

        let req = ApiRequest::post("https://rpc.example.com", json!({"id": 1}));
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.body, Some(json!({"id": 1})));
        assert_eq!(req.label(), "https://rpc.example.com");

        let req = ApiRequest::post("https://rpc.example.com/v2/key", json!({})).labelled("alchemy 0xabc");
        assert_eq!(req.label(), "alchemy 0xabc");
        assert_eq!(req.url, "https://rpc.example.com/v2/key");
    }

    #[test]
    fn test_is_empty_body() {
        assert!(is_empty_body(&json!(null)));
        assert!(is_empty_body(&json!([])));
        assert!(is_empty_body(&json!({})));
        assert!(!is_empty_body(&json!([{"fid": 1}])));
        assert!(!is_empty_body(&json!({"result": {}})));
        assert!(!is_empty_body(&json!(0)));
    }
}
