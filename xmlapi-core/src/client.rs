use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::multi_config::{self, MoveWhere, MultiConfigResponse, Operation};
use crate::version::Version;
use crate::xml::Element;

const API_PATH: &str = "/api/";
const OBJECT_NOT_FOUND_CODE: u32 = 7;

#[derive(Debug, Error)]
pub enum XmlApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("http status {status}: {body}")]
    Http { status: StatusCode, body: String },
    #[error("api error (code {code:?}): {message}")]
    Api { code: Option<u32>, message: String },
    #[error("object not found")]
    ObjectNotFound,
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl XmlApiError {
    pub fn is_object_not_found(&self) -> bool {
        matches!(self, XmlApiError::ObjectNotFound)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub hostname: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub version: Version,
}

#[derive(Clone)]
pub struct XmlApiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    target: Option<String>,
    version: Version,
}

impl XmlApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, XmlApiError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        let mut client = Self::with_http(http, &config.url, config.api_key.clone())?;
        client.target = config.target.clone();
        if let Some(version) = config.version {
            client.version = version;
        }
        Ok(client)
    }

    pub fn with_base_url(base_url: &str, api_key: impl Into<String>) -> Result<Self, XmlApiError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Self::with_http(http, base_url, api_key)
    }

    fn with_http(
        http: Client,
        base_url: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, XmlApiError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key: api_key.into(),
            target: None,
            version: Version::default(),
        })
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub async fn system_info(&self) -> Result<SystemInfo, XmlApiError> {
        let cmd = Element::new("show")
            .with_child(Element::new("system").with_child(Element::new("info")));
        let response = self
            .send(vec![("type", "op".to_string()), ("cmd", cmd.to_xml())])
            .await?;
        let system = response
            .child("result")
            .and_then(|r| r.child("system"))
            .ok_or_else(|| XmlApiError::MalformedResponse("missing system info".into()))?;
        let version = system
            .child_text("sw-version")
            .ok_or_else(|| XmlApiError::MalformedResponse("missing sw-version".into()))?
            .parse()?;
        Ok(SystemInfo {
            hostname: system.child_text("hostname").map(str::to_string),
            model: system.child_text("model").map(str::to_string),
            serial: system.child_text("serial").map(str::to_string),
            version,
        })
    }

    /// Fetches the device version and uses it for subsequent xpath building.
    pub async fn refresh_version(&mut self) -> Result<Version, XmlApiError> {
        let info = self.system_info().await?;
        self.version = info.version;
        Ok(info.version)
    }

    /// Reads the candidate configuration node at `xpath`.
    pub async fn get_config(&self, xpath: &str) -> Result<Element, XmlApiError> {
        self.read_config("get", xpath).await
    }

    /// Reads the running configuration node at `xpath`.
    pub async fn show_config(&self, xpath: &str) -> Result<Element, XmlApiError> {
        self.read_config("show", xpath).await
    }

    pub async fn read_config(&self, action: &str, xpath: &str) -> Result<Element, XmlApiError> {
        self.read_nodes(action, xpath)
            .await?
            .into_iter()
            .next()
            .ok_or(XmlApiError::ObjectNotFound)
    }

    /// Reads every node `xpath` selects. An empty selection is
    /// [`XmlApiError::ObjectNotFound`].
    pub async fn read_nodes(&self, action: &str, xpath: &str) -> Result<Vec<Element>, XmlApiError> {
        let mut response = self.send(config_params(action, xpath)).await?;
        let result = take_child(&mut response, "result").ok_or(XmlApiError::ObjectNotFound)?;
        if result.attribute("total-count") == Some("0") || result.children.is_empty() {
            return Err(XmlApiError::ObjectNotFound);
        }
        Ok(result.children)
    }

    pub async fn set_config(&self, xpath: &str, element: &Element) -> Result<(), XmlApiError> {
        let mut params = config_params("set", xpath);
        params.push(("element", inner_xml(element)));
        self.send(params).await.map(|_| ())
    }

    pub async fn edit_config(&self, xpath: &str, element: &Element) -> Result<(), XmlApiError> {
        let mut params = config_params("edit", xpath);
        params.push(("element", element.to_xml()));
        self.send(params).await.map(|_| ())
    }

    pub async fn delete_config(&self, xpath: &str) -> Result<(), XmlApiError> {
        self.send(config_params("delete", xpath)).await.map(|_| ())
    }

    pub async fn rename_config(&self, xpath: &str, new_name: &str) -> Result<(), XmlApiError> {
        let mut params = config_params("rename", xpath);
        params.push(("newname", new_name.to_string()));
        self.send(params).await.map(|_| ())
    }

    pub async fn move_config(
        &self,
        xpath: &str,
        position: MoveWhere,
        destination: Option<&str>,
    ) -> Result<(), XmlApiError> {
        let mut params = config_params("move", xpath);
        params.push(("where", position.as_str().to_string()));
        if let Some(dst) = destination {
            params.push(("dst", dst.to_string()));
        }
        self.send(params).await.map(|_| ())
    }

    pub async fn multi_config(
        &self,
        operations: &[Operation],
        strict: bool,
        extras: &[(String, String)],
    ) -> Result<MultiConfigResponse, XmlApiError> {
        let mut params = vec![
            ("type", "config".to_string()),
            ("action", "multi-config".to_string()),
            ("element", multi_config::render(operations, strict).to_xml()),
        ];
        params.extend(extras.iter().map(|(k, v)| (k.as_str(), v.clone())));
        debug!(operations = operations.len(), strict, "submitting multi-config");
        let response = self.send(params).await?;
        Ok(MultiConfigResponse::from_element(&response))
    }

    /// Submits each chunk as its own multi-config request, stopping at the
    /// first failure.
    pub async fn chunked_multi_config(
        &self,
        chunks: &[Vec<Operation>],
        strict: bool,
        extras: &[(String, String)],
    ) -> Result<Vec<MultiConfigResponse>, XmlApiError> {
        let mut responses = Vec::with_capacity(chunks.len());
        for chunk in chunks.iter().filter(|c| !c.is_empty()) {
            responses.push(self.multi_config(chunk, strict, extras).await?);
        }
        Ok(responses)
    }

    async fn send(&self, mut params: Vec<(&str, String)>) -> Result<Element, XmlApiError> {
        if let Some(target) = &self.target {
            params.push(("target", target.clone()));
        }
        let url = self.endpoint(API_PATH)?;
        let response = self
            .http
            .post(url)
            .header("X-PAN-KEY", &self.api_key)
            .form(&params)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, XmlApiError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response(response: reqwest::Response) -> Result<Element, XmlApiError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(XmlApiError::Http { status, body });
        }
        let root = Element::parse(&body)?;
        if root.name != "response" {
            return Err(XmlApiError::MalformedResponse(format!(
                "unexpected root element <{}>",
                root.name
            )));
        }
        match root.attribute("status") {
            Some("success") => Ok(root),
            _ => Err(api_error(&root)),
        }
    }
}

fn config_params(action: &str, xpath: &str) -> Vec<(&'static str, String)> {
    vec![
        ("type", "config".to_string()),
        ("action", action.to_string()),
        ("xpath", xpath.to_string()),
    ]
}

/// `set` takes the children of the node rather than the node itself.
fn inner_xml(element: &Element) -> String {
    element.children.iter().map(Element::to_xml).collect()
}

fn take_child(element: &mut Element, name: &str) -> Option<Element> {
    let idx = element.children.iter().position(|c| c.name == name)?;
    Some(element.children.remove(idx))
}

fn api_error(root: &Element) -> XmlApiError {
    let code = root.attribute("code").and_then(|c| c.parse::<u32>().ok());
    if code == Some(OBJECT_NOT_FOUND_CODE) {
        return XmlApiError::ObjectNotFound;
    }
    let response = MultiConfigResponse::from_element(root);
    let message = response
        .first_failure()
        .and_then(|failure| failure.message.clone())
        .or_else(|| root.child("msg").map(Element::collect_text))
        .or_else(|| root.child("result").map(Element::collect_text))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "request failed".to_string());
    XmlApiError::Api { code, message }
}
