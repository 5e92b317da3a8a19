//! FILENAME: app/designer/src/remote.rs
// PURPOSE: Saving and loading report configurations through the remote panel API.
// CONTEXT: The panel API is an opaque RPC seam: three calls taking JSON
// parameters and answering `{state, data?, msg?|message?}`, successful iff
// `state == "200"`. `PanelApi` abstracts it so the flows can run against a
// mock. Every flow ends in a `Notification`; remote trouble never surfaces
// as an error to the caller.

use crate::api_types::{Notification, NodeInfo};
use crate::settings::DesignerSettings;
use crate::snapshot_commands::{apply_document, current_snapshot};
use crate::{cell_commands, log_enter_info, log_error, log_exit_info, log_info, log_warn, AppState};
use report_persistence::{FieldCatalog, FieldInfo};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Mutex;
use thiserror::Error;

pub const SUCCESS_STATE: &str = "200";

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote panel API is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

// ============================================================================
// RESPONSE
// ============================================================================

/// Envelope of every panel API answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PanelResponse {
    /// Usually the string "200"; some deployments send a number.
    #[serde(default)]
    pub state: Value,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl PanelResponse {
    pub fn is_success(&self) -> bool {
        match &self.state {
            Value::String(s) => s == SUCCESS_STATE,
            Value::Number(n) => n.to_string() == SUCCESS_STATE,
            _ => false,
        }
    }

    /// The remote's own explanation, if it gave one.
    pub fn failure_message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .filter(|m| !m.trim().is_empty())
    }

    /// First row of a query result (`data.list[0]`).
    pub fn first_record(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()?.get("list")?.as_array()?.first()?.as_object()
    }

    pub fn uuid(&self) -> Option<String> {
        match self.data.as_ref()?.get("uuid")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// ============================================================================
// API SEAM
// ============================================================================

pub trait PanelApi: Send + Sync {
    /// `{panelCode, condition}` → rows of a panel.
    fn query_form_data(
        &self,
        params: &Value,
    ) -> impl Future<Output = Result<PanelResponse, RemoteError>> + Send;

    /// `{panelCode, condition, data}` → upsert of one row.
    fn save_form_data(
        &self,
        params: &Value,
    ) -> impl Future<Output = Result<PanelResponse, RemoteError>> + Send;

    /// `{panelCode, buttonName, formData}` → runs a panel button.
    fn call_button(
        &self,
        params: &Value,
    ) -> impl Future<Output = Result<PanelResponse, RemoteError>> + Send;
}

/// reqwest-backed client. Logs in on first use and reuses the token for the
/// rest of the session.
pub struct HttpPanelClient {
    client: reqwest::Client,
    base_url: String,
    bus_domain_code: String,
    username: String,
    password: String,
    token: Mutex<Option<String>>,
}

impl HttpPanelClient {
    pub fn new(settings: &DesignerSettings) -> Result<Self, RemoteError> {
        if !settings.remote_enabled() {
            return Err(RemoteError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RemoteError::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpPanelClient {
            client,
            base_url: settings.api_base_url.trim().trim_end_matches('/').to_string(),
            bus_domain_code: settings.bus_domain_code.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
            token: Mutex::new(None),
        })
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    async fn send(&self, path: &str, body: &Value, token: Option<&str>) -> Result<PanelResponse, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .post(&url)
            .header("busDomainCode", &self.bus_domain_code)
            .json(body);
        if let Some(token) = token {
            request = request.header("token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Http(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(RemoteError::Http(format!(
                "{} answered with HTTP {}",
                url,
                response.status()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Http(format!("Failed to read response from {}: {}", url, e)))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn login(&self) -> Result<String, RemoteError> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        log_info!("REMOTE", "logging in to {} as {}", self.base_url, self.username);
        let body = json!({ "userName": self.username, "password": self.password });
        let response = self.send("/user/login", &body, None).await?;
        let token = login_token(&response)?;
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token.clone());
        }
        Ok(token)
    }

    async fn call(&self, path: &str, params: &Value) -> Result<PanelResponse, RemoteError> {
        let token = self.login().await?;
        self.send(path, params, Some(&token)).await
    }
}

impl PanelApi for HttpPanelClient {
    fn query_form_data(
        &self,
        params: &Value,
    ) -> impl Future<Output = Result<PanelResponse, RemoteError>> + Send {
        self.call("/api/queryFormData", params)
    }

    fn save_form_data(
        &self,
        params: &Value,
    ) -> impl Future<Output = Result<PanelResponse, RemoteError>> + Send {
        self.call("/api/saveFormData", params)
    }

    fn call_button(
        &self,
        params: &Value,
    ) -> impl Future<Output = Result<PanelResponse, RemoteError>> + Send {
        self.call("/api/callButton", params)
    }
}

// ============================================================================
// FLOWS
// ============================================================================

/// Form sent with the save button: node name, type, parent, the node id when
/// the node already exists, and the snapshot as a JSON string.
/// Token of a login answer: `data` itself or `data.token`. A successful
/// answer without a token is a failed login.
fn login_token(response: &PanelResponse) -> Result<String, RemoteError> {
    if !response.is_success() {
        return Err(RemoteError::Rejected(
            response.failure_message().unwrap_or("login failed").to_string(),
        ));
    }
    let token = match response.data.as_ref() {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(data) => data.get("token").and_then(Value::as_str),
        None => None,
    };
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RemoteError::Rejected("login returned no token".to_string()))
}

pub fn build_save_form(node: &NodeInfo, config_json: &str) -> Value {
    let mut form = Map::new();
    form.insert("节点名".to_string(), json!(node.node_name));
    let node_type = if node.node_type.is_empty() {
        NodeInfo::default().node_type
    } else {
        node.node_type.clone()
    };
    form.insert("节点类型".to_string(), json!(node_type));
    let parent = if node.parent_code.is_empty() {
        crate::api_types::DEFAULT_PARENT_CODE.to_string()
    } else {
        node.parent_code.clone()
    };
    form.insert("parentCode".to_string(), json!(parent));
    if let Some(id) = node.node_id.as_ref().filter(|id| !id.is_empty()) {
        form.insert("编号".to_string(), json!(id));
    }
    form.insert("json".to_string(), json!(config_json));
    Value::Object(form)
}

fn detail_panel(settings: &DesignerSettings) -> &str {
    if settings.detail_panel_code.is_empty() {
        &settings.save_panel_code
    } else {
        &settings.detail_panel_code
    }
}

/// Save the current table under the session's node.
///
/// Detail reports with a known node code are written with `saveFormData` on
/// the detail panel; everything else goes through the save button.
pub async fn save_to_remote<A: PanelApi>(api: &A, state: &AppState) -> Notification {
    log_enter_info!("REMOTE", "save_to_remote");

    if let Err(e) = cell_commands::save_current_cell(state) {
        log_warn!("REMOTE", "could not save the current cell first: {}", e);
    }

    let node = match state.node_info.lock() {
        Ok(node) => node.clone(),
        Err(e) => return Notification::error("Error", format!("Saving failed: {}", e)),
    };
    if node.node_name.trim().is_empty() {
        return Notification::error("Error", "The node name must not be empty");
    }

    let is_detail = state.data_source.lock().map(|ds| ds.is_some()).unwrap_or(false);

    let config_json = match current_snapshot(state)
        .and_then(|snapshot| snapshot.to_value().map_err(|e| e.to_string()))
    {
        Ok(value) => value.to_string(),
        Err(e) => return Notification::error("Error", format!("Saving failed: {}", e)),
    };

    let settings = &state.settings;
    let result = match node.node_code.as_deref().filter(|_| is_detail) {
        Some(code) => {
            let params = json!({
                "panelCode": detail_panel(settings),
                "condition": { "code": code },
                "data": { "code": code, "json": config_json },
            });
            api.save_form_data(&params).await
        }
        None => {
            let params = json!({
                "panelCode": settings.save_panel_code,
                "buttonName": settings.save_button_name,
                "formData": build_save_form(&node, &config_json),
            });
            api.call_button(&params).await
        }
    };

    let notification = match result {
        Ok(response) if response.is_success() => {
            let mut message = "Configuration saved.".to_string();
            if let Some(uuid) = response.uuid() {
                message.push_str(" UUID: ");
                message.push_str(&uuid);
            }
            Notification::success("Success", message)
        }
        Ok(response) => {
            let reason = response.failure_message().unwrap_or("unknown error");
            log_error!("REMOTE", "save rejected: {}", reason);
            Notification::error("Error", format!("Saving failed: {}", reason))
        }
        Err(e) => {
            log_error!("REMOTE", "save failed: {}", e);
            Notification::error("Error", format!("Saving failed, please retry later. {}", e))
        }
    };
    log_exit_info!("REMOTE", "save_to_remote", "{:?}", notification.kind);
    notification
}

/// Parse the `json` column of a query row; it may hold a JSON string or an
/// already decoded object.
fn stored_document(record: &Map<String, Value>) -> Result<Option<Value>, serde_json::Error> {
    match record.get("json") {
        Some(Value::String(s)) if !s.trim().is_empty() => serde_json::from_str(s).map(Some),
        Some(value @ Value::Object(_)) => Ok(Some(value.clone())),
        _ => Ok(None),
    }
}

/// Load the configuration stored for `node_code` and apply it to the table.
pub async fn load_from_remote<A: PanelApi>(api: &A, state: &AppState, node_code: &str) -> Notification {
    log_enter_info!("REMOTE", "load_from_remote", "code={}", node_code);
    if node_code.trim().is_empty() {
        return Notification::error("Error", "No node code given");
    }

    let params = json!({
        "panelCode": detail_panel(&state.settings),
        "condition": { "code": node_code },
    });

    let response = match api.query_form_data(&params).await {
        Ok(response) => response,
        Err(e) => {
            log_error!("REMOTE", "load failed: {}", e);
            return Notification::error("Error", format!("Loading failed: {}", e));
        }
    };
    if !response.is_success() {
        let reason = response.failure_message().unwrap_or("unknown error");
        return Notification::error("Error", format!("Loading failed: {}", reason));
    }

    let document = match response.first_record().map(stored_document) {
        Some(Ok(Some(document))) => document,
        Some(Err(e)) => {
            log_error!("REMOTE", "stored configuration for {} is not valid JSON: {}", node_code, e);
            return Notification::error("Error", "The stored configuration is not valid JSON");
        }
        Some(Ok(None)) | None => {
            return Notification::warning("Notice", format!("No saved configuration for {}", node_code));
        }
    };

    let summary = match apply_document(state, &document) {
        Ok(summary) => summary,
        Err(e) => return Notification::error("Error", format!("Loading failed: {}", e)),
    };

    if let Ok(mut node) = state.node_info.lock() {
        node.node_code = Some(node_code.to_string());
    }

    let notification = if summary.is_partial() {
        Notification::warning(
            "Notice",
            format!(
                "Configuration loaded; {} of {} cells lie outside the table and were skipped",
                summary.skipped, summary.attempted
            ),
        )
    } else {
        Notification::success("Success", format!("Configuration loaded ({} cells)", summary.applied))
    };
    log_exit_info!("REMOTE", "load_from_remote", "{:?}", notification.kind);
    notification
}

/// Field names and labels of a source table, read from the table panel's
/// `表结构` column (`字段名` / `字段中文名` per field).
pub async fn load_field_catalog<A: PanelApi>(
    api: &A,
    settings: &DesignerSettings,
    table_code: &str,
) -> Result<FieldCatalog, RemoteError> {
    let params = json!({
        "panelCode": settings.table_panel_code,
        "condition": { "code": table_code },
    });
    let response = api.query_form_data(&params).await?;
    if !response.is_success() {
        return Err(RemoteError::Rejected(
            response.failure_message().unwrap_or("table query failed").to_string(),
        ));
    }

    let fields = response
        .first_record()
        .and_then(|record| record.get("表结构"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let name = entry.get("字段名")?.as_str()?.to_string();
                    let label = entry
                        .get("字段中文名")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    Some(FieldInfo { name, label })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(FieldCatalog::new(fields))
}
