//! Dashboard API client.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracely_common_http::{parse_json, HttpClient, HttpError, Method, RequestBuilder};
use tracely_common_log::spans::{dashboard_span, instrument_future};

use crate::error::{DashboardError, Result};
use crate::session::SessionStore;
use crate::types::*;

/// Query parameter carrying the selected application.
const APP_ID_PARAM: &str = "appID";

pub struct DashboardClient {
    http: HttpClient,
    base_url: String,
    session: SessionStore,
}

impl DashboardClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Result<Self> {
        Ok(Self::with_http(HttpClient::new()?, base_url, session))
    }

    pub fn with_http(http: HttpClient, base_url: impl Into<String>, session: SessionStore) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            session,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// `POST /auth/login`, storing the returned token and username.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let response: LoginResponse = self
            .call(
                Method::POST,
                "/auth/login",
                Vec::new(),
                Some(&LoginRequest { username, password }),
            )
            .await?;

        self.session.set_auth(&response.token, &response.username)?;
        tracing::info!(username = %response.username, "logged in");
        Ok(response)
    }

    /// Forget the stored credentials.
    pub fn logout(&self) -> Result<()> {
        self.session.clear_auth()?;
        tracing::info!("logged out");
        Ok(())
    }

    pub async fn overview(&self) -> Result<OverviewResponse> {
        self.get("/api/overview", Vec::new()).await
    }

    pub async fn errors(&self, query: &ErrorQuery) -> Result<ErrorListResponse> {
        self.get("/api/errors", query.to_params()).await
    }

    pub async fn stats(&self, query: &StatsQuery) -> Result<StatsResponse> {
        self.get("/api/stats", query.to_params()).await
    }

    pub async fn apps(&self) -> Result<Vec<AppInfo>> {
        let response: AppsResponse = self.get("/api/apps", Vec::new()).await?;
        Ok(response.apps)
    }

    /// Persist the application used for subsequent requests.
    pub fn select_app(&self, app_id: &str) -> Result<()> {
        self.session.set_current_app(app_id)?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: Vec<(&'static str, String)>) -> Result<T> {
        self.call::<T, ()>(Method::GET, path, params, None).await
    }

    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        params: Vec<(&'static str, String)>,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.prepare(params)?;
        let span = dashboard_span(method.as_str(), path);
        instrument_future(self.execute(method, path, &request, body), span).await
    }

    async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        request: &RequestBuilder,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let sent = match body {
            Some(body) => self.http.send_json(method, path, request, body).await,
            None => self.http.send(method, path, request).await,
        };
        let response = sent.map_err(|e| self.on_http_error(e))?;
        let response = HttpClient::check_response(response)
            .await
            .map_err(|e| self.on_http_error(e))?;

        Ok(parse_json(response).await?)
    }

    /// Attach the bearer token and the selected application, if any. The
    /// selected application overrides an explicit `appID` parameter.
    fn prepare(&self, params: Vec<(&'static str, String)>) -> Result<RequestBuilder> {
        let mut request = RequestBuilder::new().base_url(&self.base_url);

        if let Some(token) = self.session.token()? {
            request = request.bearer_auth(token);
        }

        let current_app = self.session.current_app()?;
        for (key, value) in params {
            if key == APP_ID_PARAM && current_app.is_some() {
                continue;
            }
            request = request.query(key, value);
        }
        if let Some(app_id) = current_app {
            request = request.query(APP_ID_PARAM, app_id);
        }

        Ok(request)
    }

    fn on_http_error(&self, error: HttpError) -> DashboardError {
        if matches!(error, HttpError::Unauthorized) {
            tracing::warn!("dashboard rejected the session, clearing stored credentials");
            if let Err(e) = self.session.clear_auth() {
                tracing::warn!(error = %e, "failed to clear stored credentials");
            }
        }
        DashboardError::from(error)
    }
}

/// Pick the application to work with: the saved one if it is still listed,
/// otherwise the first.
pub fn resolve_current_app(apps: &[AppInfo], saved: Option<&str>) -> Option<String> {
    saved
        .filter(|saved| apps.iter().any(|app| app.app_id == *saved))
        .map(str::to_string)
        .or_else(|| apps.first().map(|app| app.app_id.clone()))
}
