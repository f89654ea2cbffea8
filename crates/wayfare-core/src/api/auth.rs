//! Login, logout and permission endpoints.

use serde::Deserialize;

use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiResult;
use crate::permissions::MenuPermission;

pub const GOOGLE_LOGIN_PATH: &str = "/auth/google";
pub const LOGOUT_PATH: &str = "/auth/logout-google";
pub const PERMISSIONS_PATH: &str = "/user/permissions";

/// Permissions arrive either as a bare list or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum PermissionsBody {
    List(Vec<MenuPermission>),
    Wrapped { permissions: Vec<MenuPermission> },
}

#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Page that starts the Google sign-in flow.
    pub fn google_login_url(&self) -> String {
        self.client.url_for(GOOGLE_LOGIN_PATH)
    }

    /// Ends the session on the server.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn logout(&self) -> ApiResult<()> {
        self.client.send(ApiRequest::post(LOGOUT_PATH)).await?;
        Ok(())
    }

    /// Raw permission tree of the signed-in user.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn permissions(&self) -> ApiResult<Vec<MenuPermission>> {
        let body: PermissionsBody = self.client.data(ApiRequest::get(PERMISSIONS_PATH)).await?;
        Ok(match body {
            PermissionsBody::List(menus) | PermissionsBody::Wrapped { permissions: menus } => menus,
        })
    }
}
