//! Authentication API client methods

use super::session::AuthBackend;
use super::token::TokenPair;
use super::{BloomKartClient, ClientError, error_for_status};
use crate::types::{
    AuthResponse, LoginRequest, ProfileUpdateRequest, RefreshRequest, RegisterRequest,
    SessionCountResponse, UserProfile,
};
use async_trait::async_trait;
use bloomkart_core::UserIdentity;
use bloomkart_core::validation::validators;
use reqwest::{Client, Method, header};
use url::Url;

/// Raw calls to the token endpoints
///
/// These bypass the interceptors: a refresh must never trigger another refresh.
pub struct AuthApi {
    client: Client,
    base_url: String,
}

impl AuthApi {
    pub const fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AuthBackend for AuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;
        let body: AuthResponse = error_for_status(response).await?.json().await?;
        Ok(TokenPair::new(body.access_token, body.refresh_token))
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }

    async fn logout_all(&self, access_token: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("/auth/logout-all"))
            .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        error_for_status(response).await?;
        Ok(())
    }
}

impl BloomKartClient {
    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> Result<UserIdentity, ClientError> {
        validators::validate_not_empty(email, "email")?;
        validators::validate_not_empty(password, "password")?;

        let req = self.request(Method::POST, "/auth/login").json(&LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        });
        let response: AuthResponse = self.execute(req).await?;
        self.session()
            .establish(&TokenPair::new(response.access_token, response.refresh_token))
    }

    /// Create an account and sign in
    pub async fn register(&self, request: RegisterRequest) -> Result<UserIdentity, ClientError> {
        validators::validate_not_empty(request.name.trim(), "name")?;
        validators::validate_email(request.email.trim(), "email")?;
        validators::validate_min_length(&request.password, 6, "password")?;
        validators::validate_phone(&request.phone_number, "phoneNumber")?;

        let req = self.request(Method::POST, "/auth/register").json(&request);
        let response: AuthResponse = self.execute(req).await?;
        self.session()
            .establish(&TokenPair::new(response.access_token, response.refresh_token))
    }

    /// Sign in from an OAuth redirect URL carrying a `token` query parameter
    pub fn adopt_oauth_redirect(&self, redirect_url: &str) -> Result<UserIdentity, ClientError> {
        let token = Url::parse(redirect_url)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "token")
                    .map(|(_, value)| value.into_owned())
            })
            .filter(|token| !token.is_empty());

        let Some(token) = token else {
            self.session().request_login();
            return Err(ClientError::Validation(
                "redirect URL carries no token".into(),
            ));
        };
        self.session().adopt_access_token(&token)
    }

    /// Log out this session; local state is cleared even if the server call fails
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session().logout().await
    }

    /// Log out every session of this account
    pub async fn logout_all(&self) -> Result<(), ClientError> {
        self.session().logout_all().await
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        let req = self.request(Method::GET, "/auth/profile");
        self.execute(req).await
    }

    pub async fn update_profile(
        &self,
        update: &ProfileUpdateRequest,
    ) -> Result<UserProfile, ClientError> {
        let req = self.request(Method::PUT, "/auth/profile").json(update);
        self.execute(req).await
    }

    /// Number of live sessions for the signed-in account
    pub async fn active_sessions(&self) -> Result<u64, ClientError> {
        let req = self.request(Method::GET, "/auth/sessions/count");
        let response: SessionCountResponse = self.execute(req).await?;
        Ok(response.active_sessions)
    }
}
