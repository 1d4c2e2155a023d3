//! Authentication providers.
//!
//! The adapter calls [`AuthenticationProvider::authenticate_request`] before
//! every send. On a claims-challenge retry the additional context carries a
//! single [`CLAIMS_KEY`] entry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::{RequestInformation, Result};

/// Extra information passed to a provider.
pub type AdditionalContext = HashMap<String, String>;

/// Context key carrying the claims of a claims challenge.
pub const CLAIMS_KEY: &str = "claims";

const AUTHORIZATION: &str = "authorization";

/// Authenticates requests, typically by adding an `Authorization` header.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    /// Authenticates the request in place.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials cannot be obtained.
    async fn authenticate_request(
        &self,
        request: &mut RequestInformation,
        additional_context: Option<&AdditionalContext>,
    ) -> Result<()>;
}

#[async_trait]
impl<P: AuthenticationProvider + ?Sized> AuthenticationProvider for Arc<P> {
    async fn authenticate_request(
        &self,
        request: &mut RequestInformation,
        additional_context: Option<&AdditionalContext>,
    ) -> Result<()> {
        (**self)
            .authenticate_request(request, additional_context)
            .await
    }
}

/// Provider that leaves requests untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticationProvider;

#[async_trait]
impl AuthenticationProvider for AnonymousAuthenticationProvider {
    async fn authenticate_request(
        &self,
        _request: &mut RequestInformation,
        _additional_context: Option<&AdditionalContext>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Source of access tokens.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Token for the given URI; an empty token means "do not authenticate".
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be acquired.
    async fn authorization_token(
        &self,
        uri: &Url,
        additional_context: Option<&AdditionalContext>,
    ) -> Result<String>;

    /// Hosts this provider hands tokens to; empty means every host.
    fn allowed_hosts(&self) -> &[String] {
        &[]
    }
}

/// Adds `Authorization: Bearer <token>` from an [`AccessTokenProvider`].
///
/// A claims challenge drops the current `Authorization` header so that a
/// fresh token is requested.
#[derive(Debug, Clone)]
pub struct BaseBearerTokenAuthenticationProvider<T> {
    token_provider: T,
}

impl<T: AccessTokenProvider> BaseBearerTokenAuthenticationProvider<T> {
    /// Creates the provider.
    #[must_use]
    pub const fn new(token_provider: T) -> Self {
        Self { token_provider }
    }

    /// Underlying token provider.
    #[must_use]
    pub const fn token_provider(&self) -> &T {
        &self.token_provider
    }
}

#[async_trait]
impl<T: AccessTokenProvider> AuthenticationProvider for BaseBearerTokenAuthenticationProvider<T> {
    async fn authenticate_request(
        &self,
        request: &mut RequestInformation,
        additional_context: Option<&AdditionalContext>,
    ) -> Result<()> {
        let has_claims = additional_context.is_some_and(|context| context.contains_key(CLAIMS_KEY));
        if has_claims {
            request.headers_mut().remove(AUTHORIZATION);
        }
        if request.headers().contains(AUTHORIZATION) {
            return Ok(());
        }

        let uri = request.uri()?;
        let allowed = self.token_provider.allowed_hosts();
        if !allowed.is_empty()
            && !uri
                .host_str()
                .is_some_and(|host| allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(host)))
        {
            return Ok(());
        }

        let token = self
            .token_provider
            .authorization_token(&uri, additional_context)
            .await?;
        if !token.is_empty() {
            request
                .headers_mut()
                .add(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(())
    }
}

/// Token provider handing out a fixed token.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Arc<str>,
    allowed_hosts: Vec<String>,
}

impl StaticTokenProvider {
    /// Creates a provider for the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
            allowed_hosts: Vec::new(),
        }
    }

    /// Restricts the token to the given hosts.
    #[must_use]
    pub fn with_allowed_hosts(mut self, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn authorization_token(
        &self,
        _uri: &Url,
        _additional_context: Option<&AdditionalContext>,
    ) -> Result<String> {
        Ok(self.token.to_string())
    }

    fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{BASE_URL_KEY, Method};

    fn request() -> RequestInformation {
        let mut info = RequestInformation::new(Method::Get, "{+baseurl}/me");
        info.add_path_parameter(BASE_URL_KEY, "https://graph.example.com");
        info
    }

    #[tokio::test]
    async fn anonymous_leaves_request_untouched() {
        let mut info = request();
        AnonymousAuthenticationProvider
            .authenticate_request(&mut info, None)
            .await
            .expect("anonymous");
        assert!(info.headers().is_empty());
    }

    #[tokio::test]
    async fn bearer_token_is_added() {
        let provider = BaseBearerTokenAuthenticationProvider::new(StaticTokenProvider::new("secret"));
        let mut info = request();
        provider
            .authenticate_request(&mut info, None)
            .await
            .expect("authenticate");

        assert_eq!(info.headers().get_first("Authorization"), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn existing_authorization_is_kept_without_claims() {
        let provider = BaseBearerTokenAuthenticationProvider::new(StaticTokenProvider::new("fresh"));
        let mut info = request();
        info.headers_mut().add("Authorization", "Bearer stale");

        provider
            .authenticate_request(&mut info, None)
            .await
            .expect("authenticate");
        assert_eq!(info.headers().get_first("authorization"), Some("Bearer stale"));
    }

    #[tokio::test]
    async fn claims_replace_authorization() {
        #[derive(Default)]
        struct Recording {
            contexts: Mutex<Vec<Option<AdditionalContext>>>,
        }

        #[async_trait]
        impl AccessTokenProvider for Recording {
            async fn authorization_token(
                &self,
                _uri: &Url,
                additional_context: Option<&AdditionalContext>,
            ) -> Result<String> {
                self.contexts
                    .lock()
                    .expect("lock")
                    .push(additional_context.cloned());
                Ok("fresh".to_string())
            }
        }

        let provider = BaseBearerTokenAuthenticationProvider::new(Recording::default());
        let mut info = request();
        info.headers_mut().add("Authorization", "Bearer stale");

        let mut context = AdditionalContext::new();
        context.insert(CLAIMS_KEY.to_string(), "eyJ".to_string());
        provider
            .authenticate_request(&mut info, Some(&context))
            .await
            .expect("authenticate");

        assert_eq!(
            info.headers().get("authorization"),
            Some(&["Bearer fresh".to_string()][..])
        );
        let contexts = provider.token_provider().contexts.lock().expect("lock");
        assert_eq!(contexts.as_slice(), &[Some(context.clone())]);
    }

    #[tokio::test]
    async fn token_restricted_to_allowed_hosts() {
        let provider = BaseBearerTokenAuthenticationProvider::new(
            StaticTokenProvider::new("secret").with_allowed_hosts(["other.example.com"]),
        );
        let mut info = request();
        provider
            .authenticate_request(&mut info, None)
            .await
            .expect("authenticate");
        assert!(!info.headers().contains("authorization"));
    }
}
