//! Credential checks shared by every RPC.

use tracing::{error, warn};

use super::Gateway;
use crate::Result;
use crate::context::{RequestContext, obfuscate_api_key};
use crate::error::GatewayError;
use crate::types::{ApiKeyRole, EnvironmentApiKey};

impl Gateway {
    /// Cancellation, credential presence, key resolution and role check,
    /// in that order. Nothing is looked up for a cancelled request.
    pub(crate) async fn check_request(
        &self,
        ctx: &RequestContext,
        roles: &[ApiKeyRole],
    ) -> Result<EnvironmentApiKey> {
        if ctx.is_cancelled() {
            return Err(GatewayError::Canceled);
        }
        let token = ctx.api_key().ok_or(GatewayError::MissingApiKey)?;
        self.check_api_key(token, roles).await
    }

    /// [`check_request`](Self::check_request) for transports that carry the
    /// key in the request body (legacy Track).
    pub(crate) async fn check_track_request(
        &self,
        ctx: &RequestContext,
        token: &str,
    ) -> Result<EnvironmentApiKey> {
        if ctx.is_cancelled() {
            warn!("request was canceled");
            return Err(GatewayError::Canceled);
        }
        self.check_api_key(token, &[ApiKeyRole::SdkClient]).await
    }

    async fn check_api_key(&self, token: &str, roles: &[ApiKeyRole]) -> Result<EnvironmentApiKey> {
        let key = self.api_keys.resolve(token).await?;
        if let Err(err) = check_environment_api_key(&key, roles) {
            error!(
                error = %err,
                api_key = %obfuscate_api_key(token),
                environment_id = %key.environment_id,
                role = ?key.role,
                "failed to check environment api key"
            );
            return Err(err);
        }
        Ok(key)
    }
}

/// Role membership and disabled flags. Applied on every request, cache hit
/// or not, so disabling a key or environment takes effect immediately.
pub(crate) fn check_environment_api_key(key: &EnvironmentApiKey, roles: &[ApiKeyRole]) -> Result<()> {
    if !roles.contains(&key.role) {
        return Err(GatewayError::BadRole);
    }
    if key.environment_disabled || key.disabled {
        return Err(GatewayError::DisabledApiKey);
    }
    Ok(())
}

/// Errors callers cause routinely; not worth an error log.
pub(crate) fn is_expected(err: &GatewayError) -> bool {
    matches!(
        err,
        GatewayError::Canceled | GatewayError::InvalidApiKey | GatewayError::MissingApiKey
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(role: ApiKeyRole) -> EnvironmentApiKey {
        EnvironmentApiKey {
            environment_id: "env".into(),
            role,
            ..Default::default()
        }
    }

    #[test]
    fn role_must_be_allowed() {
        let client = key(ApiKeyRole::SdkClient);
        assert_eq!(check_environment_api_key(&client, &[ApiKeyRole::SdkClient]), Ok(()));
        assert_eq!(
            check_environment_api_key(&client, &[ApiKeyRole::SdkServer]),
            Err(GatewayError::BadRole)
        );
    }

    #[test]
    fn disabled_key_or_environment_is_rejected() {
        let mut disabled = key(ApiKeyRole::SdkServer);
        disabled.disabled = true;
        assert_eq!(
            check_environment_api_key(&disabled, &[ApiKeyRole::SdkServer]),
            Err(GatewayError::DisabledApiKey)
        );

        let mut env_disabled = key(ApiKeyRole::SdkServer);
        env_disabled.environment_disabled = true;
        assert_eq!(
            check_environment_api_key(&env_disabled, &[ApiKeyRole::SdkServer]),
            Err(GatewayError::DisabledApiKey)
        );
    }
}
