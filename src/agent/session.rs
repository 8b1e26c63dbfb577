//! Bridge from the SSH agent wire protocol to an `IdentityProvider`

use std::io;
use std::sync::Arc;

use ssh_agent_lib::agent::Session;
use ssh_agent_lib::error::AgentError;
use ssh_agent_lib::proto::{
    AddIdentity, AddIdentityConstrained, Identity as ProtoIdentity, RemoveIdentity, SignRequest,
};
use ssh_key::Signature;
use tracing::{debug, warn};

use crate::error::{YkpivError, YkpivResult};
use crate::ports::IdentityProvider;

/// Per-connection agent session. Cloned per incoming connection by
/// `ssh_agent_lib`; all clones share one provider.
pub struct AgentSession<P> {
    provider: Arc<P>,
}

impl<P> AgentSession<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

impl<P> Clone for AgentSession<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P> AgentSession<P>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    /// Run a hardware-touching call on the blocking pool
    async fn blocking<T, Op>(&self, op: Op) -> Result<T, AgentError>
    where
        T: Send + 'static,
        Op: FnOnce(&P) -> YkpivResult<T> + Send + 'static,
    {
        let provider = Arc::clone(&self.provider);
        tokio::task::spawn_blocking(move || op(&provider))
            .await
            .map_err(|e| AgentError::other(io::Error::other(e)))?
            .map_err(to_agent_error)
    }
}

fn to_agent_error(err: YkpivError) -> AgentError {
    warn!("Agent request failed: {}", err);
    AgentError::other(err)
}

#[ssh_agent_lib::async_trait]
impl<P> Session for AgentSession<P>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    async fn request_identities(&mut self) -> Result<Vec<ProtoIdentity>, AgentError> {
        let identities = self.blocking(|provider| provider.list()).await?;
        debug!(count = identities.len(), "request_identities");
        Ok(identities
            .into_iter()
            .map(|identity| ProtoIdentity {
                pubkey: identity.key_data().clone(),
                comment: identity.comment().to_string(),
            })
            .collect())
    }

    async fn sign(&mut self, request: SignRequest) -> Result<Signature, AgentError> {
        debug!(data_len = request.data.len(), flags = request.flags, "sign");
        self.blocking(move |provider| {
            provider.sign(&request.pubkey, &request.data, request.flags)
        })
        .await
    }

    async fn add_identity(&mut self, identity: AddIdentity) -> Result<(), AgentError> {
        self.provider.add(&identity).map_err(to_agent_error)
    }

    async fn add_identity_constrained(
        &mut self,
        identity: AddIdentityConstrained,
    ) -> Result<(), AgentError> {
        self.provider.add(&identity.identity).map_err(to_agent_error)
    }

    async fn remove_identity(&mut self, identity: RemoveIdentity) -> Result<(), AgentError> {
        self.provider
            .remove(&identity.pubkey)
            .map_err(to_agent_error)
    }

    async fn remove_all_identities(&mut self) -> Result<(), AgentError> {
        self.provider.remove_all().map_err(to_agent_error)
    }

    async fn lock(&mut self, key: String) -> Result<(), AgentError> {
        self.provider.lock(&key).map_err(to_agent_error)
    }

    async fn unlock(&mut self, key: String) -> Result<(), AgentError> {
        self.provider.unlock(&key).map_err(to_agent_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fake_yubikey::{FakeDeviceFinder, FakeToken};
    use crate::agent::AgentAdapter;
    use crate::model::{Pin, SignatureHash};
    use crate::slot_manager::SlotManager;

    fn session_over(token: &FakeToken) -> AgentSession<AgentAdapter<FakeDeviceFinder>> {
        let manager = Arc::new(SlotManager::new(FakeDeviceFinder::single(token.clone())));
        AgentSession::new(Arc::new(AgentAdapter::new(manager, None, Pin::default())))
    }

    #[tokio::test]
    async fn test_request_identities_over_session() {
        let token = FakeToken::provisioned();
        let mut session = session_over(&token);

        let identities = session.request_identities().await.unwrap();
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].comment, "yubikey-backed key");
    }

    #[tokio::test]
    async fn test_sign_over_cloned_sessions() {
        let token = FakeToken::provisioned();
        let mut first = session_over(&token);
        let mut second = first.clone();

        let pubkey = first.request_identities().await.unwrap().remove(0).pubkey;
        let request = SignRequest {
            pubkey,
            data: b"challenge".to_vec(),
            flags: SignatureHash::FLAG_RSA_SHA2_512,
        };

        let a = first.sign(request.clone()).await.unwrap();
        let b = second.sign(request).await.unwrap();
        // PKCS#1 v1.5 is deterministic
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(token.sign_count(), 2);
    }

    #[tokio::test]
    async fn test_failures_become_agent_errors() {
        let token = FakeToken::new();
        let mut session = session_over(&token);

        assert!(session.request_identities().await.is_err());
        assert!(session.lock("pass".to_string()).await.is_err());
        assert!(session.remove_all_identities().await.is_err());
        assert!(session.unlock(String::new()).await.is_ok());
    }
}
