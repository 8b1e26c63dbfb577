//! Unix-socket listener for the agent

use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ssh_agent_lib::agent::listen;
use tokio::net::UnixListener;
use tracing::{info, warn};

use super::AgentSession;
use crate::error::{ServiceError, YkpivResult};
use crate::ports::IdentityProvider;

/// `~/.ssh/ykpiv-agent.sock`
pub fn default_socket_path() -> YkpivResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ServiceError::NoHomeDirectory)?;
    Ok(socket_path_in(&home))
}

fn socket_path_in(home: &Path) -> PathBuf {
    home.join(".ssh").join("ykpiv-agent.sock")
}

/// Serve `provider` on `socket_path` until SIGINT or SIGTERM
///
/// The socket is created with mode 0600 and removed on shutdown. A bind
/// failure is returned immediately. Stopping does not abort a hardware call
/// already running on the blocking pool.
pub async fn serve<P>(provider: Arc<P>, socket_path: &Path) -> YkpivResult<()>
where
    P: IdentityProvider + Send + Sync + 'static,
{
    let listener = bind(socket_path)?;
    info!("Listening at: {}", socket_path.display());

    let result = tokio::select! {
        result = listen(listener, AgentSession::new(provider)) => {
            result.map_err(|e| ServiceError::Listener { reason: e.to_string() })
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping agent");
            Ok(())
        }
    };

    if let Err(e) = std::fs::remove_file(socket_path) {
        warn!(path = %socket_path.display(), "failed to remove agent socket: {e}");
    }
    Ok(result?)
}

/// Bind the agent socket and restrict it to the owner
pub fn bind(socket_path: &Path) -> YkpivResult<UnixListener> {
    let listener = UnixListener::bind(socket_path).map_err(|source| ServiceError::Bind {
        path: socket_path.display().to_string(),
        source,
    })?;

    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600)).map_err(
        |source| ServiceError::Permissions {
            path: socket_path.display().to_string(),
            source,
        },
    )?;

    Ok(listener)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!("failed to register SIGTERM handler: {e}, falling back to SIGINT only");
            ctrl_c.await.ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::YkpivError;

    #[test]
    fn test_socket_path_under_home() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(
            socket_path_in(home.path()),
            home.path().join(".ssh/ykpiv-agent.sock")
        );
        assert_eq!(
            socket_path_in(Path::new("/home/alice")),
            PathBuf::from("/home/alice/.ssh/ykpiv-agent.sock")
        );
    }

    #[tokio::test]
    async fn test_bind_restricts_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.sock");

        let _listener = bind(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_bind_fails_when_socket_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.sock");

        let _listener = bind(&path).unwrap();
        let err = bind(&path).unwrap_err();
        assert!(matches!(err, YkpivError::Service(ServiceError::Bind { .. })));
    }
}
