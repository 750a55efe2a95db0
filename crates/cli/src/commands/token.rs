//! `colloquy token`: Mint a capability token with the configured secret.

use colloquy_config::AppConfig;
use colloquy_core::CapabilityToken;
use colloquy_security::CapabilityVerifier;
use std::time::Duration;

pub struct TokenArgs {
    pub admin: bool,
    pub workspace: Option<String>,
    pub session: Option<String>,
    pub peer: Option<String>,
    pub ttl_secs: Option<u64>,
}

impl TokenArgs {
    fn capability(self) -> Result<CapabilityToken, String> {
        if !self.admin && self.workspace.is_none() {
            return Err("a non-admin token needs --workspace".into());
        }
        Ok(CapabilityToken {
            admin: self.admin,
            workspace_scope: self.workspace,
            session_scope: self.session,
            peer_scope: self.peer,
        })
    }
}

pub async fn run(args: TokenArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let secret = config
        .auth
        .jwt_secret
        .as_deref()
        .ok_or("No auth.jwt_secret configured (set COLLOQUY_JWT_SECRET)")?;

    let ttl = args.ttl_secs.map(Duration::from_secs);
    let capability = args.capability()?;
    let token = CapabilityVerifier::new(secret)?.issue(&capability, ttl)?;

    tracing::debug!(?capability, "Issued capability token");
    println!("{token}");
    Ok(())
}
