use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Where the client keeps its bearer credentials between runs.
pub trait TokenStore: Send + Sync + fmt::Debug {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_tokens(&self, access: &str, refresh: Option<&str>);
    fn clear_tokens(&self);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Tokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Tokens held in memory only.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Tokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: &str, refresh: Option<&str>) -> Self {
        let store = Self::default();
        store.set_tokens(access, refresh);
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.inner.lock().ok()?.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.lock().ok()?.refresh_token.clone()
    }

    fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        if let Ok(mut tokens) = self.inner.lock() {
            tokens.access_token = Some(access.to_owned());
            if let Some(refresh) = refresh {
                tokens.refresh_token = Some(refresh.to_owned());
            }
        }
    }

    fn clear_tokens(&self) {
        if let Ok(mut tokens) = self.inner.lock() {
            *tokens = Tokens::default();
        }
    }
}

/// Tokens in a JSON file readable only by the current user.
///
/// Every failure is logged and treated as "no token": a broken credentials
/// file must degrade to an anonymous session, never to a crash.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Tokens {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Tokens::default(),
            Err(e) => {
                warn!("could not read tokens at {}: {e}", self.path.display());
                return Tokens::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring corrupt token file {}: {e}", self.path.display());
            Tokens::default()
        })
    }

    fn write(&self, tokens: &Tokens) {
        if let Err(e) = self.try_write(tokens) {
            warn!("could not write tokens to {}: {e}", self.path.display());
        }
    }

    fn try_write(&self, tokens: &Tokens) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string(tokens).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, payload)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.read().access_token
    }

    fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token
    }

    fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        let mut tokens = self.read();
        tokens.access_token = Some(access.to_owned());
        if let Some(refresh) = refresh {
            tokens.refresh_token = Some(refresh.to_owned());
        }
        self.write(&tokens);
    }

    fn clear_tokens(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove tokens at {}: {e}", self.path.display()),
        }
    }
}
