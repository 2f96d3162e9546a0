use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Signing key used when `SECRET_KEY` is unset. Generated once and kept next to the
/// manifest so tokens survive a restart in development.
pub(super) fn load_or_create_secret_key() -> String {
    load_or_create_at(&default_secret_path())
}

fn load_or_create_at(path: &Path) -> String {
    if let Some(existing) = read_key(path) {
        return existing;
    }

    let new_key = generate_secret_key();
    match persist_key(path, &new_key) {
        Ok(()) => new_key,
        // Another process won the race; use its key.
        Err(err) if err.kind() == ErrorKind::AlreadyExists => read_key(path).unwrap_or(new_key),
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %path.display(),
                "Failed to persist generated secret key; tokens will not survive a restart"
            );
            new_key
        }
    }
}

fn read_key(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn persist_key(path: &Path, key: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            tracing::warn!(error = %err, path = %path.display(), "Failed to restrict secret key file");
        }
    }

    file.write_all(key.as_bytes())
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn default_secret_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".secret_key")
}
