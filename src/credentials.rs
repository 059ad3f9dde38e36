//! Remote API key storage in the OS credential store.
//!
//! On Windows this uses the Credential Manager (via the `keyring` crate), on
//! macOS Keychain, and on Linux the Secret Service API. The key is only a
//! fallback: `REGISTER_REMOTE_API_KEY` in the environment takes precedence.

use keyring::Entry;
use tracing::{info, warn};

const SERVICE_NAME: &str = "shift-register";
const KEY_REMOTE_API_KEY: &str = "remote_api_key";

fn remote_key_entry() -> Result<Entry, keyring::Error> {
    Entry::new(SERVICE_NAME, KEY_REMOTE_API_KEY)
}

/// The stored remote API key, if any. Keyring failures are logged and read
/// as "no key" so the register can still start without sync credentials.
pub fn remote_api_key() -> Option<String> {
    let entry = match remote_key_entry() {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(key) if !key.trim().is_empty() => Some(key.trim().to_string()),
        Ok(_) | Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(error = %e, "keyring: failed to read remote API key");
            None
        }
    }
}

pub fn save_remote_api_key(key: &str) -> Result<(), keyring::Error> {
    remote_key_entry()?.set_password(key.trim())?;
    info!("Remote API key stored in OS credential store");
    Ok(())
}

/// Remove the stored key. Succeeds if there was none.
pub fn forget_remote_api_key() -> Result<(), keyring::Error> {
    match remote_key_entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e),
    }
}
