// ─── Registry lookup ───
// Read-only HKLM lookups. Off Windows, or when the key is missing or access
// is denied, lookups return `None` and callers use fallback paths.

use tracing::debug;

pub const STEAM_KEY: &str = r"SOFTWARE\WOW6432Node\Valve\Steam";
pub const EPIC_KEY: &str = r"SOFTWARE\WOW6432Node\Epic Games\EpicGamesLauncher";

#[cfg(target_os = "windows")]
pub fn query_value(key: &str, value: &str) -> Option<String> {
    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let subkey = match hklm.open_subkey_with_flags(key, KEY_READ) {
        Ok(subkey) => subkey,
        Err(e) => {
            debug!("Cannot open HKLM\\{}: {}", key, e);
            return None;
        }
    };
    match subkey.get_value::<String, _>(value) {
        Ok(data) if !data.trim().is_empty() => Some(data),
        Ok(_) => None,
        Err(e) => {
            debug!("Cannot read HKLM\\{}\\{}: {}", key, value, e);
            None
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn query_value(key: &str, value: &str) -> Option<String> {
    debug!("No registry on this platform ({}\\{})", key, value);
    None
}
