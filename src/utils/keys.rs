//! Key path helpers

/// Join a parent key path and a child segment with `.`.
pub fn join_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

/// Environment variable name for a dotted key path.
///
/// `server.port` becomes `SERVER_PORT`, or `MYAPP_SERVER_PORT` with prefix `myapp`.
pub fn env_var_name(prefix: Option<&str>, key_path: &str) -> String {
    let key = key_path.replace('.', "_");
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}_{key}").to_uppercase(),
        None => key.to_uppercase(),
    }
}

/// Case-fold a key for lookup in the resolution store.
pub fn fold_key(key: &str) -> String {
    key.to_lowercase()
}
