//! Well-known front-end paths shared by the dispatcher and the route gate.

pub const ROOT: &str = "/";
pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const LOGOUT: &str = "/auth/logout";
pub const DASHBOARD: &str = "/admin";
pub const ADMIN_USERS: &str = "/admin/users";
pub const FORBIDDEN: &str = "/error/403";
pub const SERVER_ERROR: &str = "/error/500";
pub const ERROR_PAGES: &str = "/error";

/// Query parameter carrying the originally requested location on a login redirect.
pub const RETURN_PARAM: &str = "from";

/// True when `path` equals `prefix` or continues it with a new path segment.
pub fn under_prefix(path: &str, prefix: &str) -> bool {
    if prefix == ROOT { return path.starts_with('/'); }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Strip a trailing slash (except on the root) so `/admin/users/` and `/admin/users` match alike.
pub fn normalize_path(path: &str) -> &str {
    if path.is_empty() { return ROOT; }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { ROOT } else { trimmed }
}

/// Login location carrying the originally requested `path[?query]` as the return target.
pub fn login_with_return(path: &str, query: Option<&str>) -> String {
    let target = match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    };
    format!("{}?{}={}", LOGIN, RETURN_PARAM, urlencoding::encode(&target))
}

/// Accept a return target only if it is a local path outside the auth pages.
pub fn safe_return_target(from: Option<&str>) -> Option<String> {
    let from = from?.trim();
    if !from.starts_with('/') || from.starts_with("//") || from.contains('\\') { return None; }
    let path = from.split('?').next().unwrap_or(from);
    if normalize_path(path) == ROOT || under_prefix(path, LOGIN) || under_prefix(path, REGISTER) {
        return None;
    }
    Some(from.to_string())
}
