//! Cookie transport for access and refresh tokens

use cookie::{time::Duration, Cookie, SameSite};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// `Set-Cookie` value for a token cookie
pub fn session_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX)))
        .build()
        .to_string()
}

/// `Set-Cookie` value that makes the client drop a cookie
pub fn expired_cookie(name: &str) -> String {
    Cookie::build((name, ""))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
        .to_string()
}

/// Read one cookie from a `Cookie` request header
pub fn read_cookie(header: Option<&str>, name: &str) -> Option<String> {
    Cookie::split_parse(header?)
        .filter_map(|c| c.ok())
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let header = session_cookie(ACCESS_COOKIE, "tok", 60);
        assert!(header.starts_with("accessToken=tok"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Secure"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("Max-Age=60"));
    }

    #[test]
    fn test_expired_cookie_has_zero_max_age() {
        let header = expired_cookie(REFRESH_COOKIE);
        assert!(header.starts_with("refreshToken="));
        assert!(header.contains("Max-Age=0"));
    }

    #[test]
    fn test_read_cookie() {
        let header = Some("theme=dark; accessToken=abc.def.ghi; refreshToken=");
        assert_eq!(read_cookie(header, ACCESS_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(header, REFRESH_COOKIE), None);
        assert_eq!(read_cookie(None, ACCESS_COOKIE), None);
    }
}
