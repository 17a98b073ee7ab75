//! Response cookies and `Cookie` request-header parsing.

use std::fmt;

/// The `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// A single cookie as it will be sent in a `Set-Cookie` header.
///
/// # Examples
///
/// ```
/// use pathchain::http::{Cookie, SameSite};
///
/// let cookie = Cookie::new("session", "abc")
///     .path("/")
///     .http_only(true)
///     .same_site(SameSite::Lax);
///
/// assert_eq!(cookie.to_string(), "session=abc; Path=/; HttpOnly; SameSite=Lax");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    path: Option<String>,
    domain: Option<String>,
    max_age: Option<i64>,
    http_only: bool,
    secure: bool,
    same_site: Option<SameSite>,
}

impl Cookie {
    /// Creates a cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            domain: None,
            max_age: None,
            http_only: false,
            secure: false,
            same_site: None,
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Lifetime in seconds. Zero or negative expires the cookie immediately.
    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn max_age_seconds(&self) -> Option<i64> {
        self.max_age
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={max_age}")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site.as_str())?;
        }
        Ok(())
    }
}

/// An ordered cookie store keyed by cookie name.
///
/// Setting a cookie whose name is already present replaces it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    inner: Vec<Cookie>,
}

impl Cookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `cookie`, replacing any cookie with the same name.
    pub fn set(&mut self, cookie: Cookie) {
        match self.inner.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => self.inner.push(cookie),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Cookie> {
        self.inner.iter().find(|c| c.name == name)
    }

    /// Returns every cookie in insertion order.
    pub fn get_all(&self) -> impl Iterator<Item = &Cookie> {
        self.inner.iter()
    }

    /// Replaces the cookie with an expired, empty one so the client drops it.
    pub fn delete(&mut self, name: impl Into<String>) {
        self.set(Cookie::new(name, "").path("/").max_age(0));
    }

    /// Forgets the cookie entirely. Nothing is sent for it.
    pub fn remove(&mut self, name: &str) -> Option<Cookie> {
        let index = self.inner.iter().position(|c| c.name == name)?;
        Some(self.inner.remove(index))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Splits a `Cookie` request header into `(name, value)` pairs.
///
/// Pairs without `=` are skipped; surrounding whitespace is trimmed.
pub fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name, value.trim()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_by_name() {
        let mut cookies = Cookies::new();
        cookies.set(Cookie::new("a", "1"));
        cookies.set(Cookie::new("b", "2"));
        cookies.set(Cookie::new("a", "3"));

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("a").map(Cookie::value), Some("3"));
        let names: Vec<_> = cookies.get_all().map(Cookie::name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut cookies = Cookies::new();
        cookies.set(Cookie::new("Token", "x"));
        assert!(cookies.get("token").is_none());
    }

    #[test]
    fn delete_expires_cookie() {
        let mut cookies = Cookies::new();
        cookies.set(Cookie::new("session", "abc"));
        cookies.delete("session");

        let cookie = cookies.get("session").unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age_seconds(), Some(0));
        assert_eq!(cookie.to_string(), "session=; Path=/; Max-Age=0");
    }

    #[test]
    fn remove_forgets_cookie() {
        let mut cookies = Cookies::new();
        cookies.set(Cookie::new("a", "1"));
        assert!(cookies.remove("a").is_some());
        assert!(cookies.is_empty());
        assert!(cookies.remove("a").is_none());
    }

    #[test]
    fn display_all_attributes() {
        let cookie = Cookie::new("id", "42")
            .domain("example.com")
            .max_age(3600)
            .secure(true)
            .same_site(SameSite::Strict);
        assert_eq!(
            cookie.to_string(),
            "id=42; Domain=example.com; Max-Age=3600; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn parse_header_pairs() {
        let pairs: Vec<_> = parse_cookie_header("a=1; b = 2;broken; c=").collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2"), ("c", "")]);
    }
}
