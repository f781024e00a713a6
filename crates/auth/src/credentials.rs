/// Raw credential values as they arrived on a request, before any checks.
#[derive(Clone, Copy, Default)]
pub struct Credentials<'a> {
    pub session_token: Option<&'a str>,
    pub security_code: Option<&'a str>,
}

impl<'a> Credentials<'a> {
    pub fn new(session_token: Option<&'a str>, security_code: Option<&'a str>) -> Self {
        Self {
            session_token,
            security_code,
        }
    }
}

impl core::fmt::Debug for Credentials<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("session_token", &self.session_token.map(|_| "<redacted>"))
            .field("security_code", &self.security_code.map(|_| "<redacted>"))
            .finish()
    }
}
