#[derive(Debug, Clone)]
pub struct Routes {
    pub discovery: &'static str,
    pub jwks: &'static str,
    pub token: &'static str,
    pub userinfo: &'static str,
}

impl Default for Routes {
    fn default() -> Self {
        Routes {
            discovery: "/.well-known/openid-configuration",
            jwks: "/.well-known/jwks.json",
            token: "/v1/token",
            userinfo: "/v1/userinfo",
        }
    }
}
