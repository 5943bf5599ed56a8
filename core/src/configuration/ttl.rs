use time::Duration;

#[derive(Debug, Clone)]
pub struct TTL {
    pub id_token: Duration,
    /// Validity window given to every new signing key.
    pub signing_key: Duration,
    pub rotation_interval: Duration,
}

impl Default for TTL {
    fn default() -> Self {
        Self {
            id_token: Duration::hours(1),
            signing_key: Duration::days(30),
            rotation_interval: Duration::days(7),
        }
    }
}
