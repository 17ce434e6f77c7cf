use std::collections::HashMap;

/// Resolves a bearer credential to a user id.
///
/// Absence means "guest": a missing, malformed, or unknown token resolves
/// to `None` rather than an error, and every read path treats `None` as an
/// anonymous viewer.
pub trait IdentityResolver {
    fn resolve(&self, bearer: Option<&str>) -> Option<String>;
}

/// Static token-to-user table, sufficient for embedding and tests. Real
/// deployments supply their own resolver over whatever credential scheme
/// the surrounding application uses.
#[derive(Debug, Default, Clone)]
pub struct TokenTable {
    tokens: HashMap<String, String>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, user_id: impl Into<String>) {
        self.tokens.insert(token.into(), user_id.into());
    }
}

impl IdentityResolver for TokenTable {
    fn resolve(&self, bearer: Option<&str>) -> Option<String> {
        let token = bearer?.strip_prefix("Bearer ").or(bearer)?;
        self.tokens.get(token).cloned()
    }
}
