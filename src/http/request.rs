use grantgate_oauth::{GrantRequest, GrantType};
use serde::Deserialize;

/// Form fields accepted by `POST /token`.
#[derive(Debug, Default, Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_code: Option<String>,
}

impl From<TokenParams> for GrantRequest {
    fn from(params: TokenParams) -> Self {
        GrantRequest {
            // a missing grant_type is just another unknown one
            grant_type: GrantType::parse(params.grant_type.as_deref().unwrap_or_default()),
            username: params.username,
            password: params.password,
            auth_code: params.auth_code,
        }
    }
}
