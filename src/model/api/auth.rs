//! Access-token handling. Tokens are issued by the authentication service;
//! this crate only verifies them and attaches the caller's user record.

use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::{Cookie, SameSite},
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    time::Duration,
    Request,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    engine::Services,
    error::Error,
    model::{api::id::ApiId, common::user::Role, db::user::User, mongodb::Id},
};

pub const AUTH_TOKEN_COOKIE: &str = "access_token";

/// A class of caller that a route accepts.
pub trait Principal {
    /// Message returned when a token with the wrong role is presented.
    const DENIED: &'static str;

    fn permits(role: Role) -> bool;
}

/// Administrators only.
#[derive(Debug)]
pub struct Admin;

impl Principal for Admin {
    const DENIED: &'static str = "Only admin can perform this action";

    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}

/// Any authenticated user, whatever their role.
#[derive(Debug)]
pub struct AnyUser;

impl Principal for AnyUser {
    const DENIED: &'static str = "Authentication required";

    fn permits(_role: Role) -> bool {
        true
    }
}

/// An access token identifying a user and their role.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<P> {
    #[serde(rename = "userId")]
    pub user_id: ApiId,
    pub role: Role,
    #[serde(skip)]
    phantom: PhantomData<P>,
}

impl<P> AuthToken<P> {
    pub fn new(user_id: Id, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            phantom: PhantomData,
        }
    }

    /// The authenticated user's ID.
    pub fn id(&self) -> Id {
        *self.user_id
    }

    /// Serialize this token into a cookie, as the authentication service would.
    #[allow(clippy::missing_panics_doc)]
    pub fn into_cookie(self, config: &Config) -> Cookie<'static> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };

        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings");

        Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish()
    }

    /// Verify and decode a token.
    pub fn decode(token: &str, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<P>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<P> {
    #[serde(flatten, bound = "")]
    token: AuthToken<P>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, P> FromRequest<'r> for AuthToken<P>
where
    P: Principal + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the cookie and check that its role is accepted.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => return Error::Internal("Config is not managed".to_string()).fail_guard(req),
        };

        let cookie = match req.cookies().get(AUTH_TOKEN_COOKIE) {
            Some(cookie) => cookie,
            None => {
                return Error::Forbidden("Authorization token is missing".to_string())
                    .fail_guard(req)
            }
        };

        let token = match Self::decode(cookie.value(), config) {
            Ok(token) => token,
            Err(e) => return e.fail_guard(req),
        };

        if !P::permits(token.role) {
            return Error::Forbidden(P::DENIED.to_string()).fail_guard(req);
        }

        Outcome::Success(token)
    }
}

/// An authenticated caller with their user record attached, which carries
/// the constituency they are registered in.
#[derive(Debug)]
pub struct Voter {
    pub token: AuthToken<AnyUser>,
    pub user: User,
}

impl Voter {
    pub fn id(&self) -> Id {
        self.user.id
    }

    pub fn constituency_id(&self) -> Option<Id> {
        self.user.constituency_id
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Voter {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken<AnyUser>>().await);

        let services = match req.rocket().state::<Services>() {
            Some(services) => services,
            None => return Error::Internal("Services are not managed".to_string()).fail_guard(req),
        };

        match services.users.user_by_id(token.id()).await {
            Ok(Some(user)) => Outcome::Success(Voter { token, user }),
            Ok(None) => Error::Unauthorized("User not found".to_string()).fail_guard(req),
            Err(e) => e.fail_guard(req),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principals() {
        assert!(Admin::permits(Role::Admin));
        assert!(!Admin::permits(Role::User));
        assert!(!Admin::permits(Role::PartyHead));
        assert!(AnyUser::permits(Role::User));
        assert!(AnyUser::permits(Role::PartyHead));
    }

    #[test]
    fn cookie_round_trip() {
        let config = Config::example();
        let id = Id::new();
        let cookie = AuthToken::<Admin>::new(id, Role::Admin).into_cookie(&config);
        assert_eq!(cookie.name(), AUTH_TOKEN_COOKIE);

        let token = AuthToken::<Admin>::decode(cookie.value(), &config).unwrap();
        assert_eq!(token.id(), id);
        assert_eq!(token.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = Config::example();
        let cookie = AuthToken::<AnyUser>::new(Id::new(), Role::User).into_cookie(&config);

        let mut other = Config::example();
        other.set_jwt_secret("some other secret");
        assert!(matches!(
            AuthToken::<AnyUser>::decode(cookie.value(), &other),
            Err(Error::Jwt(_))
        ));
    }
}
