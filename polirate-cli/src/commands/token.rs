//! Mint bearer tokens signed with the configured secret
//!
//! For local testing against `polirate serve`; production tokens come from
//! the identity provider.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use uuid::Uuid;

use polirate_core::PlatformConfig;
use polirate_server::auth::SERVICE_ROLE;
use polirate_server::{issue_token, Claims};

#[derive(Parser, Debug)]
pub struct TokenArgs {
    /// User id for the `sub` claim (random when omitted)
    #[arg(long)]
    pub user: Option<Uuid>,

    /// Email claim, used to derive the default nickname
    #[arg(long)]
    pub email: Option<String>,

    /// Grant the service role (admin endpoints)
    #[arg(long)]
    pub service: bool,

    /// Lifetime in hours
    #[arg(long, default_value_t = 24)]
    pub hours: i64,
}

fn claims(args: &TokenArgs, user: Uuid) -> Claims {
    let exp = Utc::now() + Duration::hours(args.hours.max(1));
    Claims {
        sub: user.to_string(),
        exp: exp.timestamp().max(0) as usize,
        email: args.email.clone(),
        role: Some(if args.service { SERVICE_ROLE } else { "authenticated" }.to_owned()),
    }
}

pub fn run_token(config_path: Option<&Path>, args: TokenArgs) -> Result<()> {
    let config = PlatformConfig::load(config_path)?;
    let secret = config.jwt_secret()?;

    let user = args.user.unwrap_or_else(Uuid::new_v4);
    let token = issue_token(secret, &claims(&args, user)).context("Failed to sign token")?;

    tracing::debug!(%user, service = args.service, "issued token");
    println!("{token}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(service: bool) -> TokenArgs {
        TokenArgs {
            user: None,
            email: Some("kim@example.com".into()),
            service,
            hours: 0,
        }
    }

    #[test]
    fn service_flag_sets_role() {
        let id = Uuid::new_v4();
        assert_eq!(claims(&args(true), id).role.as_deref(), Some(SERVICE_ROLE));
        assert_eq!(claims(&args(false), id).role.as_deref(), Some("authenticated"));
    }

    #[test]
    fn lifetime_at_least_an_hour() {
        let c = claims(&args(false), Uuid::new_v4());
        assert!(c.exp as i64 > Utc::now().timestamp() + 3500);
    }
}
