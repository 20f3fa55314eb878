//! Configuration from the environment
//!
//! - `ADDRESS`: address to listen on, defaults to `0.0.0.0:6000`
//! - `PORT`: optional override of just the port
//! - `DATABASE_URL`: Postgres connection, the memory storage is used without it
//! - `LANGUAGES`: comma separated language codes, the first one is the default language
//! - `PRIORITIZED_LANGUAGES`: language codes used by the router, defaults to `LANGUAGES`
//! - `ROOT_LOCATION_ID`: location of the root entry, defaults to 2
//! - `CONFLICT_POLICY`: `suffix` (default) or `reject`, see [`ConflictPolicy`](ConflictPolicy)

use core::str::FromStr;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

use crate::aliases::LocationId;
use crate::handler::Disambiguation;
use crate::handler::NumericSuffix;
use crate::handler::Reject;
use crate::languages::Languages;
use crate::utils::env_var;
use crate::utils::env_var_or_else;
use crate::utils::split_list;

const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";
const DEFAULT_LANGUAGES: &str = "eng-GB";
const DEFAULT_ROOT_LOCATION_ID: LocationId = 2;

/// What to do when a path element is already taken by another target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Append a number: `news`, `news2`, `news3`
    #[default]
    Suffix,

    /// Fail the publish
    Reject,
}

impl ConflictPolicy {
    /// The matching disambiguation strategy
    pub fn disambiguation(self) -> Arc<dyn Disambiguation> {
        match self {
            Self::Suffix => Arc::new(NumericSuffix),
            Self::Reject => Arc::new(Reject),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "suffix" => Ok(Self::Suffix),
            "reject" => Ok(Self::Reject),
            other => bail!("Unknown conflict policy `{other}`, expected `suffix` or `reject`"),
        }
    }
}

/// Languages used by the router when resolving requests
#[derive(Clone, Debug, Default)]
pub struct PrioritizedLanguages(pub Arc<Vec<String>>);

/// All settings of the service
#[derive(Clone, Debug)]
pub struct Config {
    /// Address to listen on
    pub address: SocketAddr,

    /// Postgres connection URL
    pub database_url: Option<String>,

    /// Configured languages
    pub languages: Languages,

    /// Languages used by the router, most wanted first
    pub prioritized_languages: Vec<String>,

    /// Location of the root entry
    pub root_location_id: LocationId,

    /// Conflict handling on publish
    pub conflict_policy: ConflictPolicy,
}

impl Config {
    /// Read the configuration from the environment
    ///
    /// # Errors
    ///
    /// Will return `Err` for malformed values
    pub fn from_env() -> Result<Self> {
        let language_codes = split_list(&env_var_or_else("LANGUAGES", || {
            String::from(DEFAULT_LANGUAGES)
        }));

        let languages = Languages::new(&language_codes)
            .context("`LANGUAGES` must hold at least one and at most 62 language codes")?;

        let prioritized_languages = match env_var("PRIORITIZED_LANGUAGES") {
            Some(value) => split_list(&value),
            None => language_codes,
        };

        if let Some(unknown) = prioritized_languages
            .iter()
            .find(|code| languages.by_code(code).is_none())
        {
            bail!("Prioritized language `{unknown}` is not part of `LANGUAGES`");
        }

        let root_location_id = match env_var("ROOT_LOCATION_ID") {
            Some(value) => value
                .trim()
                .parse::<LocationId>()
                .context("`ROOT_LOCATION_ID` must be a number")?,
            None => DEFAULT_ROOT_LOCATION_ID,
        };

        let conflict_policy = match env_var("CONFLICT_POLICY") {
            Some(value) => value.parse()?,
            None => ConflictPolicy::default(),
        };

        Ok(Self {
            address: address()?,
            database_url: env_var("DATABASE_URL"),
            languages,
            prioritized_languages,
            root_location_id,
            conflict_policy,
        })
    }
}

fn address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        address.set_port(port.parse::<u16>()?);
    }

    Ok(address)
}
