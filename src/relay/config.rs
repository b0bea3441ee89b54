use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use alloy_chains::NamedChain;
use alloy_primitives::Address;
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::chain::HashiDeployment;
use crate::error::{RelayError, Result};
use crate::protocol::MessageId;

/// Default time to wait for the response event, in seconds
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 600;

/// Prefix of every environment variable read by [`RelayConfig::from_env`]
pub const ENV_PREFIX: &str = "HASHI_";

/// One network the relay talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub rpc_url: Url,
}

impl NetworkConfig {
    pub fn new(chain_id: u64, rpc_url: Url) -> Self {
        Self { chain_id, rpc_url }
    }
}

/// How the source-chain dispatch id relates to the destination registration id.
///
/// The two ids are read from events on different chains. With
/// [`Independent`](Self::Independent) they are tracked separately and the
/// registration id drives execution and correlation. With
/// [`RequireMatch`](Self::RequireMatch) a run fails unless both are equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageIdPolicy {
    #[default]
    Independent,
    RequireMatch,
}

impl MessageIdPolicy {
    /// Picks the id used from registration onwards.
    pub fn reconcile(&self, dispatched: MessageId, registered: MessageId) -> Result<MessageId> {
        match self {
            MessageIdPolicy::Independent => {
                if dispatched != registered {
                    debug!(
                        dispatch_id = %dispatched,
                        message_id = %registered,
                        event = "message_ids_differ"
                    );
                }
                Ok(registered)
            }
            MessageIdPolicy::RequireMatch if dispatched == registered => Ok(registered),
            MessageIdPolicy::RequireMatch => Err(RelayError::MessageIdMismatch {
                dispatched,
                registered,
            }),
        }
    }
}

impl FromStr for MessageIdPolicy {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(MessageIdPolicy::Independent),
            "require_match" | "require-match" => Ok(MessageIdPolicy::RequireMatch),
            other => Err(RelayError::InvalidConfig(format!(
                "Unknown message id policy: {other}"
            ))),
        }
    }
}

/// Everything a relay pipeline needs to know about its route.
///
/// The configuration is used as given; [`validate`](Self::validate) only
/// checks that it is structurally complete.
///
/// # Examples
///
/// ```rust
/// use hashi_vrf_rs::RelayConfig;
/// use alloy_primitives::Address;
///
/// let config = RelayConfig::chiado_to_goerli(
///     "https://rpc.chiadochain.net".parse().unwrap(),
///     "wss://ethereum-goerli.publicnode.com".parse().unwrap(),
///     Address::ZERO,
/// )
/// .unwrap();
/// assert_eq!(config.source.chain_id, 10200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Builder, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    pub source: NetworkConfig,
    pub destination: NetworkConfig,
    /// Yaho dispatcher on the source chain
    pub yaho: Address,
    /// Yaru executor on the destination chain
    pub yaru: Address,
    /// Adapters Yaho dispatches through
    pub source_adapters: Vec<Address>,
    /// Bridges on the destination side the adapters deliver to
    pub destination_adapters: Vec<Address>,
    /// AMB that registers attestations and vouches for provenance at execution
    pub destination_amb: Address,
    #[serde(default)]
    pub amb_helper: Option<Address>,
    #[serde(default)]
    pub attestor_url: Option<Url>,
    /// Contract emitting the response event
    pub response_contract: Address,
    /// Address that dispatches on the source chain
    pub sender: Address,
    #[builder(default = DEFAULT_RESPONSE_TIMEOUT_SECS)]
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,
    #[builder(default)]
    #[serde(default)]
    pub message_id_policy: MessageIdPolicy,
}

fn default_response_timeout_secs() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT_SECS
}

impl RelayConfig {
    /// The Chiado → Goerli route with its published deployments.
    pub fn chiado_to_goerli(chiado_rpc: Url, goerli_rpc: Url, sender: Address) -> Result<Self> {
        let source = NamedChain::Chiado;
        let destination = NamedChain::Goerli;

        Ok(Self::builder()
            .source(NetworkConfig::new(source as u64, chiado_rpc))
            .destination(NetworkConfig::new(destination as u64, goerli_rpc))
            .yaho(source.yaho_address()?)
            .yaru(destination.yaru_address()?)
            .source_adapters(source.source_adapters()?)
            .destination_adapters(vec![destination.amb_address()?])
            .destination_amb(destination.amb_address()?)
            .amb_helper(destination.amb_helper_address()?)
            .response_contract(destination.vrf_consumer_address()?)
            .sender(sender)
            .build())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    /// Checks that the configuration is complete enough to run a relay.
    pub fn validate(&self) -> Result<()> {
        if self.source.chain_id == self.destination.chain_id {
            return Err(RelayError::InvalidConfig(format!(
                "Source and destination share chain id {}",
                self.source.chain_id
            )));
        }
        if self.source_adapters.is_empty() {
            return Err(RelayError::InvalidConfig(
                "At least one source adapter is required".to_string(),
            ));
        }
        if self.destination_adapters.is_empty() {
            return Err(RelayError::InvalidConfig(
                "At least one destination adapter is required".to_string(),
            ));
        }
        if self.amb_helper.is_none() && self.attestor_url.is_none() {
            return Err(RelayError::InvalidConfig(
                "Either an AMB helper or an attestor URL is required".to_string(),
            ));
        }
        if self.response_timeout_secs == 0 {
            return Err(RelayError::InvalidConfig(
                "Response timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RelayError::InvalidConfig(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Loads the configuration from `HASHI_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Address lists are comma separated.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, event = "dotenv_unreadable");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from `HASHI_*` keys resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let config = Self {
            source: NetworkConfig::new(
                env.required("SOURCE_CHAIN_ID")?,
                env.required("SOURCE_RPC_URL")?,
            ),
            destination: NetworkConfig::new(
                env.required("DESTINATION_CHAIN_ID")?,
                env.required("DESTINATION_RPC_URL")?,
            ),
            yaho: env.required("YAHO")?,
            yaru: env.required("YARU")?,
            source_adapters: env.addresses("SOURCE_ADAPTERS")?,
            destination_adapters: env.addresses("DESTINATION_ADAPTERS")?,
            destination_amb: env.required("DESTINATION_AMB")?,
            amb_helper: env.optional("AMB_HELPER")?,
            attestor_url: env.optional("ATTESTOR_URL")?,
            response_contract: env.required("RESPONSE_CONTRACT")?,
            sender: env.required("SENDER")?,
            response_timeout_secs: env
                .optional("RESPONSE_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_SECS),
            message_id_policy: env.optional("MESSAGE_ID_POLICY")?.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}")).filter(|v| !v.trim().is_empty())
    }

    fn optional<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.raw(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| {
                    RelayError::InvalidConfig(format!("{ENV_PREFIX}{key} is invalid: {e}"))
                })
            })
            .transpose()
    }

    fn required<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.optional(key)?
            .ok_or_else(|| RelayError::InvalidConfig(format!("{ENV_PREFIX}{key} is not set")))
    }

    fn addresses(&self, key: &str) -> Result<Vec<Address>> {
        let Some(value) = self.raw(key) else {
            return Ok(Vec::new());
        };
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                item.parse::<Address>().map_err(|e| {
                    RelayError::InvalidConfig(format!("{ENV_PREFIX}{key} is invalid: {e}"))
                })
            })
            .collect()
    }
}
