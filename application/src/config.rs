//! [`Config`]-related definitions.

use std::{path::Path, time};

use common::Percent;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error};
use rust_decimal::Decimal;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Payment processor configuration.
    pub payment: Payment,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Prefix of the environment variables overriding the [`Config`].
    pub const ENV_PREFIX: &'static str = "FAIRWAY";

    /// Loads the [`Config`] from the optional file at the provided `path`,
    /// overridden by the environment variables like
    /// `FAIRWAY_POSTGRES__HOST`.
    ///
    /// Missing values are defaulted.
    ///
    /// # Errors
    ///
    /// If the file is malformed, or any value is of a wrong type.
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret shared with the identity provider.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Marketplace fees configuration.
    pub fees: Fees,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl TryFrom<Service> for service::Config {
    type Error = InvalidFees;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            jwt_secret,
            fees:
                Fees {
                    platform_percent,
                    processor_percent,
                    processor_fixed_fee,
                },
            tasks:
                Tasks {
                    publish_overdue_reviews,
                    release_pending_deposits,
                },
        } = value;

        Ok(Self {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            fees: service::domain::fee::Calculator {
                platform_percent: Percent::new(platform_percent)
                    .ok_or(InvalidFees)?,
                processor_percent: Percent::new(processor_percent)
                    .ok_or(InvalidFees)?,
                processor_fixed_fee,
            },
            publish_overdue_reviews:
                service::task::publish_overdue_reviews::Config {
                    interval: publish_overdue_reviews.interval,
                },
            release_pending_deposits:
                service::task::release_pending_deposits::Config {
                    interval: release_pending_deposits.interval,
                },
        })
    }
}

/// Error of [`Fees`] having out-of-range percents.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("Fee percents must be in `0..=100` range")]
pub struct InvalidFees;

/// Marketplace fees configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Fees {
    /// Share of a rental amount kept by the platform, in percents.
    #[default(Decimal::new(12, 0))]
    pub platform_percent: Decimal,

    /// Variable share of a rental amount charged by the payment processor,
    /// in percents.
    #[default(Decimal::new(29, 1))]
    pub processor_percent: Decimal,

    /// Fixed amount charged by the payment processor per transaction.
    #[default(Decimal::new(30, 2))]
    pub processor_fixed_fee: Decimal,
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `PublishOverdueReviews` task configuration.
    pub publish_overdue_reviews: Task,

    /// `ReleasePendingDeposits` task configuration.
    #[default(Task {
        interval: time::Duration::from_secs(15 * 60),
    })]
    pub release_pending_deposits: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("fairway".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Payment processor configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Payment {
    /// Amount above which the sandbox processor declines authorizations.
    ///
    /// Nothing is declined if unset.
    pub decline_above: Option<Decimal>,
}

impl From<Payment> for service::infra::payment::SandboxConfig {
    fn from(value: Payment) -> Self {
        let Payment { decline_above } = value;
        Self { decline_above }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;

    use super::{Fees, Service};

    #[test]
    fn converts_default_service_config() {
        let config = service::Config::try_from(Service::default()).unwrap();

        assert_eq!(
            config.fees,
            service::domain::fee::Calculator::default(),
        );
        assert_eq!(
            config.release_pending_deposits.interval.as_secs(),
            15 * 60,
        );
        assert_eq!(config.publish_overdue_reviews.interval.as_secs(), 60 * 60);
    }

    #[test]
    fn rejects_out_of_range_fees() {
        let conf = Service {
            fees: Fees {
                platform_percent: Decimal::new(101, 0),
                ..Fees::default()
            },
            ..Service::default()
        };

        assert!(service::Config::try_from(conf).is_err());
    }
}
