pub mod config;
pub mod metrics;
pub mod oracle;
pub mod relay;
pub mod session;
pub mod testing;
pub mod ticketing;
pub mod webhook;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, OracleConfig,
    OracleProvider, SanitizedConfig, ServerConfig, UpdateDefaults, WebhookConfig, ZnunyConfig,
};
pub use oracle::{create_oracle, Diagnosis, DiagnosisOracle, OracleError, TicketType};
pub use relay::{FailureStage, PipelineStage, RelayError, RelayOutcome, RelayRequest, TicketRelay};
pub use session::{Session, SessionCache, SessionError, SessionLogin, SessionSource};
pub use ticketing::{
    GatewayError, TicketFieldOverrides, TicketRef, TicketUpdate, TicketingGateway, UpdateOutcome,
    ZnunyClient,
};
pub use webhook::{
    EventLog, EventLogError, Resolution, ResolutionError, ResolutionSource, WebhookEvent,
    WebhookResolver,
};
