pub mod approvals;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod roster;
pub mod seed;

use serde::Serialize;

use wardline_core::config::{AppConfig, LoadOptions};
use wardline_db::{connect, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Map an application failure onto CLI output: the interface-level
/// error class, a message carrying the correlation id, and the exit
/// code class the error belongs to.
pub(crate) fn classify_failure(
    error: wardline_core::errors::ApplicationError,
) -> (&'static str, String, u8) {
    use wardline_core::errors::InterfaceError;

    let correlation_id = uuid::Uuid::new_v4().to_string();
    let interface = error.into_interface(correlation_id.clone());
    let (error_class, exit_code) = match &interface {
        InterfaceError::BadRequest { .. } => ("bad_request", 2u8),
        InterfaceError::Conflict { .. } => ("conflict", 6u8),
        InterfaceError::ServiceUnavailable { .. } => ("service_unavailable", 4u8),
        InterfaceError::Internal { .. } => ("internal", 7u8),
    };

    (error_class, format!("{interface} (correlation_id: {correlation_id})"), exit_code)
}

/// Shared preamble for commands that talk to the database: load and
/// validate config, bring up a current-thread runtime, connect, run
/// the command body, close the pool.
pub(crate) fn with_pool<F, Fut>(command: &'static str, body: F) -> CommandResult
where
    F: FnOnce(DbPool) -> Fut,
    Fut: std::future::Future<Output = Result<CommandResult, (&'static str, String, u8)>>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let outcome = body(pool.clone()).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(outcome) => outcome,
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}
