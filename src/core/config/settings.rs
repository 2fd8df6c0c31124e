use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64, parse_usize,
};
use super::types::{
    ApiSettings, AuthoringSettings, BankCacheSettings, ConfigError, CorsSettings, DatabaseSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("PAPERWRIGHT_HOST", "0.0.0.0");
        let port = env_or_default("PAPERWRIGHT_PORT", "8000");

        let environment = parse_environment(
            env_optional("PAPERWRIGHT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("PAPERWRIGHT_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Paperwright API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "paperwright");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "paperwright_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections = parse_u32(
            "DATABASE_MAX_CONNECTIONS",
            env_or_default("DATABASE_MAX_CONNECTIONS", "20"),
        )?;

        let bank_cache_ttl_seconds = parse_u64(
            "BANK_CACHE_TTL_SECONDS",
            env_or_default("BANK_CACHE_TTL_SECONDS", "300"),
        )?;

        let session_idle_minutes =
            parse_u64("SESSION_IDLE_MINUTES", env_or_default("SESSION_IDLE_MINUTES", "120"))?;
        let max_sessions = parse_usize("MAX_SESSIONS", env_or_default("MAX_SESSIONS", "500"))?;
        let sweep_interval_seconds = parse_u64(
            "SESSION_SWEEP_INTERVAL_SECONDS",
            env_or_default("SESSION_SWEEP_INTERVAL_SECONDS", "60"),
        )?;
        let hide_invisible_chapters = env_optional("HIDE_INVISIBLE_CHAPTERS")
            .map(|value| parse_bool(&value))
            .unwrap_or(true);

        let log_level = env_or_default("PAPERWRIGHT_LOG_LEVEL", "info");
        let json = env_optional("PAPERWRIGHT_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);
        let prometheus_enabled = env_optional("PROMETHEUS_ENABLED")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            bank_cache: BankCacheSettings { ttl_seconds: bank_cache_ttl_seconds },
            authoring: AuthoringSettings {
                session_idle_minutes,
                max_sessions,
                sweep_interval_seconds,
                hide_invisible_chapters,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn bank_cache(&self) -> &BankCacheSettings {
        &self.bank_cache
    }

    pub(crate) fn authoring(&self) -> &AuthoringSettings {
        &self.authoring
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if self.authoring.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_SESSIONS",
                value: "0".to_string(),
            });
        }

        if self.authoring.session_idle_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_IDLE_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.authoring.sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SESSION_SWEEP_INTERVAL_SECONDS",
                value: "0".to_string(),
            });
        }

        if !self.api.api_v1_str.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "API_V1_STR",
                value: self.api.api_v1_str.clone(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }

        Ok(())
    }
}
