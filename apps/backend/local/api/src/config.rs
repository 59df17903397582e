use produce_scale::ResourceConfig;
use produce_scale_api::ApiConfig;
use std::env;
use std::net::IpAddr;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub resources: ResourceConfig,
    pub api: ApiConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HOST"))?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT"))?,
            resources: ResourceConfig::from_env(),
            api: ApiConfig::from_env(),
        })
    }

    pub fn bind_addr(&self) -> (IpAddr, u16) {
        (self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_variable() {
        assert_eq!(
            ConfigError::InvalidValue("PORT").to_string(),
            "Invalid value for: PORT"
        );
    }
}
