//! Azure cloud environments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Azure cloud the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Environment {
    #[default]
    Public,
    China,
    UsGovernment,
}

impl Environment {
    /// Base URL of the resource manager endpoint
    pub fn resource_manager_endpoint(&self) -> &'static str {
        match self {
            Environment::Public => "https://management.azure.com",
            Environment::China => "https://management.chinacloudapi.cn",
            Environment::UsGovernment => "https://management.usgovcloudapi.net",
        }
    }

    /// OAuth scope for resource manager tokens
    pub fn token_scope(&self) -> &'static str {
        match self {
            Environment::Public => "https://management.azure.com/.default",
            Environment::China => "https://management.chinacloudapi.cn/.default",
            Environment::UsGovernment => "https://management.usgovcloudapi.net/.default",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Public => "public",
            Environment::China => "china",
            Environment::UsGovernment => "us-government",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" | "azurecloud" => Ok(Self::Public),
            "china" | "azurechinacloud" => Ok(Self::China),
            "us-government" | "usgovernment" | "azureusgovernment" => Ok(Self::UsGovernment),
            other => Err(format!("unknown Azure environment: {}", other)),
        }
    }
}
