//! Storefront tenants.
//!
//! The platform runs two storefronts off the same catalog: the EUR shop and
//! the KM shop. The tenant decides which price column applies and scopes
//! carts, orders and wallets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tenant {
    Eur,
    Km,
}

impl Tenant {
    /// ISO-ish currency code shown next to tenant prices.
    pub fn currency(self) -> &'static str {
        match self {
            Tenant::Eur => "EUR",
            Tenant::Km => "KM",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tenant::Eur => "eur",
            Tenant::Km => "km",
        }
    }

    /// Resolves the tenant from the request host.
    ///
    /// Hosts starting with `km_prefix` (e.g. `km.example.com`) get the KM
    /// storefront; everything else defaults to EUR.
    pub fn from_host(host: &str, km_prefix: &str) -> Tenant {
        let host = host.trim().to_ascii_lowercase();
        if !km_prefix.is_empty() && host.starts_with(km_prefix) {
            Tenant::Km
        } else {
            Tenant::Eur
        }
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tenant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eur" => Ok(Tenant::Eur),
            "km" => Ok(Tenant::Km),
            other => Err(format!("unknown tenant '{}'", other)),
        }
    }
}
