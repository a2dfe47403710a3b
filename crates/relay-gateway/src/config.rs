//! Process configuration: a TOML file (seed data plus the `GatewayConfig`
//! fields from distilled spec §6) with environment overrides and a `clap`
//! flag naming the file, matching the teacher's own serde-first,
//! builder-for-the-whole-process approach (SPEC_FULL §6).

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use relay_ability::{Ability, AbilityIndex, Channel};
use relay_core::GatewayConfig;
use relay_ledger::{QuotaLedger, Token, User};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "relay-gateway", about = "Multi-tenant LLM API gateway relay")]
pub struct Cli {
    /// Path to a TOML config file. Missing fields fall back to defaults.
    #[arg(long, env = "RELAY_GATEWAY_CONFIG")]
    pub config: Option<String>,

    /// Address to bind the HTTP listener to.
    #[arg(long, env = "RELAY_GATEWAY_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SeedFile {
    gateway: GatewayConfig,
    channels: Vec<SeedChannel>,
    abilities: Vec<SeedAbility>,
    users: Vec<SeedUser>,
    tokens: Vec<SeedToken>,
}

#[derive(Debug, Deserialize)]
struct SeedChannel {
    id: u64,
    #[serde(rename = "type")]
    type_tag: String,
    display_name: String,
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SeedAbility {
    group: String,
    model: String,
    channel_id: u64,
    priority: Option<i32>,
    weight: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: u64,
    group: String,
    quota: i64,
}

#[derive(Debug, Deserialize)]
struct SeedToken {
    id: u64,
    user_id: u64,
    remaining_quota: i64,
}

/// Everything the binary needs to build its `AppState`.
pub struct Bootstrapped {
    pub bind: SocketAddr,
    pub config: GatewayConfig,
    pub index: Arc<AbilityIndex>,
    pub ledger: Arc<QuotaLedger>,
}

pub fn bootstrap(cli: &Cli) -> Result<Bootstrapped, Box<dyn std::error::Error>> {
    let seed: SeedFile = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        }
        None => SeedFile::default(),
    };

    let index = Arc::new(AbilityIndex::new());
    let channels = seed
        .channels
        .into_iter()
        .map(|c| {
            let mut channel = Channel::new(c.id, c.type_tag, c.display_name);
            if let Some(max_tokens) = c.max_tokens {
                channel = channel.with_max_tokens(max_tokens);
            }
            channel
        })
        .collect();
    let abilities = seed
        .abilities
        .into_iter()
        .map(|a| {
            let mut ability = Ability::new(a.group, a.model, a.channel_id);
            if let Some(priority) = a.priority {
                ability = ability.with_priority(priority);
            }
            if let Some(weight) = a.weight {
                ability = ability.with_weight(weight);
            }
            ability
        })
        .collect();
    index.load(channels, abilities);

    let ledger = Arc::new(QuotaLedger::new());
    for u in seed.users {
        ledger.upsert_user(User::new(u.id, u.group, u.quota));
    }
    for t in seed.tokens {
        ledger.upsert_token(Token::new(t.id, t.user_id, t.remaining_quota));
    }

    Ok(Bootstrapped {
        bind: cli.bind,
        config: seed.gateway,
        index,
        ledger,
    })
}
