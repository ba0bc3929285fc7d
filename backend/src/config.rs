//! Server configuration from flags and environment (`.env` is loaded first)

use chess_engine::constants::DEFAULT_SEARCH_DEPTH;
use chess_engine::SearchConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "backend", about = "Real-time chess game server")]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8888)]
    pub port: u16,

    /// SQLite URL such as `sqlite:chess.db`; games are kept in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Search depth of the computer opponent in plies
    #[arg(long, env = "AI_DEPTH", default_value_t = DEFAULT_SEARCH_DEPTH)]
    pub ai_depth: u32,

    /// Pause before the computer opponent starts thinking
    #[arg(long, env = "AI_THINK_DELAY_MS", default_value_t = 1000)]
    pub ai_think_delay_ms: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn coordinator(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            search: SearchConfig::with_depth(self.ai_depth),
            think_delay: Duration::from_millis(self.ai_think_delay_ms),
        }
    }
}

/// Settings the coordinator needs for computer replies
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub search: SearchConfig,
    pub think_delay: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            search: SearchConfig::default(),
            think_delay: Duration::from_secs(1),
        }
    }
}
