use tracing_subscriber::{fmt, EnvFilter};

use crate::{errors::Error, Result};

/// Initialize logging/tracing for the bot.
///
/// The Bot API client logs every empty long-poll round trip, so its crates
/// default to `warn`. Everything can be overridden with `RUST_LOG`.
pub fn init(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(service_name)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialize logging: {e}")))
}

fn default_directives(service_name: &str) -> String {
    let crate_name = service_name.replace('-', "_");
    format!(
        "info,tgb=info,tgb_core=info,tgb_telegram=info,{crate_name}=info,\
         teloxide=warn,teloxide_core=warn,reqwest=warn,hyper=warn"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_quiet_the_http_client() {
        let d = default_directives("my-bot");
        assert!(d.contains("my_bot=info"));
        assert!(d.contains("teloxide_core=warn"));
        assert!(EnvFilter::try_new(&d).is_ok());
    }
}
