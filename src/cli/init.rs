//! Init command implementation

use anyhow::{bail, Context as _, Result};

use super::Context;

/// Default configuration content for learnpath init
pub const DEFAULT_CONFIG: &str = r#"# learnpath configuration

# ============================================================================
# STORE - SQLite database
# ============================================================================
#
#   path             - Database file (default: ~/.learnpath/learnpath.db)
#   timeout_ms       - Upper bound per store operation; expiry is a retryable error
#   busy_timeout_ms  - How long SQLite waits on a locked database

[store]
timeout_ms = 5000
busy_timeout_ms = 2000

# ============================================================================
# SCORING
# ============================================================================
#
#   resubmission        - "award_once": points only for the first completion
#                         "award_every_submission": every submission credits its score
#   max_record_retries  - Retries when two submissions race on the same exercise

[scoring]
resubmission = "award_once"
max_record_retries = 3

# ============================================================================
# SERVER - local HTTP API (learnpath serve)
# ============================================================================

[server]
port = 9877
# Optional shared secret, sent as `X-Learnpath-Token`. Empty disables auth.
auth_token = ""
max_body_bytes = 1048576
"#;

/// Write the default config file
pub fn init_command(ctx: &Context, force: bool) -> Result<()> {
    let path = ctx.config_path();

    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    Ok(())
}
