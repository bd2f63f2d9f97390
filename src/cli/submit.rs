//! Submit command implementation

use std::io::Read;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::Value;

use learnpath::{ExerciseId, UserId};

use super::Context;

/// Grade a submission read from a file or stdin
pub async fn submit_command(
    ctx: &Context,
    user: &str,
    exercise: &str,
    file: Option<&Path>,
) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read submission: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read submission from stdin")?;
            buf
        }
    };
    let submission: Value =
        serde_json::from_str(&raw).context("Submission must be a JSON document")?;

    let pipeline = ctx.pipeline()?;
    let result = pipeline
        .submit(&UserId::new(user), &ExerciseId::new(exercise), submission)
        .await?;

    println!(
        "Score: {} (attempt #{}, +{} points, total {})",
        result.score, result.progress.attempts, result.awarded, result.total_points
    );
    for line in &result.feedback {
        println!("  - {}", line);
    }
    for badge in &result.new_badges {
        println!("New badge: {} - {}", badge.name, badge.description);
    }
    Ok(())
}
