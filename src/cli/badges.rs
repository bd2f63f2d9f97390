use anyhow::Result;

use learnpath::BadgeCriteria;

use super::Context;

pub async fn badges_command(ctx: &Context) -> Result<()> {
    let config = ctx.config()?;
    let store = ctx.open_store(&config)?;
    let badges = store.list_badges().await?;

    if badges.is_empty() {
        println!("No badges in the catalog.");
        return Ok(());
    }

    println!("Badges ({}):\n", badges.len());
    for badge in badges {
        println!("  {} ({}) - {}", badge.name, badge.id, describe(&badge.criteria));
        if !badge.description.is_empty() {
            println!("    {}", badge.description);
        }
    }
    Ok(())
}

fn describe(criteria: &BadgeCriteria) -> String {
    match criteria {
        BadgeCriteria::PointsThreshold { points } => format!("reach {points} points"),
        BadgeCriteria::ExercisesCompleted { count } => format!("complete {count} exercises"),
        BadgeCriteria::ModuleCompleted {
            module_id,
            exercise_count: Some(n),
        } => format!("complete {n} exercises in {module_id}"),
        BadgeCriteria::ModuleCompleted { module_id, .. } => format!("complete module {module_id}"),
        BadgeCriteria::ConsecutiveLogins { days } => format!("log in {days} days in a row"),
    }
}
