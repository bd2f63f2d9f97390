use anyhow::Result;

use learnpath::{ModuleId, UserId};

use super::Context;

pub async fn progress_command(ctx: &Context, user: &str, module: Option<&str>) -> Result<()> {
    let views = ctx.pipeline()?.views();
    let user = UserId::new(user);

    if let Some(module) = module {
        let detail = views.module_detail(&user, &ModuleId::new(module)).await?;
        println!("{} ({})\n", detail.module.name, detail.module.id);
        for ex in &detail.exercises {
            println!(
                "  [{:<11}] {:>3}/{:<3} {}",
                ex.status.as_str(),
                ex.score,
                ex.points,
                ex.title
            );
        }
        return Ok(());
    }

    let overview = views.module_overview(&user).await?;
    if overview.is_empty() {
        println!("No modules found. Seed a catalog first.");
        return Ok(());
    }
    for m in &overview {
        println!(
            "  {:>3}%  {}/{}  {:>5} pts  {} ({})",
            m.percentage,
            m.completed_exercises,
            m.total_exercises,
            m.points_earned,
            m.module.name,
            m.module.id
        );
    }
    Ok(())
}
