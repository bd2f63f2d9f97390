use anyhow::Result;

use learnpath::UserId;

use super::Context;

pub async fn register_command(ctx: &Context, name: &str, email: &str) -> Result<()> {
    let pipeline = ctx.pipeline()?;
    let user = pipeline.register(name, email).await?;
    println!("Registered {} <{}>", user.name, user.email);
    println!("  id: {}", user.id);
    Ok(())
}

pub async fn profile_command(ctx: &Context, user: &str) -> Result<()> {
    let pipeline = ctx.pipeline()?;
    let user = pipeline.views().profile(&UserId::new(user)).await?;

    println!("{} <{}>", user.name, user.email);
    println!("  points: {}", user.points);
    if user.badges.is_empty() {
        println!("  badges: none yet");
    } else {
        let badges: Vec<&str> = user.badges.iter().map(|b| b.as_str()).collect();
        println!("  badges: {}", badges.join(", "));
    }
    Ok(())
}
