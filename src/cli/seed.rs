use std::path::Path;

use anyhow::Result;

use learnpath::catalog::CatalogFile;

use super::Context;

pub async fn seed_command(ctx: &Context, catalog_path: &Path) -> Result<()> {
    let catalog = CatalogFile::load(catalog_path)?;
    let config = ctx.config()?;
    let store = ctx.open_store(&config)?;

    let report = catalog.seed(store.as_ref()).await?;
    println!(
        "Seeded {} modules, {} exercises, {} badges into {}",
        report.modules,
        report.exercises,
        report.badges,
        config.database_path().display()
    );
    Ok(())
}
