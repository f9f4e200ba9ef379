//! Seed command - prepares the database and loads the demo dataset.

use anyhow::{Context, Result};
use colored::Colorize;

use cp_core::db::{create_pool, ensure_admin_user, run_migrations, seed_demo_data};

/// Runs migrations, creates the admin account, and loads demo data.
///
/// Re-running is safe: existing rows are matched and left untouched, so the
/// printed counts only cover rows created by this invocation.
pub async fn run_seed(database_url: &str, domain: &str, admin_only: bool) -> Result<()> {
    println!("{} Preparing database...", "[seed]".cyan());

    println!("  {} Database: {}", "→".green(), database_url);
    let db_pool = create_pool(database_url)
        .await
        .context("Failed to create database connection pool")?;

    println!("  {} Running migrations...", "→".green());
    run_migrations(&db_pool)
        .await
        .context("Failed to run database migrations")?;

    println!("  {} Migrations complete", "✓".green());

    match ensure_admin_user(&db_pool, domain)
        .await
        .context("Failed to prepare admin account")?
    {
        Some(admin) => println!(
            "  {} Created initial admin account {} (password in the startup log)",
            "✓".green(),
            admin.email
        ),
        None => println!("  {} Admin account already present", "→".green()),
    }

    if admin_only {
        println!();
        println!(
            "{}",
            "Admin account ready. Re-run without --admin-only to load the demo dataset."
                .green()
                .bold()
        );
        return Ok(());
    }

    println!("  {} Loading demo dataset...", "→".green());
    let summary = seed_demo_data(&db_pool, domain)
        .await
        .context("Failed to seed demo data")?;

    println!();
    println!("{}", "Seeded Rows".bold());
    println!("─────────────────────");
    println!("  Subjects:     {}", summary.subjects);
    println!("  Coordinators: {}", summary.coordinators);
    println!("  Faculty:      {}", summary.faculty);
    println!("  Students:     {}", summary.students);
    println!("  Assignments:  {}", summary.assignments);
    println!("  Electives:    {}", summary.electives);
    println!("  Campaigns:    {}", summary.campaigns);
    println!("  Questions:    {}", summary.questions);
    println!("  Flags:        {}", summary.flags);

    println!();
    if summary.total() == 0 {
        println!("{}", "Demo dataset already present, nothing to do.".green());
    } else {
        println!(
            "{}",
            format!("Created {} rows.", summary.total()).green().bold()
        );
    }

    Ok(())
}
