// SPDX-FileCopyrightText: 2026 Lorekeeper Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations for the memory tables, embedded at compile time.

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Bring `conn` up to the latest schema. Called from [`crate::Database::open`].
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    let report = embedded::migrations::runner().run(conn)?;
    for migration in report.applied_migrations() {
        tracing::debug!(
            version = migration.version(),
            name = migration.name(),
            "applied migration"
        );
    }
    Ok(())
}
