use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS regions (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS data_centers (
  id TEXT PRIMARY KEY,
  region_id TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS distance_entries (
  from_dc TEXT NOT NULL,
  to_dc TEXT NOT NULL,
  duration_minutes INTEGER NOT NULL,
  PRIMARY KEY (from_dc, to_dc)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS engineers (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  region_id TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS time_slots (
  engineer_id TEXT NOT NULL,
  date TEXT NOT NULL,
  start_hour INTEGER NOT NULL,
  end_hour INTEGER NOT NULL,
  PRIMARY KEY (engineer_id, date, start_hour)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS works (
  id TEXT PRIMARY KEY,
  work_type TEXT NOT NULL,
  priority TEXT NOT NULL,
  status TEXT NOT NULL,
  version INTEGER NOT NULL DEFAULT 0,
  data_center_id TEXT,
  due_date TEXT,
  target_date TEXT,
  target_time INTEGER,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS work_chunks (
  id TEXT PRIMARY KEY,
  work_id TEXT NOT NULL,
  chunk_order INTEGER NOT NULL,
  data_center_id TEXT,
  status TEXT NOT NULL,
  version INTEGER NOT NULL DEFAULT 0,
  assigned_engineer_id TEXT,
  assigned_date TEXT,
  assigned_start_hour INTEGER,
  created_at INTEGER NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS work_tasks (
  id TEXT PRIMARY KEY,
  chunk_id TEXT NOT NULL,
  estimated_hours INTEGER NOT NULL,
  quantity INTEGER NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS chunk_links (
  chunk_id TEXT NOT NULL,
  linked_chunk_id TEXT NOT NULL,
  link_type TEXT NOT NULL,
  PRIMARY KEY (chunk_id, linked_chunk_id, link_type)
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_data_centers_region ON data_centers(region_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_engineers_region ON engineers(region_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_time_slots_engineer_date ON time_slots(engineer_id, date);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_work_chunks_work ON work_chunks(work_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_work_chunks_engineer_date ON work_chunks(assigned_engineer_id, assigned_date);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_work_tasks_chunk ON work_tasks(chunk_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_chunk_links_chunk ON chunk_links(chunk_id);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_chunk_links_linked ON chunk_links(linked_chunk_id);"#)
        .execute(pool)
        .await?;

    Ok(())
}
