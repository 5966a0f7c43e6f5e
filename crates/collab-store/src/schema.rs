use rusqlite::Connection;

/// Creates the relational layout from spec §6. All five tables live in one
/// SQLite file; callers that only need a subset still pay for creating all
/// of them, which is a deliberate simplification — the core always uses
/// all five.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL DEFAULT '',
            owner_id    TEXT NOT NULL,
            status      TEXT NOT NULL DEFAULT 'ACTIVE',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS document_collaborators (
            document_id     TEXT NOT NULL,
            collaborator_id TEXT NOT NULL,
            PRIMARY KEY (document_id, collaborator_id)
        );

        CREATE TABLE IF NOT EXISTS change_tracking (
            id          TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            change_type TEXT NOT NULL,
            content     TEXT,
            position    INTEGER NOT NULL,
            timestamp   TEXT NOT NULL,
            version_id  TEXT
        );

        CREATE TABLE IF NOT EXISTS document_versions (
            id                  TEXT PRIMARY KEY,
            document_id         TEXT NOT NULL,
            version_number      INTEGER NOT NULL,
            content             TEXT NOT NULL,
            created_by          TEXT NOT NULL,
            created_at          TEXT NOT NULL,
            change_description  TEXT,
            UNIQUE(document_id, version_number)
        );

        CREATE TABLE IF NOT EXISTS user_contributions (
            id                  TEXT PRIMARY KEY,
            document_id         TEXT NOT NULL,
            user_id             TEXT NOT NULL,
            edit_count          INTEGER NOT NULL DEFAULT 0,
            characters_added    INTEGER NOT NULL DEFAULT 0,
            characters_deleted  INTEGER NOT NULL DEFAULT 0,
            first_contribution  TEXT NOT NULL,
            last_contribution   TEXT NOT NULL,
            UNIQUE(document_id, user_id)
        );
        "#,
    )
}
