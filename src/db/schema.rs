//! SQL DDL for initializing the database schema.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema includes:
/// - `user` table (one account per row; `username` is the login identity)
/// - `acronym` table (owned by a user)
/// - `category` table (unique names, created on demand)
/// - `acronym_category` join table (many-to-many)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Users
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS user (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL  -- RFC3339
);

-- ---------------------------------------------------------------------------
-- Acronyms (one owning user per row)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS acronym (
    id INTEGER PRIMARY KEY NOT NULL,
    short TEXT NOT NULL,
    long TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES user(id),
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL  -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_acronym_user ON acronym(user_id);

-- ---------------------------------------------------------------------------
-- Categories and the acronym<->category association
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS category (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS acronym_category (
    acronym_id INTEGER NOT NULL REFERENCES acronym(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES category(id) ON DELETE CASCADE,
    PRIMARY KEY (acronym_id, category_id)
);
"#;

/// Incremental migration: older databases predate the optional Twitter link on the
/// profile page. Applied only when `pragma_table_info('user')` lacks the column.
pub const ADD_TWITTER_URL_TO_USER: &str = "ALTER TABLE user ADD COLUMN twitter_url TEXT NULL";
