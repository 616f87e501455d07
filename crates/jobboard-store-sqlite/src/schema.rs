//! SQL schema for the job board SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    role          TEXT NOT NULL,    -- 'recruiter' | 'job_seeker'
    display_name  TEXT NOT NULL,
    email         TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

-- One profile per user, overwritten in place on every save.
CREATE TABLE IF NOT EXISTS profiles (
    profile_id    TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL UNIQUE REFERENCES users(user_id) ON DELETE CASCADE,
    headline      TEXT NOT NULL,
    skills        TEXT NOT NULL,
    education     TEXT NOT NULL,
    work_history  TEXT NOT NULL,
    links         TEXT NOT NULL DEFAULT '',
    location      TEXT NOT NULL DEFAULT '',
    projects      TEXT NOT NULL DEFAULT '',
    visibility    INTEGER NOT NULL,  -- bit per field, set = visible
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS jobs (
    job_id            TEXT PRIMARY KEY,
    recruiter_id      TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    title             TEXT NOT NULL,
    company           TEXT NOT NULL,
    description       TEXT NOT NULL DEFAULT '',
    skills_required   TEXT NOT NULL,
    location          TEXT,
    salary_min        INTEGER,
    salary_max        INTEGER,
    work_mode         TEXT NOT NULL,
    experience_level  TEXT NOT NULL,
    visa_sponsorship  INTEGER NOT NULL DEFAULT 0,
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    latitude          REAL,
    longitude         REAL,
    CHECK (salary_min IS NULL OR salary_max IS NULL OR salary_min <= salary_max),
    CHECK ((latitude IS NULL) = (longitude IS NULL))
);

CREATE TABLE IF NOT EXISTS saved_searches (
    search_id             TEXT PRIMARY KEY,
    recruiter_id          TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    name                  TEXT NOT NULL,
    query                 TEXT,
    location              TEXT,
    skills                TEXT,
    projects              TEXT,
    notification_enabled  INTEGER NOT NULL DEFAULT 1,
    last_notified         TEXT,
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

-- Written once per (search, candidate) and never updated.
CREATE TABLE IF NOT EXISTS search_notifications (
    search_id     TEXT NOT NULL REFERENCES saved_searches(search_id) ON DELETE CASCADE,
    candidate_id  TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    notified_at   TEXT NOT NULL,
    PRIMARY KEY (search_id, candidate_id)
);

CREATE TABLE IF NOT EXISTS applications (
    application_id     TEXT PRIMARY KEY,
    job_id             TEXT NOT NULL REFERENCES jobs(job_id) ON DELETE CASCADE,
    applicant_id       TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    cover_note         TEXT,
    status             TEXT NOT NULL,
    published_status   TEXT NOT NULL,   -- what the applicant sees
    rejection_reason   TEXT,
    applied_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    status_updated_at  TEXT NOT NULL,
    UNIQUE (job_id, applicant_id)
);

-- Thread between an application's applicant and the job's recruiter.
CREATE TABLE IF NOT EXISTS messages (
    message_id      TEXT PRIMARY KEY,
    application_id  TEXT NOT NULL REFERENCES applications(application_id) ON DELETE CASCADE,
    sender_id       TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    content         TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS profiles_updated_idx ON profiles(updated_at);
CREATE INDEX IF NOT EXISTS jobs_recruiter_idx   ON jobs(recruiter_id);
CREATE INDEX IF NOT EXISTS searches_owner_idx   ON saved_searches(recruiter_id);
CREATE INDEX IF NOT EXISTS applications_job_idx ON applications(job_id);
CREATE INDEX IF NOT EXISTS messages_thread_idx  ON messages(application_id, created_at);

PRAGMA user_version = 1;
";
