use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForumError {
    #[error("Record does not exist")]
    NotFound,

    #[error("Record already exists")]
    AlreadyExists,

    #[error("Bad record")]
    BadRecord,

    #[error("Input too short")]
    TooShort,

    #[error("Input contains spaces")]
    ContainsSpaces,

    #[error("System error: {0}")]
    System(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl ForumError {
    /// Stable numeric code handed to whatever transport sits on top.
    pub fn code(&self) -> u16 {
        match self {
            ForumError::NotFound => 1,
            ForumError::BadRecord => 2,
            ForumError::AlreadyExists => 4,
            ForumError::TooShort => 5,
            ForumError::ContainsSpaces => 6,
            ForumError::System(_) | ForumError::Database(_) | ForumError::Migration(_) => 3,
        }
    }

    /// Maps an insert failure, turning a uniqueness violation into `AlreadyExists`.
    pub(crate) fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ForumError::AlreadyExists
            }
            _ => ForumError::Database(err),
        }
    }
}

pub type ForumResult<T> = Result<T, ForumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_failure_taxonomy() {
        assert_eq!(ForumError::NotFound.code(), 1);
        assert_eq!(ForumError::BadRecord.code(), 2);
        assert_eq!(ForumError::System("argon2".into()).code(), 3);
        assert_eq!(ForumError::AlreadyExists.code(), 4);
        assert_eq!(ForumError::TooShort.code(), 5);
        assert_eq!(ForumError::ContainsSpaces.code(), 6);
        assert_eq!(ForumError::Database(sqlx::Error::RowNotFound).code(), 3);
    }

    #[test]
    fn non_unique_insert_failures_stay_database_errors() {
        let err = ForumError::from_insert(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ForumError::Database(sqlx::Error::PoolTimedOut)));
    }
}
