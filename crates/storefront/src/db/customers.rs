//! Customer profile repository.
//!
//! Database access for application users, their password hashes, and the
//! Stripe customer link. Queries are runtime-checked (`sqlx::query_as`) so
//! the crate builds without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use guardlan_core::{CustomerRef, Email, UserId};

use super::RepositoryError;
use crate::models::user::CustomerProfile;

/// Row shape shared by all profile queries.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: UserId,
    email: String,
    display_name: String,
    stripe_customer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn into_profile(self) -> Result<CustomerProfile, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(CustomerProfile {
            id: self.id,
            email,
            display_name: self.display_name,
            stripe_customer_id: self.stripe_customer_id.map(CustomerRef::new),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const PROFILE_COLUMNS: &str =
    "id, email, display_name, stripe_customer_id, created_at, updated_at";

/// Repository for customer profile operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by user ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM customer_profile WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(ProfileRow::into_profile).transpose()
    }

    /// Get a profile by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored email is invalid.
    pub async fn get_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM customer_profile WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(ProfileRow::into_profile).transpose()
    }

    /// Create a profile with a password hash, in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        display_name: &str,
        password_hash: &str,
    ) -> Result<CustomerProfile, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: ProfileRow = sqlx::query_as(&format!(
            "INSERT INTO customer_profile (id, email, display_name)
             VALUES ($1, $2, $3)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(UserId::generate())
        .bind(email.as_str())
        .bind(display_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        sqlx::query("INSERT INTO customer_password (user_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        row.into_profile()
    }

    /// Get the password hash for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM customer_password WHERE user_id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(|(hash,)| hash))
    }

    /// Get the Stripe customer ref for a user, if linked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stripe_ref(&self, id: UserId) -> Result<Option<CustomerRef>, RepositoryError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT stripe_customer_id FROM customer_profile WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.and_then(|(stripe_ref,)| stripe_ref).map(CustomerRef::new))
    }

    /// Persist the Stripe customer ref for a user.
    ///
    /// Callers decide whether a write is needed (read-before-write guard in
    /// the identity service); this method writes unconditionally.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn set_stripe_ref(
        &self,
        id: UserId,
        stripe_ref: &CustomerRef,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE customer_profile SET stripe_customer_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(stripe_ref.as_str())
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
