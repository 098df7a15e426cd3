use async_trait::async_trait;

use crate::db::{SqliteStore, StoreError};

use super::{Profile, ProfileStore};

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<Profile>, StoreError> {
        let row: Option<(String, String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT uid,username,avatar_url,avatar_public_id FROM profiles WHERE uid=?")
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(uid, username, avatar_url, avatar_public_id)| Profile {
            uid,
            username,
            avatar_url,
            avatar_public_id,
        }))
    }

    async fn put_profile(&self, profile: &Profile) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO profiles (uid,username,avatar_url,avatar_public_id) VALUES (?,?,?,?)
             ON CONFLICT(uid) DO UPDATE SET
                username=excluded.username,
                avatar_url=excluded.avatar_url,
                avatar_public_id=excluded.avatar_public_id",
        )
        .bind(&profile.uid)
        .bind(&profile.username)
        .bind(&profile.avatar_url)
        .bind(&profile.avatar_public_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_profile(&self, uid: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM profiles WHERE uid=?")
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
