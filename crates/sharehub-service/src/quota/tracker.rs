//! Per-user storage quota checks.

use tracing::debug;
use uuid::Uuid;

use sharehub_core::config::settings::RuntimeSettings;
use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_database::Stores;
use sharehub_entity::quota::QuotaInfo;

/// Computes usage from file metadata and compares it to the user's allowance.
///
/// Usage is always derived from the file store, never cached, so a failed
/// upload that rolled back its row is immediately invisible here. Two
/// concurrent uploads may both pass the check before either row exists;
/// the overshoot is bounded by one upload per in-flight request.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    stores: Stores,
}

impl QuotaTracker {
    /// Creates a new quota tracker.
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Total allowance, usage and remaining space for a user.
    ///
    /// A user without a per-user override gets the default from `settings`;
    /// a total of `0` means unlimited.
    pub async fn get_user_quota(
        &self,
        settings: &RuntimeSettings,
        user_id: Uuid,
    ) -> AppResult<QuotaInfo> {
        let user = self
            .stores
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        let used = self.stores.files.total_size_by_owner(user_id).await?;
        let total = user.effective_quota(settings.default_quota_bytes);

        Ok(QuotaInfo::new(total, used))
    }

    /// Whether `size` more bytes fit in the user's remaining space.
    pub async fn can_upload_size(
        &self,
        settings: &RuntimeSettings,
        user_id: Uuid,
        size: i64,
    ) -> AppResult<bool> {
        if size <= 0 {
            return Err(AppError::validation("Upload size must be positive"));
        }
        let quota = self.get_user_quota(settings, user_id).await?;
        debug!(
            user_id = %user_id,
            size,
            used = quota.used,
            total = quota.total,
            "Quota check"
        );
        Ok(quota.fits(size))
    }

    /// Like [`can_upload_size`](Self::can_upload_size), but a denial is a
    /// `Forbidden` error carrying the numbers behind it.
    pub async fn ensure_can_upload(
        &self,
        settings: &RuntimeSettings,
        user_id: Uuid,
        size: i64,
    ) -> AppResult<()> {
        if size <= 0 {
            return Err(AppError::validation("Upload size must be positive"));
        }
        let quota = self.get_user_quota(settings, user_id).await?;
        if quota.fits(size) {
            return Ok(());
        }
        Err(
            AppError::forbidden("Storage quota exceeded").with_details(serde_json::json!({
                "quota": quota.total,
                "used": quota.used,
                "available": quota.available,
                "requested": size,
            })),
        )
    }
}

#[cfg(test)]
mod tests {
    use sharehub_core::error::ErrorKind;

    use crate::testing::Harness;

    #[tokio::test]
    async fn test_quota_uses_override_then_default() {
        let h = Harness::new().await;
        let alice = h.user_with_quota("alice", Some(1_000));
        let bob = h.user_with_quota("bob", None);
        let settings = h.settings_with_default_quota(500);

        let info = h.quota.get_user_quota(&settings, alice).await.unwrap();
        assert_eq!(info.total, 1_000);
        assert_eq!(info.used, 0);

        let info = h.quota.get_user_quota(&settings, bob).await.unwrap();
        assert_eq!(info.total, 500);
    }

    #[tokio::test]
    async fn test_upload_boundary() {
        let h = Harness::new().await;
        let alice = h.user_with_quota("alice", Some(1_000));
        h.seed_file(alice, None, "a.bin", 400).await;
        let settings = h.settings_with_default_quota(0);

        assert!(h.quota.can_upload_size(&settings, alice, 600).await.unwrap());
        assert!(!h.quota.can_upload_size(&settings, alice, 601).await.unwrap());

        let err = h
            .quota
            .ensure_can_upload(&settings, alice, 601)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
        let details = err.details.unwrap();
        assert_eq!(details["available"], 600);
        assert_eq!(details["requested"], 601);
    }

    #[tokio::test]
    async fn test_unlimited_and_invalid_sizes() {
        let h = Harness::new().await;
        let carol = h.user_with_quota("carol", None);
        let settings = h.settings_with_default_quota(0);

        assert!(
            h.quota
                .can_upload_size(&settings, carol, i64::MAX)
                .await
                .unwrap()
        );
        let err = h.quota.can_upload_size(&settings, carol, 0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let h = Harness::new().await;
        let settings = h.settings_with_default_quota(0);
        let err = h
            .quota
            .get_user_quota(&settings, uuid::Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
