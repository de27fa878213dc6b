use redshift_core::{CatalogSession, CoreError, CoreResult, OwnerId};

/// Maps owner identifiers to the usernames DDL statements require.
pub struct OwnerResolver;

impl OwnerResolver {
    /// Resolves every identifier inside the caller's transaction.
    ///
    /// The result is aligned with `owners`. Resolution is all-or-nothing: the
    /// first identifier without a username fails the whole call.
    pub async fn resolve<S>(session: &mut S, owners: &[OwnerId]) -> CoreResult<Vec<String>>
    where
        S: CatalogSession,
    {
        let mut usernames = Vec::with_capacity(owners.len());
        for &owner in owners {
            match session.find_username(owner).await? {
                Some(username) => usernames.push(username),
                None => return Err(CoreError::not_found("user", owner.to_string())),
            }
        }
        Ok(usernames)
    }

    /// Resolves a single owner identifier.
    pub async fn resolve_one<S>(session: &mut S, owner: OwnerId) -> CoreResult<String>
    where
        S: CatalogSession,
    {
        let mut usernames = Self::resolve(session, &[owner]).await?;
        usernames
            .pop()
            .ok_or_else(|| CoreError::internal("owner resolution returned no username"))
    }
}
