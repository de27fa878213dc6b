use redshift_core::{CatalogSession, CoreError, CoreResult, DatabaseId, SettleConfig};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Polls the catalog until a freshly created database becomes visible.
///
/// Lookups back off exponentially per `config`; once the next delay would
/// overrun `config.timeout_ms` the poll gives up with `PropagationTimeout`.
/// Lookup failures other than "no row yet" are returned immediately.
pub async fn await_database_id<S>(
    session: &mut S,
    name: &str,
    config: &SettleConfig,
) -> CoreResult<DatabaseId>
where
    S: CatalogSession,
{
    let started = Instant::now();
    let timeout = config.timeout();
    let mut attempt = 0;

    loop {
        if let Some(id) = session.find_database_id(name).await? {
            debug!(name, %id, attempt, "database visible in catalog");
            return Ok(id);
        }

        let delay = config.backoff_for_attempt(attempt);
        let waited = started.elapsed();
        if waited + delay > timeout {
            warn!(name, ?waited, "database did not appear in catalog");
            return Err(CoreError::propagation_timeout(name, waited));
        }

        debug!(name, attempt, ?delay, "database not yet visible, retrying");
        sleep(delay).await;
        attempt += 1;
    }
}
